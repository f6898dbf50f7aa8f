//! Evaluator-optimizer sub-loop for iteratively produced content.
//!
//! Each evaluation appends its score to a running list and bumps an
//! iteration counter, both carried in the shared cycle context. Below the
//! acceptance threshold, feedback is emitted for the next generation call;
//! at the iteration cap, feedback is withheld and the best-effort result is
//! accepted, preventing unbounded regeneration.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::OptimizerConfig;
use crate::cycle::context::{keys, CycleContext};
use crate::oracle::EvaluationScores;

/// How many issues and suggestions feedback quotes.
const FEEDBACK_TOP_N: usize = 2;

/// A scored evaluation of generated content.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEvaluation {
    /// Overall score in [0, 100].
    pub score: f32,
    /// Per-criterion scores, 0-100 each.
    pub criteria: BTreeMap<String, f32>,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    /// Whether the score clears the acceptance threshold.
    pub acceptable: bool,
}

impl PlanEvaluation {
    /// Build from raw oracle scores against a threshold.
    pub fn from_scores(scores: EvaluationScores, threshold: f32) -> Self {
        let score = scores.overall_score.clamp(0.0, 100.0);
        Self {
            score,
            criteria: scores.criteria,
            issues: scores.issues,
            suggestions: scores.suggestions,
            acceptable: score >= threshold,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// What one evaluation round decided.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerVerdict {
    /// Which generate→evaluate iteration this was (1-based).
    pub iteration: u32,
    /// Whether the content cleared the threshold.
    pub acceptable: bool,
    /// Feedback for the next generation call, when regeneration is wanted.
    pub feedback: Option<String>,
}

/// Register an evaluation in the cycle context and decide whether to feed
/// the next generation round.
pub fn register_evaluation(
    ctx: &mut CycleContext,
    evaluation: &PlanEvaluation,
    config: &OptimizerConfig,
) -> OptimizerVerdict {
    // Append to the running score list.
    let mut scores = ctx
        .get(keys::PLAN_SCORES)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    scores.push(json!(evaluation.score));
    ctx.insert(keys::PLAN_SCORES, Value::Array(scores));

    // Bump the iteration counter.
    let iteration = ctx
        .get(keys::PLAN_ITERATIONS)
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32
        + 1;
    ctx.insert(keys::PLAN_ITERATIONS, json!(iteration));

    let feedback = if evaluation.acceptable {
        // Accepted: no regeneration, clear any stale feedback.
        ctx.remove(keys::PLAN_FEEDBACK);
        ctx.insert(keys::PLAN_ACCEPTED, json!(true));
        None
    } else if iteration < config.max_iterations {
        let text = build_feedback(evaluation);
        ctx.insert(keys::PLAN_FEEDBACK, json!(text.clone()));
        Some(text)
    } else {
        // Iteration cap: withhold feedback, accept the best effort.
        ctx.remove(keys::PLAN_FEEDBACK);
        ctx.insert(keys::PLAN_ACCEPTED, json!(true));
        tracing::debug!(iteration, score = evaluation.score, "iteration cap; accepting best effort");
        None
    };

    OptimizerVerdict {
        iteration,
        acceptable: evaluation.acceptable,
        feedback,
    }
}

fn build_feedback(evaluation: &PlanEvaluation) -> String {
    let mut parts = vec![format!("score {:.0}/100", evaluation.score)];
    if !evaluation.issues.is_empty() {
        let top: Vec<&str> = evaluation
            .issues
            .iter()
            .take(FEEDBACK_TOP_N)
            .map(String::as_str)
            .collect();
        parts.push(format!("issues: {}", top.join("; ")));
    }
    if !evaluation.suggestions.is_empty() {
        let top: Vec<&str> = evaluation
            .suggestions
            .iter()
            .take(FEEDBACK_TOP_N)
            .map(String::as_str)
            .collect();
        parts.push(format!("suggestions: {}", top.join("; ")));
    }
    parts.join(". ")
}
