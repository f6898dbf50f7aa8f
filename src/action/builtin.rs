//! Built-in coaching capabilities.
//!
//! Each capability is a small [`Action`] impl registered by name, in the
//! same shape callers use for their own extensions. Content wording lives
//! entirely oracle-side; handlers only move structured data between the
//! context, the stores, and the collaborators.

use serde_json::{json, Value};

use crate::autonomy::{self, Adjustment};
use crate::belief::retrieval::find_similar;
use crate::clock::now_secs;
use crate::cycle::context::{keys, CycleContext};
use crate::cycle::optimizer::{self, PlanEvaluation};
use crate::error::{ActionError, ActionResult};
use crate::oracle::{EvaluationRequest, GenerationRequest};

use super::{Action, ActionKind, ActionRegistry, ActionServices, ActionSpec, RESPOND};

/// Register every built-in capability.
pub fn register_builtins(registry: &mut ActionRegistry) {
    registry.register(Box::new(RecallContext));
    registry.register(Box::new(AnalyzeProgress));
    registry.register(Box::new(GeneratePlan));
    registry.register(Box::new(EvaluatePlan));
    registry.register(Box::new(ApplyAdjustments));
    registry.register(Box::new(Respond));
}

fn require<'a>(ctx: &'a CycleContext, action: &str, key: &str) -> ActionResult<&'a Value> {
    ctx.get(key).ok_or_else(|| ActionError::MissingContext {
        action: action.into(),
        key: key.into(),
    })
}

// ---------------------------------------------------------------------------
// recall_context
// ---------------------------------------------------------------------------

/// Retrieve beliefs and episodes relevant to the user's message.
pub struct RecallContext;

impl Action for RecallContext {
    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: "recall_context".into(),
            description: "Retrieve stored beliefs and past reflections relevant to the \
                          current message."
                .into(),
            kind: ActionKind::Retrieval,
            requires: vec!["message".into()],
            produces: vec!["recalled_beliefs".into(), "recalled_episodes".into()],
        }
    }

    fn execute(
        &self,
        services: &mut ActionServices<'_>,
        ctx: &mut CycleContext,
    ) -> ActionResult<Value> {
        let message = require(ctx, "recall_context", "message")?
            .as_str()
            .unwrap_or_default()
            .to_string();

        let top_k = services.config.retrieval.top_k;
        let beliefs = find_similar(
            services.beliefs,
            services.embedder,
            &message,
            top_k,
            &services.config.retrieval,
        );
        let episodes = services.episodes.retrieve(&message, top_k, now_secs());

        let mut items: Vec<Value> = Vec::new();
        let belief_views: Vec<Value> = beliefs
            .iter()
            .map(|s| {
                items.push(json!(s.belief.text));
                json!({
                    "id": s.belief.id,
                    "text": s.belief.text,
                    "category": s.belief.category,
                    "confidence": s.belief.confidence,
                    "similarity": s.similarity,
                })
            })
            .collect();
        let episode_views: Vec<Value> = episodes
            .iter()
            .map(|s| {
                items.push(json!(s.episode.summary));
                json!({
                    "id": s.episode.id,
                    "summary": s.episode.summary,
                    "score": s.score,
                })
            })
            .collect();

        Ok(json!({
            "items": items,
            "recalled_beliefs": belief_views,
            "recalled_episodes": episode_views,
        }))
    }
}

// ---------------------------------------------------------------------------
// analyze_progress
// ---------------------------------------------------------------------------

/// Classify the trend of a tracked metric series.
///
/// Deliberately thin: the deep domain-metric arithmetic lives with the
/// caller that assembles the series; this handler only classifies and
/// summarizes it for the rest of the cycle.
pub struct AnalyzeProgress;

/// Relative change beyond which a series counts as moving.
const TREND_EPSILON_PCT: f64 = 5.0;

impl Action for AnalyzeProgress {
    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: "analyze_progress".into(),
            description: "Assess the trend of the tracked metric series supplied with this \
                          cycle."
                .into(),
            kind: ActionKind::Analysis,
            requires: vec!["metrics".into()],
            produces: vec!["assessment".into()],
        }
    }

    fn execute(
        &self,
        _services: &mut ActionServices<'_>,
        ctx: &mut CycleContext,
    ) -> ActionResult<Value> {
        let metrics = require(ctx, "analyze_progress", "metrics")?;
        let metric = metrics["metric"].as_str().unwrap_or_default().to_string();
        let series: Vec<f64> = metrics["series"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();

        if metric.is_empty() || series.is_empty() {
            return Err(ActionError::Failed {
                action: "analyze_progress".into(),
                message: "metrics must carry a metric name and a non-empty series".into(),
            });
        }

        let latest = series[series.len() - 1];
        let average = series.iter().sum::<f64>() / series.len() as f64;

        let (trend, change_pct) = classify_trend(&series);
        let mut observations = vec![
            format!("latest {metric}: {latest:.1}"),
            format!("average over {} samples: {average:.1}", series.len()),
        ];
        if let Some(pct) = change_pct {
            observations.push(format!("recent change: {pct:+.1}%"));
        }

        let assessment = json!({
            "metric": metric,
            "observations": observations,
            "trend": trend,
            "change_pct": change_pct,
        });
        let mut result = assessment.as_object().cloned().unwrap_or_default();
        result.insert("assessment".into(), assessment);
        Ok(Value::Object(result))
    }
}

/// Compare the mean of the later half of the series against the earlier
/// half. Single-sample series read as steady.
fn classify_trend(series: &[f64]) -> (&'static str, Option<f64>) {
    if series.len() < 2 {
        return ("steady", None);
    }
    let mid = series.len() / 2;
    let earlier = series[..mid].iter().sum::<f64>() / mid as f64;
    let later = series[mid..].iter().sum::<f64>() / (series.len() - mid) as f64;
    if earlier == 0.0 {
        return ("steady", None);
    }
    let pct = (later - earlier) / earlier.abs() * 100.0;
    let trend = if pct > TREND_EPSILON_PCT {
        "improving"
    } else if pct < -TREND_EPSILON_PCT {
        "declining"
    } else {
        "steady"
    };
    (trend, Some(pct))
}

// ---------------------------------------------------------------------------
// generate_plan
// ---------------------------------------------------------------------------

/// Generate plan content via the reasoning oracle, honoring evaluator
/// feedback from a previous round.
pub struct GeneratePlan;

impl Action for GeneratePlan {
    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: "generate_plan".into(),
            description: "Draft or revise the weekly plan, addressing evaluator feedback \
                          when present."
                .into(),
            kind: ActionKind::Generation,
            requires: vec![],
            produces: vec!["plan".into()],
        }
    }

    fn execute(
        &self,
        services: &mut ActionServices<'_>,
        ctx: &mut CycleContext,
    ) -> ActionResult<Value> {
        let request = GenerationRequest {
            context_summary: ctx.summary(),
            feedback: ctx.get_str(keys::PLAN_FEEDBACK).map(Into::into),
        };
        let content = services.oracle.generate_content(&request)?;
        let plan = serde_json::to_value(&content).map_err(|e| ActionError::Failed {
            action: "generate_plan".into(),
            message: e.to_string(),
        })?;
        let units = plan.get("units").cloned().unwrap_or_else(|| json!([]));
        Ok(json!({ "plan": plan, "units": units }))
    }
}

// ---------------------------------------------------------------------------
// evaluate_plan
// ---------------------------------------------------------------------------

/// Score the current plan via the evaluation oracle and register the result
/// with the evaluator-optimizer.
pub struct EvaluatePlan;

impl Action for EvaluatePlan {
    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: "evaluate_plan".into(),
            description: "Score the current plan against the coaching criteria; below the \
                          acceptance threshold this emits feedback for regeneration."
                .into(),
            kind: ActionKind::Evaluation,
            requires: vec!["plan".into()],
            produces: vec!["plan_evaluation".into()],
        }
    }

    fn execute(
        &self,
        services: &mut ActionServices<'_>,
        ctx: &mut CycleContext,
    ) -> ActionResult<Value> {
        let plan = require(ctx, "evaluate_plan", keys::PLAN)?.clone();
        let request = EvaluationRequest {
            content: plan,
            context_summary: ctx.summary(),
        };
        let scores = services.oracle.evaluate_content(&request)?;
        let evaluation = PlanEvaluation::from_scores(
            scores,
            services.config.optimizer.acceptance_threshold,
        );
        let verdict = optimizer::register_evaluation(ctx, &evaluation, &services.config.optimizer);

        Ok(json!({
            "plan_evaluation": evaluation.to_value(),
            "score": evaluation.score,
            "acceptable": evaluation.acceptable,
            "iteration": verdict.iteration,
        }))
    }
}

// ---------------------------------------------------------------------------
// apply_adjustments
// ---------------------------------------------------------------------------

/// Partition proposed adjustments by impact and queue the ones that need a
/// human decision.
pub struct ApplyAdjustments;

impl Action for ApplyAdjustments {
    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: "apply_adjustments".into(),
            description: "Apply low-impact adjustments automatically; queue medium and \
                          high impact ones for confirmation."
                .into(),
            kind: ActionKind::Other,
            requires: vec!["adjustments".into()],
            produces: vec!["autonomy".into()],
        }
    }

    fn execute(
        &self,
        services: &mut ActionServices<'_>,
        ctx: &mut CycleContext,
    ) -> ActionResult<Value> {
        let raw = require(ctx, "apply_adjustments", "adjustments")?.clone();
        let adjustments: Vec<Adjustment> =
            serde_json::from_value(raw).map_err(|e| ActionError::Failed {
                action: "apply_adjustments".into(),
                message: format!("adjustments must be a list of adjustment objects: {e}"),
            })?;

        let outcome = autonomy::classify_and_apply(adjustments);
        for proposal in &outcome.proposals {
            services
                .outbox
                .append(proposal.adjustment.clone(), proposal.level);
        }
        Ok(json!({ "autonomy": outcome.to_value() }))
    }
}

// ---------------------------------------------------------------------------
// respond
// ---------------------------------------------------------------------------

/// The loop's only terminal signal. Consumes and produces nothing; the
/// caller reads whatever the cycle merged into context.
pub struct Respond;

impl Action for Respond {
    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: RESPOND.into(),
            description: "Finish the cycle and answer with what has been gathered.".into(),
            kind: ActionKind::Terminal,
            requires: vec![],
            produces: vec![],
        }
    }

    fn execute(
        &self,
        _services: &mut ActionServices<'_>,
        _ctx: &mut CycleContext,
    ) -> ActionResult<Value> {
        Ok(json!({ "status": "responded" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::store::{ArchiveLog, BeliefCategory, BeliefStore, Durability};
    use crate::config::CoreConfig;
    use crate::cycle::context::ContextMap;
    use crate::episode::EpisodeStore;
    use crate::oracle::{
        ContentUnit, EmbeddingOracle, EvaluationScores, GeneratedContent, MergeDecision,
        MergeRequest, OracleError, ReasoningOracle, SelectionDecision, SelectionRequest,
    };
    use crate::outbox::Outbox;
    use std::collections::BTreeMap;

    /// Scripted oracle: fixed generation units and a fixed evaluation score.
    struct StubOracle {
        score: f32,
        targeted_units: bool,
    }

    impl ReasoningOracle for StubOracle {
        fn select_action(&self, _: &SelectionRequest) -> Result<SelectionDecision, OracleError> {
            Ok(SelectionDecision {
                action: RESPOND.into(),
                reasoning: "unused".into(),
            })
        }
        fn generate_content(
            &self,
            _: &GenerationRequest,
        ) -> Result<GeneratedContent, OracleError> {
            let targets = self.targeted_units.then(|| {
                let mut map = serde_json::Map::new();
                map.insert("distance_km".into(), json!(8));
                map
            });
            Ok(GeneratedContent {
                units: vec![ContentUnit {
                    description: "easy run".into(),
                    targets,
                }],
                notes: None,
            })
        }
        fn evaluate_content(
            &self,
            _: &crate::oracle::EvaluationRequest,
        ) -> Result<EvaluationScores, OracleError> {
            Ok(EvaluationScores {
                overall_score: self.score,
                criteria: BTreeMap::new(),
                issues: vec!["no rest day".into()],
                suggestions: vec!["add a rest day".into()],
            })
        }
        fn resolve_merge(&self, _: &MergeRequest) -> Result<MergeDecision, OracleError> {
            Ok(MergeDecision::Noop)
        }
    }

    impl EmbeddingOracle for StubOracle {
        fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    struct Fixture {
        beliefs: BeliefStore,
        episodes: EpisodeStore,
        archive: ArchiveLog,
        outbox: Outbox,
        config: CoreConfig,
        oracle: StubOracle,
    }

    impl Fixture {
        fn new(oracle: StubOracle) -> Self {
            Self {
                beliefs: BeliefStore::new(),
                episodes: EpisodeStore::new(),
                archive: ArchiveLog::new(),
                outbox: Outbox::new(),
                config: CoreConfig::default(),
                oracle,
            }
        }

        fn run(&mut self, action: &dyn Action, ctx: &mut CycleContext) -> ActionResult<Value> {
            let mut services = ActionServices {
                beliefs: &mut self.beliefs,
                episodes: &mut self.episodes,
                archive: &mut self.archive,
                outbox: &mut self.outbox,
                oracle: &self.oracle,
                embedder: &self.oracle,
                config: &self.config,
            };
            action.execute(&mut services, ctx)
        }
    }

    fn ctx_with(pairs: &[(&str, Value)]) -> CycleContext {
        let inputs: ContextMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        CycleContext::new(inputs)
    }

    #[test]
    fn recall_requires_message() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[]);
        let result = fixture.run(&RecallContext, &mut ctx);
        assert!(matches!(result, Err(ActionError::MissingContext { .. })));
    }

    #[test]
    fn recall_returns_beliefs_and_episodes_as_items() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        fixture.beliefs.add(
            "prefers morning runs",
            BeliefCategory::Preference,
            0.8,
            "t",
            None,
            Durability::Global,
        );
        fixture.episodes.add("user enjoyed last week's tempo run", vec![]);

        let mut ctx = ctx_with(&[("message", json!("what should this week look like"))]);
        let result = fixture.run(&RecallContext, &mut ctx).unwrap();
        assert_eq!(result["items"].as_array().unwrap().len(), 2);
        assert_eq!(result["recalled_beliefs"].as_array().unwrap().len(), 1);
        assert_eq!(result["recalled_episodes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn analyze_classifies_improving_series() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[(
            "metrics",
            json!({"metric": "weekly_volume_km", "series": [20.0, 22.0, 28.0, 30.0]}),
        )]);
        let result = fixture.run(&AnalyzeProgress, &mut ctx).unwrap();
        assert_eq!(result["trend"], "improving");
        assert_eq!(result["metric"], "weekly_volume_km");
        assert!(!result["observations"].as_array().unwrap().is_empty());
        assert_eq!(result["assessment"]["trend"], "improving");
    }

    #[test]
    fn analyze_empty_series_fails() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[("metrics", json!({"metric": "volume", "series": []}))]);
        assert!(fixture.run(&AnalyzeProgress, &mut ctx).is_err());
    }

    #[test]
    fn trend_classification_bounds() {
        assert_eq!(classify_trend(&[10.0]).0, "steady");
        assert_eq!(classify_trend(&[10.0, 10.1]).0, "steady");
        assert_eq!(classify_trend(&[10.0, 20.0]).0, "improving");
        assert_eq!(classify_trend(&[20.0, 10.0]).0, "declining");
    }

    #[test]
    fn generate_emits_plan_and_units() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[]);
        let result = fixture.run(&GeneratePlan, &mut ctx).unwrap();
        assert_eq!(result["units"].as_array().unwrap().len(), 1);
        assert_eq!(result["plan"]["units"][0]["description"], "easy run");
    }

    #[test]
    fn evaluate_registers_with_optimizer() {
        let mut fixture = Fixture::new(StubOracle { score: 45.0, targeted_units: true });
        let mut ctx = ctx_with(&[]);
        ctx.insert(keys::PLAN, json!({"units": []}));
        let result = fixture.run(&EvaluatePlan, &mut ctx).unwrap();
        assert_eq!(result["score"], 45.0);
        assert_eq!(result["acceptable"], false);
        // Below threshold, before the cap: feedback waits in context.
        assert!(ctx.get_str(keys::PLAN_FEEDBACK).unwrap().contains("45"));
        assert_eq!(ctx.get(keys::PLAN_ITERATIONS).unwrap(), &json!(1));
    }

    #[test]
    fn evaluate_without_plan_fails() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[]);
        assert!(matches!(
            fixture.run(&EvaluatePlan, &mut ctx),
            Err(ActionError::MissingContext { .. })
        ));
    }

    #[test]
    fn apply_adjustments_queues_proposals() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[(
            "adjustments",
            json!([
                {"description": "tweak warmup"},
                {"description": "cancel Sunday long run"}
            ]),
        )]);
        let result = fixture.run(&ApplyAdjustments, &mut ctx).unwrap();
        assert_eq!(result["autonomy"]["auto_applied"].as_array().unwrap().len(), 1);
        assert_eq!(result["autonomy"]["proposals"].as_array().unwrap().len(), 1);
        assert_eq!(fixture.outbox.pending().len(), 1);
    }

    #[test]
    fn respond_is_trivially_ok() {
        let mut fixture = Fixture::new(StubOracle { score: 80.0, targeted_units: true });
        let mut ctx = ctx_with(&[]);
        let result = fixture.run(&Respond, &mut ctx).unwrap();
        assert_eq!(result["status"], "responded");
    }
}
