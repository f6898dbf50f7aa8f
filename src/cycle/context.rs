//! Per-cycle working memory.
//!
//! A [`CycleContext`] is transient: created when a cycle starts, threaded
//! through every selection and execution, and returned to the caller when
//! the cycle ends. It accumulates produced fields, the ordered selection and
//! result logs, and the state-transition log.

use serde::Serialize;
use serde_json::Value;

use crate::clock::now_secs;

/// Map type for cycle inputs and produced fields.
pub type ContextMap = serde_json::Map<String, Value>;

/// Well-known context keys shared between the loop, the optimizer, and the
/// built-in capabilities.
pub mod keys {
    /// Latest progress assessment (legacy aggregate).
    pub const ASSESSMENT: &str = "assessment";
    /// Latest generated plan (legacy aggregate).
    pub const PLAN: &str = "plan";
    /// Latest autonomy partition (legacy aggregate).
    pub const AUTONOMY: &str = "autonomy";
    /// Running list of evaluation scores this cycle.
    pub const PLAN_SCORES: &str = "plan_scores";
    /// Generate→evaluate iteration counter.
    pub const PLAN_ITERATIONS: &str = "plan_iterations";
    /// Evaluator feedback for the next generation call.
    pub const PLAN_FEEDBACK: &str = "plan_feedback";
    /// Whether the current plan has been accepted.
    pub const PLAN_ACCEPTED: &str = "plan_accepted";
}

/// Loop states. One cycle runs
/// IDLE → PERCEIVING → {SELECTING → EXECUTING → OBSERVING}* → IDLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Perceiving,
    Selecting,
    Executing,
    Observing,
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Perceiving => "perceiving",
            Self::Selecting => "selecting",
            Self::Executing => "executing",
            Self::Observing => "observing",
        };
        f.write_str(name)
    }
}

/// One entry in the action-selection log.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionRecord {
    pub round: usize,
    pub action: String,
    pub reasoning: String,
}

/// One entry in the action-result log.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub round: usize,
    pub action: String,
    /// The handler's result, or `{"error": message}` on failure.
    pub result: Value,
    /// Advisory quality score in [0.0, 1.0].
    pub quality: f32,
}

/// One entry in the state-transition log.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    pub from: CycleState,
    pub to: CycleState,
    pub timestamp: u64,
}

/// Transient working memory for one cognitive cycle.
#[derive(Debug)]
pub struct CycleContext {
    /// Inputs the cycle started with; read-only after perceive.
    pub inputs: ContextMap,
    /// Fields produced by executed actions; latest value per key wins.
    pub produced: ContextMap,
    pub selections: Vec<SelectionRecord>,
    pub results: Vec<ExecutionRecord>,
    pub transitions: Vec<TransitionRecord>,
    state: CycleState,
}

impl CycleContext {
    pub fn new(inputs: ContextMap) -> Self {
        Self {
            inputs,
            produced: ContextMap::new(),
            selections: Vec::new(),
            results: Vec::new(),
            transitions: Vec::new(),
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Move to a new state, recording the transition.
    pub fn transition(&mut self, to: CycleState) {
        self.transitions.push(TransitionRecord {
            from: self.state,
            to,
            timestamp: now_secs(),
        });
        tracing::debug!(from = %self.state, to = %to, "cycle state transition");
        self.state = to;
    }

    /// Read a key, produced fields shadowing inputs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.produced.get(key).or_else(|| self.inputs.get(key))
    }

    /// Read a key as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Write a produced field, replacing any earlier value.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.produced.insert(key.into(), value);
    }

    /// Remove a produced field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.produced.remove(key)
    }

    /// Copy an action's declared produce keys out of its result object.
    pub fn absorb(&mut self, produces: &[String], result: &Value) {
        for key in produces {
            if let Some(value) = result.get(key) {
                self.produced.insert(key.clone(), value.clone());
            }
        }
    }

    /// Names of actions already taken this cycle, in order.
    pub fn taken(&self) -> Vec<String> {
        self.selections.iter().map(|s| s.action.clone()).collect()
    }

    /// Compact summary for the selection oracle: what is known, what has
    /// been done, and how the last action went.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if !self.inputs.is_empty() {
            let keys: Vec<&str> = self.inputs.keys().map(String::as_str).collect();
            lines.push(format!("inputs: {}", keys.join(", ")));
        }
        if !self.produced.is_empty() {
            let fields: Vec<String> = self
                .produced
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{k}={s}"),
                    Value::Number(n) => format!("{k}={n}"),
                    Value::Bool(b) => format!("{k}={b}"),
                    Value::Array(a) => format!("{k}[{}]", a.len()),
                    _ => format!("{k}=<object>"),
                })
                .collect();
            lines.push(format!("produced: {}", fields.join(", ")));
        }
        if let Some(last) = self.results.last() {
            lines.push(format!(
                "last action: {} (quality {:.2})",
                last.action, last.quality
            ));
        }
        lines.push(format!("actions this cycle: {}", self.selections.len()));
        lines.join("\n")
    }

    /// Legacy-compatible aggregates, read as the latest value of each key
    /// regardless of which action sequence produced them.
    pub fn aggregates(&self) -> CycleAggregates {
        CycleAggregates {
            assessment: self.get(keys::ASSESSMENT).cloned(),
            content: self.get(keys::PLAN).cloned(),
            autonomy: self.get(keys::AUTONOMY).cloned(),
        }
    }
}

/// Legacy aggregate fields exposed on every cycle outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CycleAggregates {
    pub assessment: Option<Value>,
    pub content: Option<Value>,
    pub autonomy: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(pairs: &[(&str, Value)]) -> ContextMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn produced_shadows_inputs() {
        let mut ctx = CycleContext::new(inputs(&[("message", json!("hello"))]));
        assert_eq!(ctx.get_str("message"), Some("hello"));
        ctx.insert("message", json!("overridden"));
        assert_eq!(ctx.get_str("message"), Some("overridden"));
    }

    #[test]
    fn absorb_copies_only_declared_keys() {
        let mut ctx = CycleContext::new(ContextMap::new());
        let result = json!({"assessment": {"trend": "improving"}, "internal": 42});
        ctx.absorb(&["assessment".into()], &result);
        assert!(ctx.get("assessment").is_some());
        assert!(ctx.get("internal").is_none());
    }

    #[test]
    fn transitions_are_logged_in_order() {
        let mut ctx = CycleContext::new(ContextMap::new());
        ctx.transition(CycleState::Perceiving);
        ctx.transition(CycleState::Selecting);
        ctx.transition(CycleState::Idle);
        let path: Vec<(CycleState, CycleState)> =
            ctx.transitions.iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            path,
            vec![
                (CycleState::Idle, CycleState::Perceiving),
                (CycleState::Perceiving, CycleState::Selecting),
                (CycleState::Selecting, CycleState::Idle),
            ]
        );
    }

    #[test]
    fn aggregates_read_latest_values() {
        let mut ctx = CycleContext::new(ContextMap::new());
        ctx.insert(keys::PLAN, json!({"units": []}));
        ctx.insert(keys::PLAN, json!({"units": [{"description": "easy run"}]}));
        let aggregates = ctx.aggregates();
        assert!(aggregates.assessment.is_none());
        assert_eq!(aggregates.content.unwrap()["units"].as_array().unwrap().len(), 1);
    }
}
