//! Failure-isolating capability execution.
//!
//! The executor's boundary is infallible: an unregistered name or a handler
//! error becomes a [`Failed`](ExecutionOutcome::Failed) result that the loop
//! records and moves past. A failure never aborts the cycle; the next
//! selection round sees it and can choose differently.

use serde_json::{json, Value};

use crate::cycle::context::CycleContext;

use super::{ActionRegistry, ActionServices};

/// What executing a named capability produced.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The handler's result value.
    Completed(Value),
    /// The handler failed, or the name was unregistered.
    Failed { message: String },
}

impl ExecutionOutcome {
    /// The result as recorded in the context log: the value itself, or an
    /// `{"error": message}` object.
    pub fn as_value(&self) -> Value {
        match self {
            Self::Completed(value) => value.clone(),
            Self::Failed { message } => json!({ "error": message }),
        }
    }

    /// Whether this outcome carries an error, either as a failure or as an
    /// `error` field inside a completed result.
    pub fn is_error(&self) -> bool {
        match self {
            Self::Failed { .. } => true,
            Self::Completed(value) => value.get("error").is_some(),
        }
    }
}

/// Execute a capability by name against the shared context.
pub fn execute(
    registry: &ActionRegistry,
    name: &str,
    services: &mut ActionServices<'_>,
    ctx: &mut CycleContext,
) -> ExecutionOutcome {
    let Some(action) = registry.get(name) else {
        tracing::warn!(action = name, "unknown action requested; recording error result");
        return ExecutionOutcome::Failed {
            message: format!("unknown action \"{name}\""),
        };
    };

    match action.execute(services, ctx) {
        Ok(value) => ExecutionOutcome::Completed(value),
        Err(e) => {
            tracing::warn!(action = name, error = %e, "action failed; cycle continues");
            ExecutionOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}
