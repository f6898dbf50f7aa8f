//! The cognitive loop: select → execute → observe until "respond" or the
//! iteration cap.
//!
//! One cycle runs to completion before control returns; nothing here is
//! concurrent. The selector is the reasoning oracle; its failures and
//! unknown action names all degrade to the terminal "respond" so a cycle
//! always ends with whatever partial results were merged into context.

pub mod context;
pub mod optimizer;

use serde::Serialize;

use crate::action::{executor, quality, ActionKind, ActionRegistry, ActionServices, RESPOND};
use crate::oracle::{SelectionDecision, SelectionRequest};

pub use context::{
    keys, ContextMap, CycleAggregates, CycleContext, CycleState, ExecutionRecord,
    SelectionRecord, TransitionRecord,
};
pub use optimizer::{register_evaluation, OptimizerVerdict, PlanEvaluation};

/// Why a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The selector chose "respond".
    Responded,
    /// The hard per-cycle action cap was reached. The cap bounds a
    /// misbehaving selector; it is not a quality gate.
    IterationCap,
}

/// Everything a finished cycle hands back to the caller.
#[derive(Debug)]
pub struct CycleOutcome {
    pub context: CycleContext,
    /// Selection rounds run.
    pub rounds: usize,
    pub termination: Termination,
    /// Legacy aggregates read from the final context.
    pub aggregates: CycleAggregates,
}

/// Run one full cognitive cycle.
pub fn run_cycle(
    registry: &ActionRegistry,
    services: &mut ActionServices<'_>,
    inputs: ContextMap,
) -> CycleOutcome {
    let mut ctx = CycleContext::new(inputs);
    ctx.transition(CycleState::Perceiving);

    let max_rounds = services.config.cycle.max_actions_per_cycle;
    let mut rounds = 0;
    let mut termination = Termination::IterationCap;

    while rounds < max_rounds {
        rounds += 1;

        ctx.transition(CycleState::Selecting);
        let decision = select(registry, services, &ctx);
        tracing::debug!(round = rounds, action = %decision.action, "action selected");
        ctx.selections.push(SelectionRecord {
            round: rounds,
            action: decision.action.clone(),
            reasoning: decision.reasoning.clone(),
        });

        ctx.transition(CycleState::Executing);
        let outcome = executor::execute(registry, &decision.action, services, &mut ctx);

        ctx.transition(CycleState::Observing);
        let kind = registry
            .kind_of(&decision.action)
            .unwrap_or(ActionKind::Terminal);
        let score = quality::score(kind, &outcome);
        if let executor::ExecutionOutcome::Completed(value) = &outcome {
            if let Some(action) = registry.get(&decision.action) {
                ctx.absorb(&action.spec().produces, value);
            }
        }
        ctx.results.push(ExecutionRecord {
            round: rounds,
            action: decision.action.clone(),
            result: outcome.as_value(),
            quality: score,
        });

        if decision.action == RESPOND {
            termination = Termination::Responded;
            break;
        }
    }

    ctx.transition(CycleState::Idle);
    let aggregates = ctx.aggregates();
    CycleOutcome {
        context: ctx,
        rounds,
        termination,
        aggregates,
    }
}

/// One selection round. Oracle failure defaults to "respond" with a generic
/// note; an unregistered action name is coerced to "respond" with annotated
/// reasoning. Re-selecting an action already taken is permitted.
fn select(
    registry: &ActionRegistry,
    services: &ActionServices<'_>,
    ctx: &CycleContext,
) -> SelectionDecision {
    let request = SelectionRequest {
        catalog: registry.catalog_entries(),
        context_summary: ctx.summary(),
        taken: ctx.taken(),
    };

    let decision = match services.oracle.select_action(&request) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(error = %e, "selection oracle failed; defaulting to respond");
            return SelectionDecision {
                action: RESPOND.into(),
                reasoning: "selection oracle unavailable; responding with partial results".into(),
            };
        }
    };

    if decision.action != RESPOND && !registry.contains(&decision.action) {
        tracing::warn!(action = %decision.action, "unknown action selected; coerced to respond");
        return SelectionDecision {
            action: RESPOND.into(),
            reasoning: format!(
                "unknown action \"{}\" coerced to respond (original reasoning: {})",
                decision.action, decision.reasoning
            ),
        };
    }

    decision
}
