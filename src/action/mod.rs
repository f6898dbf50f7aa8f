//! Capability system: trait-based actions with runtime registration.
//!
//! Actions are the loop's interface to everything the agent can do in one
//! cycle. Each capability implements the [`Action`] trait and is registered
//! in an [`ActionRegistry`]; the selector picks among them by name every
//! round.

pub mod builtin;
pub mod executor;
pub mod quality;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::belief::store::{ArchiveLog, BeliefStore};
use crate::config::CoreConfig;
use crate::cycle::context::CycleContext;
use crate::episode::EpisodeStore;
use crate::error::ActionResult;
use crate::oracle::{CatalogEntry, EmbeddingOracle, ReasoningOracle};
use crate::outbox::Outbox;

pub use executor::{execute, ExecutionOutcome};

/// The terminal capability name; selecting it ends the cycle.
pub const RESPOND: &str = "respond";

/// What family a capability belongs to. Drives the deterministic quality
/// evaluator; nothing else keys on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Analysis,
    Generation,
    Evaluation,
    Retrieval,
    Terminal,
    Other,
}

/// Declared interface of a capability.
#[derive(Debug, Clone, Serialize)]
pub struct ActionSpec {
    /// Unique name, the selector's handle.
    pub name: String,
    /// What this capability does, shown to the selection oracle.
    pub description: String,
    pub kind: ActionKind,
    /// Context keys consumed.
    pub requires: Vec<String>,
    /// Context keys emitted.
    pub produces: Vec<String>,
}

impl ActionSpec {
    pub fn catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            name: self.name.clone(),
            description: self.description.clone(),
            requires: self.requires.clone(),
            produces: self.produces.clone(),
        }
    }
}

/// Shared collaborators a handler may touch. Side effects are limited to
/// these; handlers otherwise are functions of the context.
pub struct ActionServices<'a> {
    pub beliefs: &'a mut BeliefStore,
    pub episodes: &'a mut EpisodeStore,
    pub archive: &'a mut ArchiveLog,
    pub outbox: &'a mut Outbox,
    pub oracle: &'a dyn ReasoningOracle,
    pub embedder: &'a dyn EmbeddingOracle,
    pub config: &'a CoreConfig,
}

/// A capability the loop can execute.
pub trait Action: Send + Sync {
    /// Describe this capability's interface.
    fn spec(&self) -> ActionSpec;

    /// Run against the shared context. Errors are caught by the executor,
    /// recorded as `{error}` results, and never abort the cycle.
    fn execute(
        &self,
        services: &mut ActionServices<'_>,
        ctx: &mut CycleContext,
    ) -> ActionResult<serde_json::Value>;
}

/// Registry of available capabilities.
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register a capability. A same-named capability is replaced.
    pub fn register(&mut self, action: Box<dyn Action>) {
        let spec = action.spec();
        self.actions.insert(spec.name.clone(), action);
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.actions.get(name).map(|b| b.as_ref())
    }

    /// Whether a capability is registered under this name.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// All registered specs, sorted by name for stable catalogs.
    pub fn catalog(&self) -> Vec<ActionSpec> {
        let mut specs: Vec<ActionSpec> = self.actions.values().map(|a| a.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Catalog entries as shown to the selection oracle.
    pub fn catalog_entries(&self) -> Vec<CatalogEntry> {
        self.catalog().iter().map(ActionSpec::catalog_entry).collect()
    }

    /// The declared kind of a named capability, if registered.
    pub fn kind_of(&self, name: &str) -> Option<ActionKind> {
        self.get(name).map(|a| a.spec().kind)
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
