//! The decision core facade.
//!
//! An [`Agent`] owns all per-user mutable state (belief store, episodes,
//! archive, outbox) plus the capability registry, and borrows the oracle
//! collaborators injected at construction. One instance per user; one cycle
//! runs to completion before control returns. Concurrent cycles for the
//! same user are unsupported without external serialization.

use crate::action::{builtin, ActionRegistry, ActionServices};
use crate::belief::document::{Profile, UserDocument};
use crate::belief::merge::{self, CandidateBelief, MergeOutcome};
use crate::belief::retrieval::{find_similar, SimilarBelief};
use crate::belief::store::{ArchiveLog, BeliefStore, PruneReport};
use crate::clock::now_secs;
use crate::config::CoreConfig;
use crate::cycle::{self, ContextMap, CycleOutcome};
use crate::episode::EpisodeStore;
use crate::oracle::{EmbeddingOracle, ReasoningOracle};
use crate::outbox::Outbox;

/// The autonomous decision core for one user.
pub struct Agent {
    config: CoreConfig,
    registry: ActionRegistry,
    beliefs: BeliefStore,
    episodes: EpisodeStore,
    archive: ArchiveLog,
    outbox: Outbox,
    oracle: Box<dyn ReasoningOracle>,
    embedder: Box<dyn EmbeddingOracle>,
    profile: Profile,
    interactions: u64,
    created_at: u64,
}

impl Agent {
    /// Create a fresh agent with the built-in capabilities registered.
    pub fn new(
        config: CoreConfig,
        oracle: Box<dyn ReasoningOracle>,
        embedder: Box<dyn EmbeddingOracle>,
    ) -> Self {
        let mut registry = ActionRegistry::new();
        builtin::register_builtins(&mut registry);
        Self {
            config,
            registry,
            beliefs: BeliefStore::new(),
            episodes: EpisodeStore::new(),
            archive: ArchiveLog::new(),
            outbox: Outbox::new(),
            oracle,
            embedder,
            profile: Profile::default(),
            interactions: 0,
            created_at: now_secs(),
        }
    }

    /// Restore an agent from a persisted user document.
    pub fn from_document(
        config: CoreConfig,
        document: &UserDocument,
        oracle: Box<dyn ReasoningOracle>,
        embedder: Box<dyn EmbeddingOracle>,
    ) -> Self {
        let mut agent = Self::new(config, oracle, embedder);
        agent.beliefs = document.to_store();
        agent.profile = document.profile.clone();
        agent.interactions = document.meta.interactions;
        agent.created_at = document.meta.created_at;
        agent
    }

    /// Snapshot the agent's belief state into a persistable document.
    pub fn to_document(&self) -> UserDocument {
        let mut document = UserDocument::new();
        document.profile = self.profile.clone();
        document.meta.created_at = self.created_at;
        document.meta.interactions = self.interactions;
        document.absorb_store(&self.beliefs);
        document
    }

    /// Run one cognitive cycle over the given inputs.
    pub fn run_cycle(&mut self, inputs: ContextMap) -> CycleOutcome {
        self.interactions += 1;
        let mut services = ActionServices {
            beliefs: &mut self.beliefs,
            episodes: &mut self.episodes,
            archive: &mut self.archive,
            outbox: &mut self.outbox,
            oracle: self.oracle.as_ref(),
            embedder: self.embedder.as_ref(),
            config: &self.config,
        };
        cycle::run_cycle(&self.registry, &mut services, inputs)
    }

    /// Resolve a freshly extracted statement against the belief store.
    pub fn integrate_evidence(&mut self, candidate: CandidateBelief) -> MergeOutcome {
        merge::resolve(
            &mut self.beliefs,
            self.oracle.as_ref(),
            self.embedder.as_ref(),
            candidate,
            &self.config.retrieval,
        )
    }

    /// Rank stored beliefs against a query text.
    pub fn recall_beliefs(&self, text: &str, top_k: usize) -> Vec<SimilarBelief> {
        find_similar(
            &self.beliefs,
            self.embedder.as_ref(),
            text,
            top_k,
            &self.config.retrieval,
        )
    }

    /// Close the session: sweep the belief store and expire stale proposals.
    pub fn end_session(&mut self) -> PruneReport {
        let now = now_secs();
        self.outbox.expire(now, self.config.outbox.ttl_secs);
        self.beliefs
            .prune(&mut self.archive, &self.config.prune, now)
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    pub fn beliefs_mut(&mut self) -> &mut BeliefStore {
        &mut self.beliefs
    }

    pub fn episodes(&self) -> &EpisodeStore {
        &self.episodes
    }

    pub fn episodes_mut(&mut self) -> &mut EpisodeStore {
        &mut self.episodes
    }

    pub fn archive(&self) -> &ArchiveLog {
        &self.archive
    }

    /// Attach a file-backed archive log (replacing the in-memory one).
    pub fn set_archive(&mut self, archive: ArchiveLog) {
        self.archive = archive;
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Completed interaction cycles.
    pub fn interactions(&self) -> u64 {
        self.interactions
    }

    /// Register a caller-provided capability.
    pub fn register_action(&mut self, action: Box<dyn crate::action::Action>) {
        self.registry.register(action);
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("beliefs", &self.beliefs.len())
            .field("episodes", &self.episodes.len())
            .field("outbox", &self.outbox.len())
            .field("interactions", &self.interactions)
            .finish()
    }
}
