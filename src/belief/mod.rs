//! Belief memory: timestamped, confidence- and utility-weighted statements
//! about a user.
//!
//! - **store** — records, lifecycle (add/update/invalidate/outcomes), the
//!   pruning sweep, and the permanent archive log
//! - **retrieval** — similarity ranking against stored embeddings
//! - **merge** — the compare-merge protocol resolving new evidence
//! - **document** — the persisted per-user document

pub mod document;
pub mod merge;
pub mod retrieval;
pub mod store;

pub use document::{DocumentMeta, Profile, UserDocument};
pub use merge::{CandidateBelief, MergeOutcome};
pub use retrieval::{find_similar, SimilarBelief};
pub use store::{
    ArchiveLog, Belief, BeliefCategory, BeliefId, BeliefStore, Durability, OutcomeKind,
    OutcomeRecord, PruneReport,
};
