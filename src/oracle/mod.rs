//! Collaborator contracts for the reasoning and embedding oracles.
//!
//! The core never generates natural language or embeddings itself; both are
//! runtime dependencies injected at every decision point. Each contract is a
//! narrow request/response pair with explicit failure, so the loop can be
//! driven deterministically by stub implementations in tests.
//!
//! Every call site recovers from [`OracleError`] locally: selection defaults
//! to "respond", merge defaults to ADD, retrieval falls back to the full
//! active set. An oracle failure never aborts a cycle.

pub mod ollama;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::belief::store::{BeliefCategory, BeliefId};
pub use crate::error::OracleError;
pub use ollama::{OllamaConfig, OllamaOracle};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// One catalog entry shown to the selection oracle.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub requires: Vec<String>,
    pub produces: Vec<String>,
}

/// Input to one selection round: what can be done, what the context looks
/// like, and what has already been tried this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionRequest {
    pub catalog: Vec<CatalogEntry>,
    pub context_summary: String,
    pub taken: Vec<String>,
}

/// The oracle's choice for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub action: String,
    pub reasoning: String,
}

// ---------------------------------------------------------------------------
// Content generation
// ---------------------------------------------------------------------------

/// Input to a content generation call. `feedback` carries the
/// evaluator-optimizer's notes from the previous evaluation round, when one
/// exists.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub context_summary: String,
    pub feedback: Option<String>,
}

/// One generated unit (e.g. a planned session). `targets` holds the
/// structured per-unit goals; units without them earn only partial quality
/// credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    pub description: String,
    #[serde(default)]
    pub targets: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Oracle-generated content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub units: Vec<ContentUnit>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The six named criteria every evaluation scores.
pub const EVALUATION_CRITERIA: [&str; 6] = [
    "safety",
    "progression",
    "recovery",
    "specificity",
    "variety",
    "feasibility",
];

/// Input to a content evaluation call.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRequest {
    pub content: serde_json::Value,
    pub context_summary: String,
}

/// Raw evaluation scores from the oracle, all on a 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationScores {
    pub overall_score: f32,
    #[serde(default)]
    pub criteria: BTreeMap<String, f32>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Compare-merge
// ---------------------------------------------------------------------------

/// A stored belief as shown to the merge oracle.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarBeliefView {
    pub id: BeliefId,
    pub text: String,
    pub category: BeliefCategory,
    pub confidence: f32,
    pub similarity: f32,
}

/// Input to a merge decision: the candidate statement and its nearest stored
/// neighbors.
#[derive(Debug, Clone, Serialize)]
pub struct MergeRequest {
    pub candidate_text: String,
    pub candidate_category: BeliefCategory,
    pub candidate_confidence: f32,
    pub similar: Vec<SimilarBeliefView>,
}

/// The merge oracle's verdict on new evidence.
///
/// `Delete` models replacement, not destruction: the candidate is stored as
/// a new belief and the target is invalidated with `superseded_by` pointing
/// at it.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    Add,
    Update {
        target: BeliefId,
        new_text: Option<String>,
        new_confidence: Option<f32>,
    },
    Delete {
        target: BeliefId,
    },
    Noop,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The natural-language decision-making collaborator, treated as a black box.
///
/// All four contracts block; callers apply their own timeout policy at this
/// boundary (the core implements none).
pub trait ReasoningOracle: Send + Sync {
    /// Choose the next action for a cycle round.
    fn select_action(&self, request: &SelectionRequest) -> Result<SelectionDecision, OracleError>;

    /// Generate content (e.g. a weekly plan), honoring evaluator feedback.
    fn generate_content(&self, request: &GenerationRequest)
        -> Result<GeneratedContent, OracleError>;

    /// Score generated content against the named criteria.
    fn evaluate_content(&self, request: &EvaluationRequest)
        -> Result<EvaluationScores, OracleError>;

    /// Decide how new evidence resolves against existing beliefs.
    fn resolve_merge(&self, request: &MergeRequest) -> Result<MergeDecision, OracleError>;
}

/// The embedding collaborator: text in, fixed-length vector out.
pub trait EmbeddingOracle: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError>;
}
