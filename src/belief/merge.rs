//! Compare-merge protocol: resolving new evidence against stored beliefs.
//!
//! The merge oracle sees the candidate statement and its nearest stored
//! neighbors and returns ADD, UPDATE, DELETE, or NOOP. Oracle failure and an
//! empty similar set both default to ADD: the system errs toward
//! accumulating new signal rather than silently discarding it.

use crate::config::RetrievalConfig;
use crate::oracle::{
    EmbeddingOracle, MergeDecision, MergeRequest, ReasoningOracle, SimilarBeliefView,
};

use super::retrieval::find_similar;
use super::store::{BeliefCategory, BeliefId, BeliefStore, Durability};

/// A freshly extracted statement, not yet stored.
#[derive(Debug, Clone)]
pub struct CandidateBelief {
    pub text: String,
    pub category: BeliefCategory,
    pub confidence: f32,
    pub source: String,
    pub source_ref: Option<String>,
    pub durability: Durability,
}

/// What the merge protocol did with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Stored as a new belief.
    Added(BeliefId),
    /// An existing belief was revised in place.
    Updated(BeliefId),
    /// The candidate replaced an existing belief.
    Replaced { old: BeliefId, new: BeliefId },
    /// Nothing changed.
    Unchanged,
}

/// Resolve a candidate against the store.
pub fn resolve(
    store: &mut BeliefStore,
    oracle: &dyn ReasoningOracle,
    embedder: &dyn EmbeddingOracle,
    candidate: CandidateBelief,
    config: &RetrievalConfig,
) -> MergeOutcome {
    let similar = find_similar(store, embedder, &candidate.text, config.top_k, config);

    let decision = if similar.is_empty() {
        MergeDecision::Add
    } else {
        let request = MergeRequest {
            candidate_text: candidate.text.clone(),
            candidate_category: candidate.category,
            candidate_confidence: candidate.confidence,
            similar: similar
                .iter()
                .map(|s| SimilarBeliefView {
                    id: s.belief.id,
                    text: s.belief.text.clone(),
                    category: s.belief.category,
                    confidence: s.belief.confidence,
                    similarity: s.similarity,
                })
                .collect(),
        };
        match oracle.resolve_merge(&request) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "merge oracle failed; defaulting to ADD");
                MergeDecision::Add
            }
        }
    };

    apply(store, embedder, candidate, decision)
}

fn apply(
    store: &mut BeliefStore,
    embedder: &dyn EmbeddingOracle,
    candidate: CandidateBelief,
    decision: MergeDecision,
) -> MergeOutcome {
    match decision {
        MergeDecision::Add => {
            let id = add_candidate(store, &candidate);
            embed(store, embedder, id);
            MergeOutcome::Added(id)
        }
        MergeDecision::Update {
            target,
            new_text,
            new_confidence,
        } => {
            // Null fields mean "leave unchanged"; the update still counts
            // as a fresh confirmation of the target.
            match store.update(target, new_text.as_deref(), new_confidence) {
                Some(_) => {
                    embed(store, embedder, target);
                    MergeOutcome::Updated(target)
                }
                None => {
                    tracing::warn!(%target, "merge UPDATE on stale belief id; no-op");
                    MergeOutcome::Unchanged
                }
            }
        }
        MergeDecision::Delete { target } => {
            // Replacement, not destruction: store the candidate first, then
            // invalidate the target pointing at it.
            let new = add_candidate(store, &candidate);
            embed(store, embedder, new);
            if store.invalidate(target, Some(new)).is_none() {
                tracing::warn!(%target, "merge DELETE on stale belief id; kept replacement");
            }
            MergeOutcome::Replaced { old: target, new }
        }
        MergeDecision::Noop => MergeOutcome::Unchanged,
    }
}

fn add_candidate(store: &mut BeliefStore, candidate: &CandidateBelief) -> BeliefId {
    store
        .add(
            &candidate.text,
            candidate.category,
            candidate.confidence,
            &candidate.source,
            candidate.source_ref.as_deref(),
            candidate.durability,
        )
        .id
}

fn embed(store: &mut BeliefStore, embedder: &dyn EmbeddingOracle, id: BeliefId) {
    let Some(text) = store.get(id).map(|b| b.text.clone()) else {
        return;
    };
    match embedder.embed(&text) {
        Ok(vector) => {
            store.set_embedding(id, Some(vector));
        }
        Err(e) => {
            tracing::warn!(%id, error = %e, "embedding failed; belief stored without vector");
        }
    }
}
