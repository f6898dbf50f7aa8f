//! Similarity retrieval over stored belief embeddings.
//!
//! Retrieval never raises. On sparse stores (fewer active beliefs than the
//! configured floor) embedding search is skipped entirely and the whole
//! active set comes back at similarity 1.0; an embedding-collaborator
//! failure falls back to the same policy.

use crate::config::RetrievalConfig;
use crate::oracle::EmbeddingOracle;

use super::store::{Belief, BeliefStore};

/// A retrieved belief with its similarity to the query.
#[derive(Debug, Clone)]
pub struct SimilarBelief {
    pub belief: Belief,
    pub similarity: f32,
}

/// Rank active beliefs against a query text.
///
/// Beliefs without a stored embedding score 0.0 rather than being skipped,
/// so a freshly added (not yet embedded) belief still appears in dense
/// results when `top_k` allows.
pub fn find_similar(
    store: &BeliefStore,
    embedder: &dyn EmbeddingOracle,
    text: &str,
    top_k: usize,
    config: &RetrievalConfig,
) -> Vec<SimilarBelief> {
    let active = store.get_active(None, None);

    if active.len() < config.sparse_floor {
        return all_at_full_similarity(&active);
    }

    let query = match embedder.embed(text) {
        Ok(vector) => vector,
        Err(e) => {
            tracing::warn!(error = %e, "embedding failed; returning full active set");
            return all_at_full_similarity(&active);
        }
    };

    let mut scored: Vec<SimilarBelief> = active
        .iter()
        .map(|b| SimilarBelief {
            belief: (*b).clone(),
            similarity: b
                .embedding
                .as_deref()
                .map_or(0.0, |e| cosine_similarity(&query, e)),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

fn all_at_full_similarity(active: &[&Belief]) -> Vec<SimilarBelief> {
    active
        .iter()
        .map(|b| SimilarBelief {
            belief: (*b).clone(),
            similarity: 1.0,
        })
        .collect()
}

/// Cosine similarity between two vectors. Mismatched lengths and zero
/// vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&av, &bv) in a.iter().zip(b.iter()) {
        let av = av as f64;
        let bv = bv as f64;
        dot += av * bv;
        norm_a += av * av;
        norm_b += bv * bv;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom) as f32
}
