//! Reflection episodes: what a past cycle concluded, weighted by how useful
//! it turned out to be.
//!
//! Episodes carry a utility score updated by outcome recording, and are
//! retrieved by a composite recency + keyword-overlap + utility ranking.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::belief::store::OutcomeKind;
use crate::clock::now_secs;

static WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9']+").unwrap());

/// Recency decays with this half-life in the ranking (seven days).
const RECENCY_HALF_LIFE_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Identifier for a stored episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeId(pub u64);

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// One reflection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Accumulated usefulness in [0.0, 1.0]; starts at zero.
    #[serde(default)]
    pub utility: f32,
    #[serde(default)]
    pub outcome_count: u32,
    pub created_at: u64,
}

/// Weights for the composite retrieval ranking.
#[derive(Debug, Clone)]
pub struct RankingWeights {
    pub recency: f32,
    pub keyword: f32,
    pub utility: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            recency: 0.4,
            keyword: 0.3,
            utility: 0.3,
        }
    }
}

/// A retrieved episode with its composite score.
#[derive(Debug, Clone)]
pub struct ScoredEpisode {
    pub episode: Episode,
    pub score: f32,
}

/// Store of reflection episodes for one user.
#[derive(Debug)]
pub struct EpisodeStore {
    episodes: Vec<Episode>,
    next_id: u64,
    weights: RankingWeights,
}

impl EpisodeStore {
    pub fn new() -> Self {
        Self {
            episodes: Vec::new(),
            next_id: 1,
            weights: RankingWeights::default(),
        }
    }

    /// Rebuild from persisted episodes.
    pub fn from_episodes(episodes: Vec<Episode>) -> Self {
        let next_id = episodes.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        Self {
            episodes,
            next_id,
            weights: RankingWeights::default(),
        }
    }

    /// Record a new reflection.
    pub fn add(&mut self, summary: &str, tags: Vec<String>) -> Episode {
        let id = EpisodeId(self.next_id);
        self.next_id += 1;
        let episode = Episode {
            id,
            summary: summary.into(),
            tags,
            utility: 0.0,
            outcome_count: 0,
            created_at: now_secs(),
        };
        self.episodes.push(episode.clone());
        episode
    }

    pub fn get(&self, id: EpisodeId) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id == id)
    }

    /// Update an episode's utility from an observed outcome.
    /// Confirmed: +0.1 (cap 1.0); contradicted: -0.05 (floor 0.0).
    /// No-op (`None`) on a missing id.
    pub fn record_outcome(&mut self, id: EpisodeId, outcome: OutcomeKind) -> Option<Episode> {
        let episode = self.episodes.iter_mut().find(|e| e.id == id)?;
        match outcome {
            OutcomeKind::Confirmed => episode.utility = (episode.utility + 0.1).clamp(0.0, 1.0),
            OutcomeKind::Contradicted => {
                episode.utility = (episode.utility - 0.05).clamp(0.0, 1.0)
            }
        }
        episode.outcome_count += 1;
        Some(episode.clone())
    }

    /// Retrieve the top_k episodes for a query by composite ranking.
    pub fn retrieve(&self, query: &str, top_k: usize, now: u64) -> Vec<ScoredEpisode> {
        let query_tokens = tokenize(query);
        let mut scored: Vec<ScoredEpisode> = self
            .episodes
            .iter()
            .map(|e| ScoredEpisode {
                episode: e.clone(),
                score: self.score(e, &query_tokens, now),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    fn score(&self, episode: &Episode, query_tokens: &[String], now: u64) -> f32 {
        let age = now.saturating_sub(episode.created_at) as f64;
        let recency = (1.0 / (1.0 + age / RECENCY_HALF_LIFE_SECS)) as f32;

        let keyword = if query_tokens.is_empty() {
            0.0
        } else {
            let episode_tokens: Vec<String> = tokenize(&episode.summary)
                .into_iter()
                .chain(episode.tags.iter().flat_map(|t| tokenize(t)))
                .collect();
            let hits = query_tokens
                .iter()
                .filter(|t| episode_tokens.contains(t))
                .count();
            hits as f32 / query_tokens.len() as f32
        };

        self.weights.recency * recency
            + self.weights.keyword * keyword
            + self.weights.utility * episode.utility
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }
}

impl Default for EpisodeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    WORDS
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
