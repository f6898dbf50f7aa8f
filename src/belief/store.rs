//! Belief records and their lifecycle.
//!
//! Beliefs are never physically deleted: "deletion" sets `active = false`,
//! stamps `archived_at`, and optionally points `superseded_by` at a
//! replacement. The pruning sweep appends every archived belief, embedding
//! stripped, to a permanent [`ArchiveLog`].

use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::clock::now_secs;
use crate::config::PruneConfig;

/// Identifier for a stored belief. Stable across document save/load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BeliefId(pub u64);

impl std::fmt::Display for BeliefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Coaching-domain category tag for a belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefCategory {
    Training,
    Recovery,
    Nutrition,
    Schedule,
    Motivation,
    Preference,
    Context,
}

impl BeliefCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Recovery => "recovery",
            Self::Nutrition => "nutrition",
            Self::Schedule => "schedule",
            Self::Motivation => "motivation",
            Self::Preference => "preference",
            Self::Context => "context",
        }
    }
}

impl std::fmt::Display for BeliefCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a belief is meant to outlive its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Scoped to one session; swept at session close.
    Session,
    /// Persists across sessions until invalidated or pruned.
    Global,
}

/// Direction of recorded evidence about a belief's practical usefulness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Confirmed,
    Contradicted,
}

/// One entry in a belief's outcome history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub kind: OutcomeKind,
    #[serde(default)]
    pub detail: Option<String>,
    pub timestamp: u64,
}

/// A confidence- and utility-weighted, timestamped statement about a user.
///
/// The utility-tracking fields carry `#[serde(default)]`: documents written
/// before utility tracking existed load with them defaulted in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Belief {
    pub id: BeliefId,
    pub text: String,
    pub category: BeliefCategory,
    /// Belief strength in [0.0, 1.0].
    pub confidence: f32,
    /// Resistance to revision in [0.0, 1.0].
    #[serde(default = "default_stability")]
    pub stability: f32,
    pub durability: Durability,
    /// Where the statement came from (e.g. "extraction", "merge").
    pub source: String,
    #[serde(default)]
    pub source_ref: Option<String>,
    /// Seconds since the UNIX epoch.
    pub first_observed: u64,
    pub last_confirmed: u64,
    pub valid_from: u64,
    #[serde(default)]
    pub valid_until: Option<u64>,
    pub active: bool,
    #[serde(default)]
    pub archived_at: Option<u64>,
    #[serde(default)]
    pub superseded_by: Option<BeliefId>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Accumulated evidence of practical usefulness, in [0.0, 1.0].
    /// Distinct from confidence (belief strength).
    #[serde(default)]
    pub utility: f32,
    #[serde(default)]
    pub outcome_count: u32,
    #[serde(default)]
    pub last_outcome: Option<OutcomeKind>,
    #[serde(default)]
    pub outcome_history: Vec<OutcomeRecord>,
}

fn default_stability() -> f32 {
    0.5
}

/// Result of one pruning sweep.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Session-durability beliefs archived at session close.
    pub session_archived: usize,
    /// Low-confidence, stale beliefs archived.
    pub stale_archived: usize,
}

impl PruneReport {
    pub fn total(&self) -> usize {
        self.session_archived + self.stale_archived
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory belief store, exclusively owned by one core instance per user.
#[derive(Debug)]
pub struct BeliefStore {
    beliefs: Vec<Belief>,
    next_id: u64,
}

impl BeliefStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            beliefs: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a store from persisted parts.
    ///
    /// The id counter is advanced past every stored id, so documents written
    /// before the counter was persisted still allocate fresh ids safely.
    pub fn from_parts(beliefs: Vec<Belief>, next_id: u64) -> Self {
        let max_id = beliefs.iter().map(|b| b.id.0).max().unwrap_or(0);
        Self {
            beliefs,
            next_id: next_id.max(max_id + 1),
        }
    }

    /// Decompose into persisted parts: `(beliefs, next_id)`.
    pub fn into_parts(self) -> (Vec<Belief>, u64) {
        (self.beliefs, self.next_id)
    }

    /// Store a new belief. Timestamps are stamped now; the embedding starts
    /// empty and is filled by the merge layer.
    pub fn add(
        &mut self,
        text: &str,
        category: BeliefCategory,
        confidence: f32,
        source: &str,
        source_ref: Option<&str>,
        durability: Durability,
    ) -> Belief {
        let now = now_secs();
        let id = BeliefId(self.next_id);
        self.next_id += 1;
        let belief = Belief {
            id,
            text: text.into(),
            category,
            confidence: confidence.clamp(0.0, 1.0),
            stability: default_stability(),
            durability,
            source: source.into(),
            source_ref: source_ref.map(Into::into),
            first_observed: now,
            last_confirmed: now,
            valid_from: now,
            valid_until: None,
            active: true,
            archived_at: None,
            superseded_by: None,
            embedding: None,
            utility: 0.0,
            outcome_count: 0,
            last_outcome: None,
            outcome_history: Vec::new(),
        };
        self.beliefs.push(belief.clone());
        tracing::debug!(%id, category = %category, "belief added");
        belief
    }

    /// Get a belief by id.
    pub fn get(&self, id: BeliefId) -> Option<&Belief> {
        self.beliefs.iter().find(|b| b.id == id)
    }

    fn get_active_mut(&mut self, id: BeliefId) -> Option<&mut Belief> {
        self.beliefs.iter_mut().find(|b| b.id == id && b.active)
    }

    /// Revise a belief in place. No-op (`None`) on a missing or inactive id.
    /// A text change clears the stored embedding, forcing re-embedding.
    pub fn update(
        &mut self,
        id: BeliefId,
        new_text: Option<&str>,
        new_confidence: Option<f32>,
    ) -> Option<Belief> {
        let now = now_secs();
        let belief = self.get_active_mut(id)?;
        if let Some(text) = new_text {
            if text != belief.text {
                belief.text = text.into();
                belief.embedding = None;
            }
        }
        if let Some(confidence) = new_confidence {
            belief.confidence = confidence.clamp(0.0, 1.0);
        }
        belief.last_confirmed = now;
        Some(belief.clone())
    }

    /// Archive a belief: sets `active = false`, `archived_at`, and
    /// `valid_until` to now, optionally pointing at a replacement.
    /// Idempotent: a second call on an already-inactive belief returns `None`.
    pub fn invalidate(&mut self, id: BeliefId, superseded_by: Option<BeliefId>) -> Option<Belief> {
        let now = now_secs();
        let belief = self.get_active_mut(id)?;
        belief.active = false;
        belief.archived_at = Some(now);
        belief.valid_until = Some(now);
        belief.superseded_by = superseded_by;
        tracing::debug!(%id, superseded_by = ?superseded_by, "belief invalidated");
        Some(belief.clone())
    }

    /// Active beliefs, optionally filtered by category and minimum confidence.
    pub fn get_active(
        &self,
        category: Option<BeliefCategory>,
        min_confidence: Option<f32>,
    ) -> Vec<&Belief> {
        self.beliefs
            .iter()
            .filter(|b| b.active)
            .filter(|b| category.is_none_or(|c| b.category == c))
            .filter(|b| min_confidence.is_none_or(|m| b.confidence >= m))
            .collect()
    }

    /// Record observed evidence about a belief's usefulness.
    ///
    /// Confirmed: confidence +0.05 (cap 1.0), utility +0.1 (cap 1.0).
    /// Contradicted: confidence -0.10 (floor 0.0), utility -0.05 (floor 0.0).
    /// Always increments the outcome count, sets the last outcome, and
    /// appends to the history. No-op (`None`) on a missing or inactive id.
    pub fn record_outcome(
        &mut self,
        id: BeliefId,
        outcome: OutcomeKind,
        detail: Option<&str>,
    ) -> Option<Belief> {
        let now = now_secs();
        let belief = self.get_active_mut(id)?;
        match outcome {
            OutcomeKind::Confirmed => {
                belief.confidence = (belief.confidence + 0.05).clamp(0.0, 1.0);
                belief.utility = (belief.utility + 0.1).clamp(0.0, 1.0);
                belief.last_confirmed = now;
            }
            OutcomeKind::Contradicted => {
                belief.confidence = (belief.confidence - 0.10).clamp(0.0, 1.0);
                belief.utility = (belief.utility - 0.05).clamp(0.0, 1.0);
            }
        }
        belief.outcome_count += 1;
        belief.last_outcome = Some(outcome);
        belief.outcome_history.push(OutcomeRecord {
            kind: outcome,
            detail: detail.map(Into::into),
            timestamp: now,
        });
        Some(belief.clone())
    }

    /// Set or clear a belief's embedding. Returns false on a missing or
    /// inactive id.
    pub fn set_embedding(&mut self, id: BeliefId, embedding: Option<Vec<f32>>) -> bool {
        match self.get_active_mut(id) {
            Some(belief) => {
                belief.embedding = embedding;
                true
            }
            None => false,
        }
    }

    /// Number of active beliefs.
    pub fn active_count(&self) -> usize {
        self.beliefs.iter().filter(|b| b.active).count()
    }

    /// Total records held, archived included.
    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    /// Whether the store holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }

    /// All records, archived included.
    pub fn beliefs(&self) -> &[Belief] {
        &self.beliefs
    }

    /// Pruning sweep, run at session close.
    ///
    /// Invalidates session-durability survivors and beliefs that are both
    /// below the confidence floor and unconfirmed past the max-age window.
    /// Every archived belief is appended, embedding stripped, to the archive
    /// log; the records themselves stay in the store, inactive.
    pub fn prune(
        &mut self,
        archive: &mut ArchiveLog,
        config: &PruneConfig,
        now: u64,
    ) -> PruneReport {
        let mut report = PruneReport::default();
        let candidates: Vec<(BeliefId, bool)> = self
            .beliefs
            .iter()
            .filter(|b| b.active)
            .filter_map(|b| {
                if b.durability == Durability::Session {
                    Some((b.id, true))
                } else if b.confidence < config.confidence_floor
                    && now.saturating_sub(b.last_confirmed) > config.max_age_secs
                {
                    Some((b.id, false))
                } else {
                    None
                }
            })
            .collect();

        for (id, session_scoped) in candidates {
            if let Some(archived) = self.invalidate(id, None) {
                archive.append(archived);
                if session_scoped {
                    report.session_archived += 1;
                } else {
                    report.stale_archived += 1;
                }
            }
        }

        if report.total() > 0 {
            tracing::info!(
                session = report.session_archived,
                stale = report.stale_archived,
                "prune sweep archived beliefs"
            );
        }
        report
    }
}

impl Default for BeliefStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Archive log
// ---------------------------------------------------------------------------

/// Permanent append-only log of archived beliefs.
///
/// Entries are stored embedding-stripped, in memory and (when a path is
/// attached) as JSON lines on disk. Disk failures are logged and tolerated;
/// the in-memory log is the source of truth for the running process.
pub struct ArchiveLog {
    entries: Vec<Belief>,
    path: Option<PathBuf>,
}

impl ArchiveLog {
    /// In-memory archive log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            path: None,
        }
    }

    /// Archive log backed by a JSONL file. Existing entries are loaded;
    /// an absent file starts empty.
    pub fn with_path(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .filter_map(|line| match serde_json::from_str::<Belief>(line) {
                    Ok(belief) => Some(belief),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable archive line");
                        None
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        Self {
            entries,
            path: Some(path),
        }
    }

    /// Append an archived belief, stripping its embedding.
    pub fn append(&mut self, mut belief: Belief) {
        belief.embedding = None;
        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, &belief) {
                tracing::warn!(error = %e, "failed to append to archive log file");
            }
        }
        self.entries.push(belief);
    }

    /// All archived entries, oldest first.
    pub fn entries(&self) -> &[Belief] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn append_line(path: &PathBuf, belief: &Belief) -> std::io::Result<()> {
    let line = serde_json::to_string(belief)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}

impl Default for ArchiveLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArchiveLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveLog")
            .field("entries", &self.entries.len())
            .field("path", &self.path)
            .finish()
    }
}
