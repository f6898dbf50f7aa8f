//! The persisted per-user belief document.
//!
//! One JSON document per user: profile fields, the full belief records, and
//! bookkeeping meta. The storage medium is deliberately opaque; this module
//! only defines the schema and file round-trip. Loading never mutates
//! in-memory state on failure, and records written before utility tracking
//! load with those fields defaulted in place (serde defaults on the belief
//! fields themselves).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::now_secs;
use crate::error::DocumentError;

use super::store::{Belief, BeliefStore};

/// Structured profile fields for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub goals: Vec<String>,
    pub notes: String,
}

/// Document bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub created_at: u64,
    pub updated_at: u64,
    /// Completed interaction cycles for this user.
    #[serde(default)]
    pub interactions: u64,
    /// Next belief id to allocate. Older documents omit this; the store
    /// recomputes it from the stored ids on load.
    #[serde(default)]
    pub next_belief_id: u64,
}

/// The persisted belief document for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub beliefs: Vec<Belief>,
    pub meta: DocumentMeta,
}

impl UserDocument {
    /// A fresh document for a new user.
    pub fn new() -> Self {
        let now = now_secs();
        Self {
            profile: Profile::default(),
            beliefs: Vec::new(),
            meta: DocumentMeta {
                created_at: now,
                updated_at: now,
                interactions: 0,
                next_belief_id: 1,
            },
        }
    }

    /// Load a document from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save the document as pretty-printed JSON, stamping `updated_at`.
    pub fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        self.meta.updated_at = now_secs();
        let content = serde_json::to_string_pretty(self).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Build the in-memory store from this document's records.
    pub fn to_store(&self) -> BeliefStore {
        BeliefStore::from_parts(self.beliefs.clone(), self.meta.next_belief_id)
    }

    /// Write the store's records back into this document.
    pub fn absorb_store(&mut self, store: &BeliefStore) {
        self.beliefs = store.beliefs().to_vec();
        self.meta.next_belief_id = self
            .beliefs
            .iter()
            .map(|b| b.id.0)
            .max()
            .unwrap_or(0)
            + 1;
    }
}

impl Default for UserDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A belief record as written before utility tracking existed.
    const LEGACY_BELIEF: &str = r#"{
        "id": 7,
        "text": "prefers morning runs",
        "category": "preference",
        "confidence": 0.8,
        "durability": "global",
        "source": "extraction",
        "first_observed": 1700000000,
        "last_confirmed": 1700000000,
        "valid_from": 1700000000,
        "active": true
    }"#;

    #[test]
    fn legacy_record_defaults_utility_fields_on_load() {
        let belief: Belief = serde_json::from_str(LEGACY_BELIEF).unwrap();
        assert_eq!(belief.utility, 0.0);
        assert_eq!(belief.outcome_count, 0);
        assert!(belief.last_outcome.is_none());
        assert!(belief.outcome_history.is_empty());
        assert_eq!(belief.stability, 0.5);
        assert!(belief.embedding.is_none());
        assert!(belief.superseded_by.is_none());
    }

    #[test]
    fn legacy_document_recovers_id_counter() {
        let doc_json = format!(
            r#"{{
                "beliefs": [{LEGACY_BELIEF}],
                "meta": {{"created_at": 1700000000, "updated_at": 1700000000}}
            }}"#
        );
        let doc: UserDocument = serde_json::from_str(&doc_json).unwrap();
        assert_eq!(doc.meta.next_belief_id, 0);
        let mut store = doc.to_store();
        let fresh = store.add(
            "new",
            crate::belief::store::BeliefCategory::Context,
            0.5,
            "t",
            None,
            crate::belief::store::Durability::Global,
        );
        assert_eq!(fresh.id.0, 8);
    }

    #[test]
    fn absorb_store_round_trips_records() {
        let mut doc = UserDocument::new();
        let mut store = doc.to_store();
        store.add(
            "prefers trails",
            crate::belief::store::BeliefCategory::Preference,
            0.7,
            "extraction",
            None,
            crate::belief::store::Durability::Global,
        );
        doc.absorb_store(&store);
        assert_eq!(doc.beliefs.len(), 1);
        assert_eq!(doc.meta.next_belief_id, 2);
        let rebuilt = doc.to_store();
        assert_eq!(rebuilt.active_count(), 1);
    }
}
