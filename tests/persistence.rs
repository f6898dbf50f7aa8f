//! Persistence tests: user document round-trips, backward-compatible loads,
//! and archive log durability.

use serde_json::json;

use phronesis::agent::Agent;
use phronesis::belief::{ArchiveLog, BeliefCategory, Durability, UserDocument};
use phronesis::config::CoreConfig;
use phronesis::error::OracleError;
use phronesis::oracle::{
    EmbeddingOracle, EvaluationRequest, EvaluationScores, GeneratedContent, GenerationRequest,
    MergeDecision, MergeRequest, ReasoningOracle, SelectionDecision, SelectionRequest,
};

struct OfflineOracle;
impl ReasoningOracle for OfflineOracle {
    fn select_action(&self, _: &SelectionRequest) -> Result<SelectionDecision, OracleError> {
        Err(OracleError::Unavailable { url: "offline".into() })
    }
    fn generate_content(&self, _: &GenerationRequest) -> Result<GeneratedContent, OracleError> {
        Err(OracleError::Unavailable { url: "offline".into() })
    }
    fn evaluate_content(&self, _: &EvaluationRequest) -> Result<EvaluationScores, OracleError> {
        Err(OracleError::Unavailable { url: "offline".into() })
    }
    fn resolve_merge(&self, _: &MergeRequest) -> Result<MergeDecision, OracleError> {
        Err(OracleError::Unavailable { url: "offline".into() })
    }
}
impl EmbeddingOracle for OfflineOracle {
    fn embed(&self, _: &str) -> Result<Vec<f32>, OracleError> {
        Err(OracleError::Unavailable { url: "offline".into() })
    }
}

fn offline_agent() -> Agent {
    Agent::new(
        CoreConfig::default(),
        Box::new(OfflineOracle),
        Box::new(OfflineOracle),
    )
}

#[test]
fn document_round_trip_preserves_beliefs_and_meta() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("user.json");

    let mut agent = offline_agent();
    agent.profile_mut().name = "casey".into();
    agent.profile_mut().goals.push("run a sub-50 10k".into());
    let stored = agent.beliefs_mut().add(
        "prefers morning runs",
        BeliefCategory::Preference,
        0.8,
        "extraction",
        Some("conversation:12"),
        Durability::Global,
    );
    agent.run_cycle(Default::default()); // bumps the interaction counter

    let mut document = agent.to_document();
    document.save(&path).unwrap();

    let loaded = UserDocument::load(&path).unwrap();
    assert_eq!(loaded.profile.name, "casey");
    assert_eq!(loaded.meta.interactions, 1);
    assert_eq!(loaded.beliefs.len(), 1);
    assert_eq!(loaded.beliefs[0].id, stored.id);
    assert_eq!(loaded.beliefs[0].source_ref.as_deref(), Some("conversation:12"));

    let restored = Agent::from_document(
        CoreConfig::default(),
        &loaded,
        Box::new(OfflineOracle),
        Box::new(OfflineOracle),
    );
    assert_eq!(restored.interactions(), 1);
    assert_eq!(restored.beliefs().active_count(), 1);
    assert_eq!(restored.profile().goals, vec!["run a sub-50 10k".to_string()]);
}

#[test]
fn pre_utility_document_loads_with_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("legacy.json");

    // A document written before utility tracking: no utility, outcome_count,
    // last_outcome, outcome_history, stability, or next_belief_id fields.
    let legacy = json!({
        "profile": {"name": "casey"},
        "beliefs": [{
            "id": 3,
            "text": "tends to overtrain when stressed",
            "category": "training",
            "confidence": 0.6,
            "durability": "global",
            "source": "reflection",
            "first_observed": 1690000000,
            "last_confirmed": 1690000000,
            "valid_from": 1690000000,
            "active": true
        }],
        "meta": {"created_at": 1690000000, "updated_at": 1690000000}
    });
    std::fs::write(&path, serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let document = UserDocument::load(&path).unwrap();
    let belief = &document.beliefs[0];
    assert_eq!(belief.utility, 0.0);
    assert_eq!(belief.outcome_count, 0);
    assert!(belief.last_outcome.is_none());
    assert!(belief.outcome_history.is_empty());

    // The id counter recovers from the stored ids.
    let mut store = document.to_store();
    let fresh = store.add(
        "new observation",
        BeliefCategory::Context,
        0.5,
        "extraction",
        None,
        Durability::Global,
    );
    assert_eq!(fresh.id.0, 4);
}

#[test]
fn load_failure_leaves_no_partial_state() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("corrupt.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(UserDocument::load(&path).is_err());

    let missing = dir.path().join("missing.json");
    assert!(UserDocument::load(&missing).is_err());
}

#[test]
fn archive_log_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("archive.jsonl");

    let mut agent = offline_agent();
    agent.set_archive(ArchiveLog::with_path(path.clone()));
    agent.beliefs_mut().add(
        "scratch",
        BeliefCategory::Context,
        0.9,
        "cycle",
        None,
        Durability::Session,
    );
    let report = agent.end_session();
    assert_eq!(report.session_archived, 1);

    // A later process reopens the same log and sees the entry.
    let reopened = ArchiveLog::with_path(path);
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.entries()[0].text, "scratch");
    assert!(reopened.entries()[0].embedding.is_none());
}

#[test]
fn config_round_trips_through_toml_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("phronesis.toml");

    let mut config = CoreConfig::default();
    config.cycle.max_actions_per_cycle = 5;
    config.optimizer.acceptance_threshold = 65.0;
    config.save(&path).unwrap();

    let loaded = CoreConfig::load(&path).unwrap();
    assert_eq!(loaded.cycle.max_actions_per_cycle, 5);
    assert_eq!(loaded.optimizer.acceptance_threshold, 65.0);
    assert_eq!(loaded.optimizer.max_iterations, 3);
}
