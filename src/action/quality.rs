//! Deterministic, oracle-free quality scoring of executed actions.
//!
//! The score is advisory context surfaced to the next selection round; it
//! never forces a retry. Domain-specific correctness judgement belongs to
//! the evaluator-optimizer, not here.

use serde_json::Value;

use super::executor::ExecutionOutcome;
use super::ActionKind;

/// Retrieval quality saturates at this many returned items.
pub const RETRIEVAL_SATURATION: usize = 3;

/// Score an executed action's outcome, keyed by the action's kind.
///
/// Any error present scores 0.0 regardless of kind.
pub fn score(kind: ActionKind, outcome: &ExecutionOutcome) -> f32 {
    if outcome.is_error() {
        return 0.0;
    }
    let ExecutionOutcome::Completed(value) = outcome else {
        return 0.0;
    };

    match kind {
        ActionKind::Analysis => score_analysis(value),
        ActionKind::Generation => score_generation(value),
        ActionKind::Evaluation => score_evaluation(value),
        ActionKind::Retrieval => score_retrieval(value),
        ActionKind::Terminal => 1.0,
        ActionKind::Other => 0.5,
    }
}

/// 1.0 only when the result carries a non-empty core metric, at least one
/// observation, and a trend classification; otherwise 0.0.
fn score_analysis(value: &Value) -> f32 {
    let has_metric = value["metric"].as_str().is_some_and(|m| !m.is_empty());
    let has_observations = value["observations"]
        .as_array()
        .is_some_and(|o| !o.is_empty());
    let has_trend = value["trend"].as_str().is_some_and(|t| !t.is_empty());
    if has_metric && has_observations && has_trend {
        1.0
    } else {
        0.0
    }
}

/// 0.0 for zero generated units; partial credit when units lack structured
/// targets; 1.0 when every unit carries them.
fn score_generation(value: &Value) -> f32 {
    let Some(units) = value["units"].as_array() else {
        return 0.0;
    };
    if units.is_empty() {
        return 0.0;
    }
    let all_targeted = units.iter().all(|u| {
        u["targets"]
            .as_object()
            .is_some_and(|t| !t.is_empty())
    });
    if all_targeted {
        1.0
    } else {
        0.5
    }
}

/// Proportional mapping of the evaluation's own 0-100 score, capped at 1.0.
fn score_evaluation(value: &Value) -> f32 {
    value["score"]
        .as_f64()
        .map_or(0.0, |s| ((s / 100.0).clamp(0.0, 1.0)) as f32)
}

/// Scales with returned-item count, saturating at a small threshold.
fn score_retrieval(value: &Value) -> f32 {
    let count = value["items"].as_array().map_or(0, Vec::len);
    (count as f32 / RETRIEVAL_SATURATION as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed(value: Value) -> ExecutionOutcome {
        ExecutionOutcome::Completed(value)
    }

    #[test]
    fn error_scores_zero_for_every_kind() {
        let failed = ExecutionOutcome::Failed {
            message: "x".into(),
        };
        let embedded_error = completed(json!({"error": "x"}));
        for kind in [
            ActionKind::Analysis,
            ActionKind::Generation,
            ActionKind::Evaluation,
            ActionKind::Retrieval,
            ActionKind::Terminal,
            ActionKind::Other,
        ] {
            assert_eq!(score(kind, &failed), 0.0);
            assert_eq!(score(kind, &embedded_error), 0.0);
        }
    }

    #[test]
    fn analysis_requires_all_three_parts() {
        let full = completed(json!({
            "metric": "weekly_volume_km",
            "observations": ["volume up 12% over four weeks"],
            "trend": "improving"
        }));
        assert_eq!(score(ActionKind::Analysis, &full), 1.0);

        let no_trend = completed(json!({
            "metric": "weekly_volume_km",
            "observations": ["volume up"]
        }));
        assert_eq!(score(ActionKind::Analysis, &no_trend), 0.0);

        let empty_metric = completed(json!({
            "metric": "",
            "observations": ["x"],
            "trend": "steady"
        }));
        assert_eq!(score(ActionKind::Analysis, &empty_metric), 0.0);
    }

    #[test]
    fn generation_grades_by_units_and_targets() {
        assert_eq!(
            score(ActionKind::Generation, &completed(json!({"units": []}))),
            0.0
        );
        assert_eq!(score(ActionKind::Generation, &completed(json!({}))), 0.0);

        let untargeted = completed(json!({
            "units": [{"description": "easy run"}, {"description": "intervals"}]
        }));
        assert_eq!(score(ActionKind::Generation, &untargeted), 0.5);

        let targeted = completed(json!({
            "units": [
                {"description": "easy run", "targets": {"distance_km": 8}},
                {"description": "intervals", "targets": {"reps": 6, "pace": "5:00/km"}}
            ]
        }));
        assert_eq!(score(ActionKind::Generation, &targeted), 1.0);
    }

    #[test]
    fn evaluation_maps_own_score_proportionally() {
        assert_eq!(
            score(ActionKind::Evaluation, &completed(json!({"score": 78.0}))),
            0.78
        );
        assert_eq!(
            score(ActionKind::Evaluation, &completed(json!({"score": 150.0}))),
            1.0
        );
        assert_eq!(score(ActionKind::Evaluation, &completed(json!({}))), 0.0);
    }

    #[test]
    fn retrieval_saturates_at_threshold() {
        assert_eq!(
            score(ActionKind::Retrieval, &completed(json!({"items": []}))),
            0.0
        );
        let one = completed(json!({"items": ["a"]}));
        assert!((score(ActionKind::Retrieval, &one) - 1.0 / 3.0).abs() < 1e-6);
        let five = completed(json!({"items": ["a", "b", "c", "d", "e"]}));
        assert_eq!(score(ActionKind::Retrieval, &five), 1.0);
    }

    #[test]
    fn respond_always_scores_full() {
        assert_eq!(
            score(ActionKind::Terminal, &completed(json!({"status": "responded"}))),
            1.0
        );
    }
}
