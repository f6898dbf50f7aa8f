//! Graduated autonomy: impact-tiered policy for proposed changes.
//!
//! LOW-impact adjustments are applied automatically; MEDIUM and HIGH always
//! require a human decision. This partition is the system's core trust
//! boundary: irreversible or large changes never self-apply. An explicit
//! pre-set impact tag is trusted verbatim; otherwise free text is matched
//! against an ordered high-then-medium keyword set, defaulting to LOW.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Impact tier of a proposed adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

/// A proposed change to the user's plan or regimen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub description: String,
    /// Explicit pre-set impact; trusted verbatim when present.
    #[serde(default)]
    pub impact: Option<ImpactLevel>,
    /// Structured payload for the applier; opaque to classification.
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Checked high before medium; first hit wins.
const HIGH_IMPACT_KEYWORDS: &[&str] = &[
    "cancel", "remove", "delete", "skip", "stop", "rest week", "injury", "pain", "medical",
];

const MEDIUM_IMPACT_KEYWORDS: &[&str] = &[
    "increase", "decrease", "reduce", "extend", "add", "replace", "swap", "shift", "intensity",
    "volume",
];

/// Classify one adjustment. Explicit tag wins; then keywords; default LOW.
pub fn classify(adjustment: &Adjustment) -> ImpactLevel {
    if let Some(level) = adjustment.impact {
        return level;
    }
    let text = adjustment.description.to_lowercase();
    if HIGH_IMPACT_KEYWORDS.iter().any(|k| text.contains(k)) {
        ImpactLevel::High
    } else if MEDIUM_IMPACT_KEYWORDS.iter().any(|k| text.contains(k)) {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    }
}

/// An adjustment held for human confirmation, with its assigned tier.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedAdjustment {
    pub adjustment: Adjustment,
    pub level: ImpactLevel,
}

/// Per-level tallies for one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Result of partitioning a batch of adjustments.
#[derive(Debug, Clone, Serialize)]
pub struct AutonomyOutcome {
    /// LOW-impact adjustments, applied without confirmation.
    pub auto_applied: Vec<Adjustment>,
    /// MEDIUM and HIGH adjustments awaiting a human decision.
    pub proposals: Vec<ClassifiedAdjustment>,
    pub counts: LevelCounts,
}

impl AutonomyOutcome {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Partition adjustments into auto-applied vs. proposals requiring
/// confirmation.
pub fn classify_and_apply(adjustments: Vec<Adjustment>) -> AutonomyOutcome {
    let mut outcome = AutonomyOutcome {
        auto_applied: Vec::new(),
        proposals: Vec::new(),
        counts: LevelCounts::default(),
    };
    for adjustment in adjustments {
        let level = classify(&adjustment);
        match level {
            ImpactLevel::Low => {
                outcome.counts.low += 1;
                outcome.auto_applied.push(adjustment);
            }
            ImpactLevel::Medium => {
                outcome.counts.medium += 1;
                outcome.proposals.push(ClassifiedAdjustment { adjustment, level });
            }
            ImpactLevel::High => {
                outcome.counts.high += 1;
                outcome.proposals.push(ClassifiedAdjustment { adjustment, level });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjustment(description: &str, impact: Option<ImpactLevel>) -> Adjustment {
        Adjustment {
            description: description.into(),
            impact,
            payload: None,
        }
    }

    #[test]
    fn explicit_tag_wins_over_keywords() {
        // Text says "cancel" (high keyword) but the preset tag is low.
        let tagged = adjustment("cancel Thursday session", Some(ImpactLevel::Low));
        assert_eq!(classify(&tagged), ImpactLevel::Low);
    }

    #[test]
    fn high_keywords_checked_before_medium() {
        // Contains both "increase" (medium) and "injury" (high).
        let mixed = adjustment("increase rest due to knee injury", None);
        assert_eq!(classify(&mixed), ImpactLevel::High);
    }

    #[test]
    fn unmatched_text_defaults_to_low() {
        let plain = adjustment("note preferred warmup order", None);
        assert_eq!(classify(&plain), ImpactLevel::Low);
    }

    #[test]
    fn partition_counts_and_split() {
        let batch = vec![
            adjustment("tweak warmup", None),                       // low
            adjustment("increase weekly volume", None),             // medium
            adjustment("cancel long run this week", None),          // high
            adjustment("reorder stretches", None),                  // low
        ];
        let outcome = classify_and_apply(batch);
        assert_eq!(outcome.auto_applied.len(), 2);
        assert_eq!(outcome.proposals.len(), 2);
        assert_eq!(
            outcome.counts,
            LevelCounts {
                low: 2,
                medium: 1,
                high: 1
            }
        );
    }

    #[test]
    fn proposals_keep_their_levels() {
        let outcome = classify_and_apply(vec![
            adjustment("swap intervals for tempo", None),
            adjustment("stop all running this week", None),
        ]);
        let levels: Vec<ImpactLevel> = outcome.proposals.iter().map(|p| p.level).collect();
        assert_eq!(levels, vec![ImpactLevel::Medium, ImpactLevel::High]);
        assert!(outcome.auto_applied.is_empty());
    }
}
