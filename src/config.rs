//! Core configuration with TOML round-tripping.
//!
//! Every section is optional in the file; defaults carry the documented
//! constants. Loaded once at startup and passed by reference into the loop
//! and stores.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Cognitive loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Hard cap on action selections per cycle. Bounds a misbehaving
    /// selector, not a quality gate (default: 8).
    pub max_actions_per_cycle: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_actions_per_cycle: 8,
        }
    }
}

/// Evaluator-optimizer sub-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Plans scoring at or above this are acceptable (default: 70.0).
    pub acceptance_threshold: f32,
    /// Maximum generate→evaluate iterations before the best-effort plan
    /// is accepted as-is (default: 3).
    pub max_iterations: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 70.0,
            max_iterations: 3,
        }
    }
}

/// Similarity retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// How many ranked beliefs a similarity query returns (default: 5).
    pub top_k: usize,
    /// Below this many active beliefs, retrieval short-circuits and returns
    /// the whole active set. Embedding search is unreliable on sparse data
    /// (default: 10).
    pub sparse_floor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            sparse_floor: 10,
        }
    }
}

/// Pruning sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Beliefs below this confidence are prune candidates (default: 0.25).
    pub confidence_floor: f32,
    /// A low-confidence belief must also be unconfirmed for longer than this
    /// window before it is archived (default: 90 days).
    pub max_age_secs: u64,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.25,
            max_age_secs: 90 * 24 * 60 * 60,
        }
    }
}

/// Pending-proposal outbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Pending proposals older than this expire unanswered (default: 7 days).
    pub ttl_secs: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Top-level configuration for the decision core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cycle: CycleConfig,
    pub optimizer: OptimizerConfig,
    pub retrieval: RetrievalConfig,
    pub prune: PruneConfig,
    pub outbox: OutboxConfig,
}

impl CoreConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_documented_constants() {
        let config = CoreConfig::default();
        assert_eq!(config.cycle.max_actions_per_cycle, 8);
        assert_eq!(config.optimizer.acceptance_threshold, 70.0);
        assert_eq!(config.optimizer.max_iterations, 3);
        assert_eq!(config.retrieval.sparse_floor, 10);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [cycle]
            max_actions_per_cycle = 4

            [optimizer]
            acceptance_threshold = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.cycle.max_actions_per_cycle, 4);
        assert_eq!(config.optimizer.acceptance_threshold, 60.0);
        assert_eq!(config.optimizer.max_iterations, 3);
        assert_eq!(config.retrieval.sparse_floor, 10);
    }

    #[test]
    fn toml_round_trip() {
        let config = CoreConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = CoreConfig::from_toml_str(&text).unwrap();
        assert_eq!(
            back.cycle.max_actions_per_cycle,
            config.cycle.max_actions_per_cycle
        );
        assert_eq!(back.prune.max_age_secs, config.prune.max_age_secs);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config.cycle.max_actions_per_cycle, 8);
        assert_eq!(config.outbox.ttl_secs, 7 * 24 * 60 * 60);
    }
}
