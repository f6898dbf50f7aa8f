//! Ollama-backed oracle implementation.
//!
//! Implements both collaborator contracts over the local Ollama REST API:
//! [`ReasoningOracle`] via `/api/generate` with JSON-constrained prompts,
//! [`EmbeddingOracle`] via `/api/embeddings`. Everything blocks; timeouts
//! are per-request. Responses that do not contain the expected JSON map to
//! [`OracleError::Malformed`], which every call site recovers from.

use serde::Deserialize;

use crate::belief::store::BeliefId;
use crate::error::OracleError;

use super::{
    EmbeddingOracle, EvaluationRequest, EvaluationScores, GeneratedContent, GenerationRequest,
    MergeDecision, MergeRequest, ReasoningOracle, SelectionDecision, SelectionRequest,
    EVALUATION_CRITERIA,
};

/// Configuration for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model used for reasoning calls.
    pub model: String,
    /// Model used for embedding calls.
    pub embed_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            embed_model: "nomic-embed-text".into(),
            timeout_secs: 120,
        }
    }
}

/// Client for the Ollama REST API implementing both oracle contracts.
pub struct OllamaOracle {
    config: OllamaConfig,
    available: bool,
}

impl OllamaOracle {
    /// Create a new client with the given configuration.
    ///
    /// Call [`probe`](Self::probe) before use; until then every call reports
    /// [`OracleError::Unavailable`].
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            config,
            available: false,
        }
    }

    /// Probe the server with a lightweight `/api/tags` request.
    pub fn probe(&mut self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();
        self.available = matches!(agent.get(&url).call(), Ok(resp) if resp.status() == 200);
        self.available
    }

    /// Whether the server answered the last probe.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Generate a completion from a prompt.
    fn generate(&self, prompt: &str, system: &str) -> Result<String, OracleError> {
        if !self.available {
            return Err(OracleError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }

        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "system": system,
            "stream": false,
        });
        let body_str = serde_json::to_string(&body).map_err(|e| OracleError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| OracleError::Request {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| OracleError::Malformed {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| OracleError::Malformed {
                message: e.to_string(),
            })?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| OracleError::Malformed {
                message: "missing 'response' field".into(),
            })
    }

    /// Generate and parse the first JSON object found in the response.
    fn generate_json<T: for<'de> Deserialize<'de>>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, OracleError> {
        let response = self.generate(prompt, system)?;
        let json_str = extract_json_object(&response).ok_or_else(|| OracleError::Malformed {
            message: "no JSON object found in response".into(),
        })?;
        serde_json::from_str(json_str).map_err(|e| OracleError::Malformed {
            message: format!("JSON parse error: {e}"),
        })
    }
}

/// Find the outermost JSON object in free-form model output.
fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

impl ReasoningOracle for OllamaOracle {
    fn select_action(&self, request: &SelectionRequest) -> Result<SelectionDecision, OracleError> {
        let system = "You are the action selector of a coaching agent. \
            Given the action catalog, the current cycle context, and the actions already \
            taken, choose the single best next action. \
            Reply with one JSON object: {\"action\": name, \"reasoning\": why}. \
            Choose \"respond\" when nothing further is needed. Only return the JSON object.";
        let prompt = serde_json::to_string(request).map_err(|e| OracleError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;
        self.generate_json(&prompt, system)
    }

    fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, OracleError> {
        let system = "You are a personal coach drafting a weekly plan. \
            Use the context summary, and address the evaluator feedback if any is given. \
            Reply with one JSON object: {\"units\": [{\"description\": str, \
            \"targets\": {name: value, ...}}, ...], \"notes\": str}. \
            Every unit should carry concrete targets. Only return the JSON object.";
        let prompt = serde_json::to_string(request).map_err(|e| OracleError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;
        self.generate_json(&prompt, system)
    }

    fn evaluate_content(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationScores, OracleError> {
        let system = format!(
            "You are a critical reviewer of coaching plans. Score the given content. \
             Reply with one JSON object: {{\"overall_score\": 0-100, \
             \"criteria\": {{{}}}, \"issues\": [str], \"suggestions\": [str]}} \
             where every criterion is scored 0-100. Only return the JSON object.",
            EVALUATION_CRITERIA
                .iter()
                .map(|c| format!("\"{c}\": 0-100"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let prompt = serde_json::to_string(request).map_err(|e| OracleError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;
        self.generate_json(&prompt, &system)
    }

    fn resolve_merge(&self, request: &MergeRequest) -> Result<MergeDecision, OracleError> {
        let system = "You reconcile a new statement about a user against similar stored \
            beliefs. Reply with one JSON object: {\"operation\": \"ADD\"|\"UPDATE\"|\"DELETE\"|\"NOOP\", \
            \"target_id\": number or null, \"new_text\": string or null, \
            \"new_confidence\": number or null}. \
            ADD stores the statement as new; UPDATE revises the target in place; \
            DELETE replaces the target with the statement; NOOP changes nothing. \
            Only return the JSON object.";
        let prompt = serde_json::to_string(request).map_err(|e| OracleError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;

        #[derive(Deserialize)]
        struct RawMerge {
            operation: String,
            #[serde(default)]
            target_id: Option<u64>,
            #[serde(default)]
            new_text: Option<String>,
            #[serde(default)]
            new_confidence: Option<f32>,
        }

        let raw: RawMerge = self.generate_json(&prompt, system)?;
        let operation = raw.operation.to_ascii_uppercase();
        let target = raw.target_id.map(BeliefId);
        let missing_target = || OracleError::Malformed {
            message: format!("operation {operation} without target_id"),
        };
        match operation.as_str() {
            "ADD" => Ok(MergeDecision::Add),
            "UPDATE" => Ok(MergeDecision::Update {
                target: target.ok_or_else(missing_target)?,
                new_text: raw.new_text,
                new_confidence: raw.new_confidence,
            }),
            "DELETE" => Ok(MergeDecision::Delete {
                target: target.ok_or_else(missing_target)?,
            }),
            "NOOP" => Ok(MergeDecision::Noop),
            other => Err(OracleError::Malformed {
                message: format!("unknown merge operation \"{other}\""),
            }),
        }
    }
}

impl EmbeddingOracle for OllamaOracle {
    fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        if !self.available {
            return Err(OracleError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }

        let url = format!("{}/api/embeddings", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.embed_model,
            "prompt": text,
        });
        let body_str = serde_json::to_string(&body).map_err(|e| OracleError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| OracleError::Request {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| OracleError::Malformed {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| OracleError::Malformed {
                message: e.to_string(),
            })?;

        let vector: Vec<f32> = json["embedding"]
            .as_array()
            .ok_or_else(|| OracleError::Malformed {
                message: "missing 'embedding' field".into(),
            })?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.is_empty() {
            return Err(OracleError::Malformed {
                message: "empty embedding vector".into(),
            });
        }
        Ok(vector)
    }
}

impl std::fmt::Debug for OllamaOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaOracle")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("available", &self.available)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_unreachable_returns_false() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".into(), // unreachable port
            ..Default::default()
        };
        let mut oracle = OllamaOracle::new(config);
        assert!(!oracle.probe());
        assert!(!oracle.is_available());
    }

    #[test]
    fn calls_before_probe_report_unavailable() {
        let oracle = OllamaOracle::new(OllamaConfig::default());
        let request = GenerationRequest {
            context_summary: "test".into(),
            feedback: None,
        };
        assert!(matches!(
            oracle.generate_content(&request),
            Err(OracleError::Unavailable { .. })
        ));
        assert!(matches!(
            oracle.embed("hello"),
            Err(OracleError::Unavailable { .. })
        ));
    }

    #[test]
    fn extract_json_object_from_prose() {
        let text = "Here is my answer:\n{\"action\": \"respond\", \"reasoning\": \"done\"}\nThanks!";
        let json = extract_json_object(text).unwrap();
        let decision: SelectionDecision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.action, "respond");
    }

    #[test]
    fn extract_json_object_none_when_absent() {
        assert!(extract_json_object("no json here").is_none());
    }
}
