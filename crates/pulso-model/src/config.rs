use std::time::Duration;

use crate::catalog::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Everything the HTTP model client needs. Passed in explicitly so tests can
/// point it at a local endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// OpenAI-compatible base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    pub api_key: String,
    /// Model used when a request does not name one.
    pub default_model: String,
    pub temperature: f32,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            default_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ModelConfig {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let cfg = ModelConfig {
            base_url: "http://localhost:8080/v1/".into(),
            ..Default::default()
        };
        assert_eq!(cfg.completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(
            ModelConfig::default().completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }
}
