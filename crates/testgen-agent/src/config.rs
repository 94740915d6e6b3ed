use serde::Deserialize;
use std::time::Duration;

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    /// Base URL, e.g. `http://localhost:8080/v1`
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub endpoint: Endpoint,
    /// Per-request timeout for the model call.
    pub timeout: Duration,
    pub temperature: f32,
    /// Optional system message seeded into the chat history.
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint {
                url: std::env::var("TESTGEN_LLM_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/v1".into()),
                model: std::env::var("TESTGEN_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
                api_key: std::env::var("TESTGEN_LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            },
            timeout: Duration::from_secs(
                std::env::var("TESTGEN_LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            temperature: std::env::var("TESTGEN_LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.2),
            system_prompt: std::env::var("TESTGEN_SYSTEM_PROMPT").ok(),
        }
    }
}

impl AgentConfig {
    /// `<url>/chat/completions`, tolerating a trailing slash on the base URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.url.trim_end_matches('/'))
    }
}

/// Check if an inference endpoint is reachable (GET /models).
pub async fn check_endpoint(url: &str, api_key: Option<&str>) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    let mut request = reqwest::Client::new()
        .get(&models_url)
        .timeout(Duration::from_secs(5));
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: &str) -> AgentConfig {
        AgentConfig {
            endpoint: Endpoint {
                url: url.to_string(),
                model: "m".to_string(),
                api_key: None,
            },
            timeout: Duration::from_secs(1),
            temperature: 0.0,
            system_prompt: None,
        }
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            config_with_url("http://localhost:8080/v1").completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            config_with_url("http://localhost:8080/v1/").completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_false() {
        // port 9 (discard) is closed on test machines
        assert!(!check_endpoint("http://127.0.0.1:9/v1", None).await);
    }
}
