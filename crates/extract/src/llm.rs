use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure talking to the extraction LLM. Non-fatal to text analysis: the
/// caller degrades the affected chunk to an empty contribution.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Http(String),
    #[error("extraction request timed out after {0:?}")]
    Timeout(Duration),
    #[error("extraction response malformed: {0}")]
    BadResponse(String),
}

/// The injected extraction capability: prompt in, raw model text out. The
/// engine owns parsing and validation of the response, not the provider.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Ollama-compatible completion client used for entity extraction.
#[derive(Clone)]
pub struct OllamaExtractor {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaExtractor {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for OllamaExtractor {
    fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
            Duration::from_secs(60),
        )
    }
}

#[async_trait]
impl ExtractionProvider for OllamaExtractor {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(),
        };

        let send = self.client.post(&url).json(&request).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))?
            .map_err(|e| ExtractionError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExtractionError::Http(format!(
                "status {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::BadResponse(e.to_string()))?;

        Ok(parsed.response)
    }
}
