use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure talking to the embedding capability. Fatal to the calling
/// `add`/`search` operation; the caller decides retry policy.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(String),
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding response malformed: {0}")]
    BadResponse(String),
}

/// The injected embedding capability: text in, fixed-dimension vector out.
///
/// Repeated calls on identical text must give near-identical vectors; exact
/// determinism is not required.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::BadResponse("empty batch result".to_string()))
    }
}

/// Ollama-compatible embedding client.
#[derive(Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let send = self.client.post(&url).json(&request).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))?
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Http(format!(
                "status {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::BadResponse(e.to_string()))?;

        Ok(parsed.embedding)
    }
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "nomic-embed-text".to_string(),
            Duration::from_secs(30),
        )
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    // The Ollama endpoint takes one prompt per call; batching is client-side.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}
