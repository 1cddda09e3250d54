use serde::{Deserialize, Serialize};

use paths::RetrieverConfig;

/// Tunables for one [`crate::HybridIndexer`] instance. Collaborator timeouts
/// live on the providers themselves; this covers the engine's own policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Token budget per stored chunk.
    pub chunk_target_tokens: usize,
    /// Window size for the overlapping extraction chunks.
    pub analysis_chunk_tokens: usize,
    #[serde(skip)]
    pub retriever: RetrieverConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_target_tokens: 400,
            analysis_chunk_tokens: 300,
            retriever: RetrieverConfig::default(),
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 500,
                max_backoff_ms: 8000,
            },
        }
    }
}
