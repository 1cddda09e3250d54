//! Chunk storage for the hybrid retrieval engine: paragraph-preserving
//! chunking, embeddings via an injected provider, and an in-memory cosine
//! similarity index with metadata filtering.

pub mod chunk;
pub mod chunker;
pub mod embedder;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chunk::Chunk;
pub use chunker::chunk_text;
pub use embedder::{EmbeddingError, EmbeddingProvider, OllamaEmbedder};
pub use store::{ChunkError, ChunkStore, SearchHit, cosine_similarity};
