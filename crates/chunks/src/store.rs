use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::Chunk;
use crate::chunker::chunk_text;
use crate::embedder::{EmbeddingError, EmbeddingProvider};

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("unknown chunk id: {chunk_id}")]
    NotFound { chunk_id: String },
    #[error("embedding dimension {got} does not match store dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// One nearest-neighbor hit from [`ChunkStore::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub doc_id: String,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f32,
}

/// In-memory vector index over document chunks: add, cosine search with
/// metadata filters, ordered context windows, per-document delete.
///
/// Embedding dimensionality is fixed by the first `add` and enforced after.
pub struct ChunkStore {
    embedder: Arc<dyn EmbeddingProvider>,
    target_chunk_tokens: usize,
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

impl ChunkStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, target_chunk_tokens: usize) -> Self {
        Self {
            embedder,
            target_chunk_tokens,
            chunks: Vec::new(),
            dimension: None,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == chunk_id)
    }

    /// Chunk, embed, and store a document. Returns the new chunk ids.
    pub async fn add(
        &mut self,
        text: &str,
        doc_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Vec<String>, ChunkError> {
        let mut new_chunks = chunk_text(text, doc_id, self.target_chunk_tokens);
        if new_chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = new_chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let indexed_at = unix_now();
        let mut ids = Vec::with_capacity(new_chunks.len());

        for (chunk, embedding) in new_chunks.iter_mut().zip(embeddings) {
            match self.dimension {
                Some(dim) if dim != embedding.len() => {
                    return Err(ChunkError::DimensionMismatch {
                        expected: dim,
                        got: embedding.len(),
                    });
                }
                None => self.dimension = Some(embedding.len()),
                _ => {}
            }

            chunk.embedding = embedding;
            chunk.metadata = metadata.clone();
            chunk
                .metadata
                .insert("doc_id".to_string(), serde_json::json!(chunk.doc_id));
            chunk
                .metadata
                .insert("chunk_index".to_string(), serde_json::json!(chunk.chunk_index));
            chunk
                .metadata
                .insert("token_count".to_string(), serde_json::json!(chunk.token_count));
            chunk
                .metadata
                .insert("indexed_at".to_string(), serde_json::json!(indexed_at));

            ids.push(chunk.id.clone());
        }

        debug!(doc_id, chunks = ids.len(), "document added to chunk store");
        self.chunks.append(&mut new_chunks);
        Ok(ids)
    }

    /// Nearest-neighbor search by cosine similarity, optionally restricted by
    /// exact-match metadata filters. Empty store returns an empty list.
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<Vec<SearchHit>, ChunkError> {
        if self.chunks.is_empty() || n_results == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut hits: Vec<SearchHit> = self
            .chunks
            .iter()
            .filter(|chunk| matches_filter(chunk, filter))
            .map(|chunk| SearchHit {
                id: chunk.id.clone(),
                doc_id: chunk.doc_id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                score: cosine_similarity(&query_embedding, &chunk.embedding),
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(n_results);
        Ok(hits)
    }

    /// Chunks of the same document whose index is within `window_size` of the
    /// given chunk, ordered by chunk index ascending.
    pub fn context_window(
        &self,
        chunk_id: &str,
        window_size: usize,
    ) -> Result<Vec<Chunk>, ChunkError> {
        let anchor = self.get(chunk_id).ok_or_else(|| ChunkError::NotFound {
            chunk_id: chunk_id.to_string(),
        })?;

        let low = anchor.chunk_index.saturating_sub(window_size);
        let high = anchor.chunk_index + window_size;
        let doc_id = anchor.doc_id.clone();

        let mut window: Vec<Chunk> = self
            .chunks
            .iter()
            .filter(|c| c.doc_id == doc_id && c.chunk_index >= low && c.chunk_index <= high)
            .cloned()
            .collect();
        window.sort_by_key(|c| c.chunk_index);
        Ok(window)
    }

    /// Remove all chunks for a document. Idempotent; returns the count removed.
    pub fn delete(&mut self, doc_id: &str) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| c.doc_id != doc_id);
        before - self.chunks.len()
    }

    /// Delete-then-add. Not atomic: a concurrent reader could observe the
    /// transient empty state between the two steps.
    pub async fn update(
        &mut self,
        text: &str,
        doc_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Vec<String>, ChunkError> {
        self.delete(doc_id);
        self.add(text, doc_id, metadata).await
    }

    /// Chunks whose text contains any of `terms`, case-insensitive, in
    /// insertion order. Used to attach supporting excerpts to paths.
    pub fn mentioning(&self, terms: &[&str], limit: usize) -> Vec<&Chunk> {
        let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        self.chunks
            .iter()
            .filter(|chunk| {
                let text = chunk.text.to_lowercase();
                lowered.iter().any(|t| !t.is_empty() && text.contains(t))
            })
            .take(limit)
            .collect()
    }
}

fn matches_filter(
    chunk: &Chunk,
    filter: Option<&HashMap<String, serde_json::Value>>,
) -> bool {
    match filter {
        None => true,
        Some(map) => map
            .iter()
            .all(|(key, expected)| chunk.metadata.get(key) == Some(expected)),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbedder;

    fn store() -> ChunkStore {
        ChunkStore::new(Arc::new(FakeEmbedder::new(64)), 200)
    }

    #[tokio::test]
    async fn round_trip_indexing() {
        let mut store = store();
        store
            .add(
                "Alice walked into the castle.\n\nThe guards watched her pass.",
                "doc-1",
                HashMap::new(),
            )
            .await
            .unwrap();

        let hits = store.search("Alice walked", 5, None).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].doc_id, "doc-1");
        assert!(hits[0].score > 0.3, "score was {}", hits[0].score);
    }

    #[tokio::test]
    async fn empty_store_search_returns_empty() {
        let store = store();
        let hits = store.search("anything", 5, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn metadata_filter_restricts_results() {
        let mut store = store();
        store.add("shared words here", "a", HashMap::new()).await.unwrap();
        store.add("shared words here", "b", HashMap::new()).await.unwrap();

        let mut filter = HashMap::new();
        filter.insert("doc_id".to_string(), serde_json::json!("b"));
        let hits = store.search("shared words", 10, Some(&filter)).await.unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.doc_id == "b"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let mut store = store();
        store.add("some text body", "doc-1", HashMap::new()).await.unwrap();

        assert_eq!(store.delete("doc-1"), 1);
        assert_eq!(store.delete("doc-1"), 0);

        let hits = store.search("some text", 5, None).await.unwrap();
        assert!(hits.iter().all(|h| h.doc_id != "doc-1"));
    }

    #[tokio::test]
    async fn context_window_is_ordered_and_scoped() {
        let mut store = ChunkStore::new(Arc::new(FakeEmbedder::new(64)), 25);
        let para = |i: usize| format!("{} paragraph number {i} with filler words", "word ".repeat(20));
        let text = (0..5).map(para).collect::<Vec<_>>().join("\n\n");
        let ids = store.add(&text, "doc-1", HashMap::new()).await.unwrap();
        assert!(ids.len() >= 3);

        let window = store.context_window(&ids[2], 1).unwrap();
        assert_eq!(window.len(), 3);
        assert!(window.windows(2).all(|w| w[0].chunk_index < w[1].chunk_index));

        let err = store.context_window("no-such-id", 1).unwrap_err();
        assert!(matches!(err, ChunkError::NotFound { .. }));
    }

    #[tokio::test]
    async fn mentioning_finds_substring_chunks() {
        let mut store = store();
        store
            .add("Alice spoke quietly.\n\nBob listened.", "doc-1", HashMap::new())
            .await
            .unwrap();
        let hits = store.mentioning(&["alice"], 3);
        assert_eq!(hits.len(), 1);
    }
}
