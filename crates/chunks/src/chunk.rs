use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A bounded segment of document text, embedded and stored by [`crate::ChunkStore`].
///
/// Chunks are immutable once created: re-indexing a document deletes its old
/// chunks and inserts fresh ones rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub doc_id: String,
    /// Sequence position within the document, contiguous from 0.
    pub chunk_index: usize,
    pub token_count: usize,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    pub fn new(doc_id: String, chunk_index: usize, text: String) -> Self {
        let token_count = count_tokens(&text);
        let id = Self::generate_id(&doc_id, chunk_index);
        Self {
            id,
            text,
            doc_id,
            chunk_index,
            token_count,
            embedding: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Deterministic id from document id and sequence position.
    fn generate_id(doc_id: &str, chunk_index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(chunk_index.to_string().as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..16])
    }
}

/// Whitespace-delimited word count, a cheap token proxy.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = Chunk::new("doc-1".to_string(), 0, "some text".to_string());
        let b = Chunk::new("doc-1".to_string(), 0, "different text".to_string());
        assert_eq!(a.id, b.id, "id depends only on doc_id and index");

        let c = Chunk::new("doc-1".to_string(), 1, "some text".to_string());
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn token_count_is_word_count() {
        let chunk = Chunk::new("d".to_string(), 0, "one two  three\nfour".to_string());
        assert_eq!(chunk.token_count, 4);
    }
}
