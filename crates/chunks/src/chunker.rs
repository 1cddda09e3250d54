use crate::chunk::{Chunk, count_tokens};

/// Split `text` on blank-line paragraph boundaries and pack paragraphs into
/// chunks whose token count stays at or under `target_size`.
///
/// Paragraphs are never split mid-way: a single paragraph larger than the
/// budget becomes its own oversized chunk. Whitespace-only input yields no
/// chunks. Chunk indices are contiguous from 0.
pub fn chunk_text(text: &str, doc_id: &str, target_size: usize) -> Vec<Chunk> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for para in paragraphs {
        let para_tokens = count_tokens(para);
        let buffer_tokens = count_tokens(&buffer);

        if !buffer.is_empty() && buffer_tokens + para_tokens > target_size {
            chunks.push(Chunk::new(doc_id.to_string(), chunks.len(), buffer.clone()));
            buffer.clear();
        }

        if !buffer.is_empty() {
            buffer.push_str("\n\n");
        }
        buffer.push_str(para);
    }

    if !buffer.is_empty() {
        chunks.push(Chunk::new(doc_id.to_string(), chunks.len(), buffer));
    }

    chunks
}
