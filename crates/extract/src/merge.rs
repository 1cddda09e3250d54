use std::collections::HashMap;

use crate::schema::{Entity, RelationType, Relationship, normalize_entity_text};

/// Split `text` into word-windowed chunks of roughly `chunk_size` tokens with
/// ~25% overlap, so relationships spanning a boundary appear whole in at
/// least one chunk. Text at or under the budget comes back as one chunk.
pub fn overlap_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if chunk_size == 0 || words.len() <= chunk_size {
        return vec![words.join(" ")];
    }

    let step = (chunk_size - chunk_size / 4).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Dedupe entities on normalized text, keeping the highest-confidence
/// instance. First-seen order is preserved.
pub fn merge_entities(batches: impl IntoIterator<Item = Vec<Entity>>) -> Vec<Entity> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, Entity> = HashMap::new();

    for batch in batches {
        for entity in batch {
            let key = entity.normalized();
            match best.get(&key) {
                Some(existing) if existing.confidence >= entity.confidence => {}
                Some(_) => {
                    best.insert(key, entity);
                }
                None => {
                    order.push(key.clone());
                    best.insert(key, entity);
                }
            }
        }
    }

    order.into_iter().filter_map(|k| best.remove(&k)).collect()
}

/// Dedupe relationships on (source, target, type) with normalized endpoint
/// text, keeping the highest-confidence instance.
pub fn merge_relationships(
    batches: impl IntoIterator<Item = Vec<Relationship>>,
) -> Vec<Relationship> {
    let mut order: Vec<(String, String, RelationType)> = Vec::new();
    let mut best: HashMap<(String, String, RelationType), Relationship> = HashMap::new();

    for batch in batches {
        for rel in batch {
            let key = (
                normalize_entity_text(&rel.source),
                normalize_entity_text(&rel.target),
                rel.relation_type.clone(),
            );
            match best.get(&key) {
                Some(existing) if existing.confidence >= rel.confidence => {}
                Some(_) => {
                    best.insert(key, rel);
                }
                None => {
                    order.push(key.clone());
                    best.insert(key, rel);
                }
            }
        }
    }

    order.into_iter().filter_map(|k| best.remove(&k)).collect()
}
