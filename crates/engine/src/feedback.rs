use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use extract::EntityType;
use paths::{ContextType, RetrievedPath};

use crate::indexer::HybridIndexer;

/// Context assembled around a highlighted span of text: nearby passages,
/// the entities the span mentions, narrative paths touching them, and
/// simple rule-based suggestions.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Feedback {
    /// Set when the operation could not run at all (empty collection,
    /// collaborator offline). Callers treat this as a normal state.
    pub error: Option<String>,
    pub semantic_context: Vec<ContextPassage>,
    pub entities_mentioned: Vec<MentionedEntity>,
    pub narrative_paths: Vec<RetrievedPath>,
    pub suggestions: Vec<String>,
    pub character_contexts: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextPassage {
    pub chunk_id: String,
    pub text: String,
    /// Similarity to the highlighted span; 0 for passages pulled in only by
    /// the surrounding context window.
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MentionedEntity {
    pub text: String,
    pub entity_type: EntityType,
    pub confidence: f32,
}

impl Feedback {
    pub fn empty_collection() -> Self {
        Self {
            error: Some("no documents indexed yet".to_string()),
            ..Default::default()
        }
    }

    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Default::default()
        }
    }
}

impl HybridIndexer {
    /// Feedback for a highlighted span within one document. Never errors:
    /// an empty collection or a failed collaborator comes back as a
    /// structured `error` field.
    pub async fn contextual_feedback(
        &self,
        highlighted: &str,
        doc_id: &str,
        context_window: usize,
    ) -> Feedback {
        if self.is_collection_empty().await {
            return Feedback::empty_collection();
        }

        let store = self.store.read().await;

        let mut filter = HashMap::new();
        filter.insert("doc_id".to_string(), serde_json::json!(doc_id));
        let hits = match store.search(highlighted, 5, Some(&filter)).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "semantic context search failed");
                return Feedback::failed(format!("context search failed: {e}"));
            }
        };

        let mut semantic_context: Vec<ContextPassage> = hits
            .iter()
            .map(|h| ContextPassage {
                chunk_id: h.id.clone(),
                text: h.text.clone(),
                score: h.score,
            })
            .collect();

        // Pull the window around the best hit so the span's neighborhood is
        // present even when similarity missed it.
        if let Some(best) = hits.first() {
            if let Ok(window) = store.context_window(&best.id, context_window) {
                for chunk in window {
                    if !semantic_context.iter().any(|p| p.chunk_id == chunk.id) {
                        semantic_context.push(ContextPassage {
                            chunk_id: chunk.id,
                            text: chunk.text,
                            score: 0.0,
                        });
                    }
                }
            }
        }

        let extraction = self.extractor.extract(highlighted).await;
        let entities_mentioned: Vec<MentionedEntity> = extraction
            .entities
            .iter()
            .map(|e| MentionedEntity {
                text: e.text.clone(),
                entity_type: e.entity_type,
                confidence: e.confidence,
            })
            .collect();

        let graph = self.graph.lock().await;
        let narrative_paths = self
            .retriever
            .retrieve_paths(&store, &graph, highlighted, 3)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "narrative path lookup failed");
                Vec::new()
            });

        let characters: Vec<String> = entities_mentioned
            .iter()
            .filter(|e| e.entity_type == EntityType::Character)
            .map(|e| e.text.clone())
            .collect();

        let mut character_contexts = HashMap::new();
        for name in &characters {
            let narratives: Vec<String> = self
                .retriever
                .character_context_paths(&store, &graph, name, ContextType::All)
                .into_iter()
                .map(|p| p.narrative)
                .collect();
            if !narratives.is_empty() {
                character_contexts.insert(name.clone(), narratives);
            }
        }

        let suggestions = derive_suggestions(&entities_mentioned, &characters);

        Feedback {
            error: None,
            semantic_context,
            entities_mentioned,
            narrative_paths,
            suggestions,
            character_contexts,
        }
    }
}

fn derive_suggestions(entities: &[MentionedEntity], characters: &[String]) -> Vec<String> {
    let mut suggestions = Vec::new();

    if !characters.is_empty() {
        suggestions.push(format!(
            "Consider the established traits of {}",
            characters.join(", ")
        ));
    }

    let locations: Vec<&str> = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Location)
        .map(|e| e.text.as_str())
        .collect();
    if !locations.is_empty() {
        suggestions.push(format!(
            "Keep details of {} consistent with earlier scenes",
            locations.join(", ")
        ));
    }

    let events: Vec<&str> = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Event)
        .map(|e| e.text.as_str())
        .collect();
    if !events.is_empty() {
        suggestions.push(format!(
            "Connect {} to its causes or consequences",
            events.join(", ")
        ));
    }

    if suggestions.is_empty() {
        suggestions.push("No indexed entities matched this passage; consider grounding it in established characters or places".to_string());
    }
    suggestions
}
