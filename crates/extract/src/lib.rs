//! LLM-backed entity and relationship extraction: prompt construction, a
//! provider capability trait, and tolerant two-stage response parsing.

pub mod llm;
pub mod merge;
pub mod parser;
pub mod prompt;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use llm::{ExtractionError, ExtractionProvider, OllamaExtractor};
pub use merge::{merge_entities, merge_relationships, overlap_chunks};
pub use parser::{ParseOutcome, ParseStrategy, parse_extraction};
pub use schema::{
    Entity, EntityType, Extraction, RelationType, Relationship, normalize_entity_text,
};

use std::sync::Arc;
use tracing::{debug, warn};

/// Best-effort extraction over the injected provider. Provider or parse
/// failures degrade to an empty [`Extraction`]; they never propagate.
#[derive(Clone)]
pub struct Extractor {
    provider: Arc<dyn ExtractionProvider>,
}

impl Extractor {
    pub fn new(provider: Arc<dyn ExtractionProvider>) -> Self {
        Self { provider }
    }

    pub async fn extract(&self, text: &str) -> Extraction {
        if text.trim().is_empty() {
            return Extraction::default();
        }

        let prompt = prompt::build_extraction_prompt(text);
        let raw = match self.provider.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "extraction call failed, treating as empty");
                return Extraction::default();
            }
        };

        let outcome = parse_extraction(&raw, text.len());
        match outcome.strategy {
            Some(strategy) => debug!(
                ?strategy,
                entities = outcome.extraction.entities.len(),
                relationships = outcome.extraction.relationships.len(),
                "extraction parsed"
            ),
            None => warn!("extraction response unparsable, treating as empty"),
        }
        outcome.extraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingExtractor, ScriptedExtractor};

    #[tokio::test]
    async fn provider_failure_degrades_to_empty() {
        let extractor = Extractor::new(Arc::new(FailingExtractor));
        let result = extractor.extract("Alice met Bob.").await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn scripted_response_is_parsed() {
        let script = r#"{"entities":[{"text":"Alice","type":"CHARACTER","start_pos":0,"end_pos":5,"confidence":0.9}],"relationships":[]}"#;
        let extractor = Extractor::new(Arc::new(ScriptedExtractor::new(vec![script])));
        let result = extractor.extract("Alice met Bob.").await;
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].normalized(), "alice");
    }

    #[tokio::test]
    async fn blank_text_skips_the_provider() {
        let provider = Arc::new(ScriptedExtractor::new(vec![]));
        let extractor = Extractor::new(provider.clone());
        let result = extractor.extract("   ").await;
        assert!(result.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
