use tracing::{debug, info};

use extract::{Entity, Extraction, Extractor, Relationship, merge_entities, merge_relationships,
    overlap_chunks};

use crate::narrative::NarrativeGraph;

/// Runs extraction over overlapping chunks of a text and merges the noisy
/// per-chunk results before any graph is built.
///
/// The merge-then-build order matters: building a graph per chunk and
/// unioning graphs would double-count nodes carrying different attribute
/// snapshots.
#[derive(Clone)]
pub struct GraphAnalyzer {
    extractor: Extractor,
    chunk_size: usize,
}

impl GraphAnalyzer {
    pub fn new(extractor: Extractor, chunk_size: usize) -> Self {
        Self {
            extractor,
            chunk_size,
        }
    }

    /// Extract from every overlapping chunk and return the merged entity and
    /// relationship sets. Per-chunk failures contribute empty results and
    /// never abort the remaining chunks.
    pub async fn extract_merged(&self, text: &str) -> (Vec<Entity>, Vec<Relationship>) {
        let chunks = overlap_chunks(text, self.chunk_size);
        let total = chunks.len();

        let mut entity_batches = Vec::with_capacity(total);
        let mut relationship_batches = Vec::with_capacity(total);

        for (i, chunk) in chunks.iter().enumerate() {
            let Extraction {
                entities,
                relationships,
            } = self.extractor.extract(chunk).await;
            debug!(
                chunk = i + 1,
                total,
                entities = entities.len(),
                relationships = relationships.len(),
                "chunk extracted"
            );
            entity_batches.push(entities);
            relationship_batches.push(relationships);
        }

        let entities = merge_entities(entity_batches);
        let relationships = merge_relationships(relationship_batches);
        info!(
            entities = entities.len(),
            relationships = relationships.len(),
            "text analysis merged"
        );
        (entities, relationships)
    }

    /// Full analysis pipeline: overlap-chunk, extract, merge, build.
    pub async fn analyze_text(&self, text: &str) -> NarrativeGraph {
        let (entities, relationships) = self.extract_merged(text).await;
        NarrativeGraph::build(&entities, &relationships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::testing::{FailingExtractor, ScriptedExtractor};
    use std::sync::Arc;

    const ALICE_JSON: &str = r#"{"entities":[{"text":"Alice","type":"CHARACTER","start_pos":0,"end_pos":5,"confidence":0.9},{"text":"Bob","type":"CHARACTER","start_pos":10,"end_pos":13,"confidence":0.8}],"relationships":[{"source":"Alice","target":"Bob","type":"SPEAKS_TO","confidence":0.8,"context":"Alice spoke to Bob"}]}"#;

    #[tokio::test]
    async fn analysis_builds_graph_from_merged_extraction() {
        let extractor = Extractor::new(Arc::new(ScriptedExtractor::new(vec![ALICE_JSON])));
        let analyzer = GraphAnalyzer::new(extractor, 300);

        let graph = analyzer.analyze_text("Alice and Bob talked.").await;
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[tokio::test]
    async fn failing_extraction_yields_empty_graph() {
        let extractor = Extractor::new(Arc::new(FailingExtractor));
        let analyzer = GraphAnalyzer::new(extractor, 300);

        let graph = analyzer.analyze_text("Some long narrative text.").await;
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn duplicate_extractions_across_chunks_are_merged() {
        // Two chunks both reporting Alice must yield one node.
        let extractor = Extractor::new(Arc::new(ScriptedExtractor::new(vec![
            ALICE_JSON, ALICE_JSON,
        ])));
        let analyzer = GraphAnalyzer::new(extractor, 40);

        let long_text = "word ".repeat(100);
        let graph = analyzer.analyze_text(&long_text).await;
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }
}
