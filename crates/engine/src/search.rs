use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::indexer::HybridIndexer;

const MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Text,
    Graph,
    Hybrid,
}

impl SearchType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "text" => Self::Text,
            "graph" => Self::Graph,
            _ => Self::Hybrid,
        }
    }

    fn includes_text(self) -> bool {
        matches!(self, Self::Text | Self::Hybrid)
    }

    fn includes_graph(self) -> bool {
        matches!(self, Self::Graph | Self::Hybrid)
    }
}

/// One result from the unified search surface: either a raw chunk hit or a
/// rendered narrative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HybridHit {
    TextChunk {
        id: String,
        doc_id: String,
        text: String,
        score: f32,
    },
    NarrativePath {
        narrative: String,
        entities: Vec<String>,
        score: f32,
    },
}

impl HybridHit {
    pub fn score(&self) -> f32 {
        match self {
            Self::TextChunk { score, .. } | Self::NarrativePath { score, .. } => *score,
        }
    }
}

impl HybridIndexer {
    /// Union of vector-search chunk hits and narrative-path hits, sorted by
    /// score descending and capped at ten results.
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        filters: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<Vec<HybridHit>> {
        let mut results: Vec<HybridHit> = Vec::new();

        if search_type.includes_text() {
            let store = self.store.read().await;
            let hits = store
                .search(query, MAX_RESULTS, filters)
                .await
                .context("chunk search")?;
            results.extend(hits.into_iter().map(|h| HybridHit::TextChunk {
                id: h.id,
                doc_id: h.doc_id,
                text: h.text,
                score: h.score,
            }));
        }

        if search_type.includes_graph() {
            let store = self.store.read().await;
            let graph = self.graph.lock().await;
            let paths = self
                .retriever
                .retrieve_paths(&store, &graph, query, MAX_RESULTS)
                .await
                .context("path search")?;
            results.extend(paths.into_iter().map(|p| HybridHit::NarrativePath {
                narrative: p.narrative,
                entities: p.entities,
                score: p.score,
            }));
        }

        results.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(MAX_RESULTS);
        Ok(results)
    }
}
