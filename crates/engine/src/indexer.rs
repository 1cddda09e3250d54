use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::info;

use chunks::{ChunkStore, EmbeddingProvider};
use extract::{ExtractionProvider, Extractor};
use graph::{GraphAnalyzer, NarrativeGraph};
use paths::{PathRetriever, RetrievedPath};

use crate::config::EngineConfig;
use crate::retry::RetryPolicy;

/// One document handed to [`HybridIndexer::index_folder`].
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub doc_id: String,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub processing_time_ms: u64,
    pub chunks_created: usize,
    pub entities_extracted: usize,
    pub relationships_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    pub documents_indexed: usize,
    pub chunks_created: usize,
    pub entities_extracted: usize,
    pub relationships_found: usize,
    pub processing_time_ms: u64,
}

/// Per-document bookkeeping kept for stats queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRecord {
    pub chunk_count: usize,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub indexed_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub documents: usize,
    pub chunks: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

/// Orchestrates one collection's document set: owns the chunk store and the
/// narrative graph, keeps them in sync per document, and exposes the
/// retrieval-backed operations built on top.
///
/// The graph sits behind a mutex: concurrent `index_folder` fan-out may
/// extract in parallel, but merges into the shared graph are serialized.
pub struct HybridIndexer {
    pub(crate) config: EngineConfig,
    pub(crate) store: RwLock<ChunkStore>,
    pub(crate) graph: Mutex<NarrativeGraph>,
    pub(crate) analyzer: GraphAnalyzer,
    pub(crate) extractor: Extractor,
    pub(crate) retriever: PathRetriever,
    pub(crate) docs: Mutex<HashMap<String, DocRecord>>,
    pub(crate) retry: RetryPolicy,
}

impl HybridIndexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        extraction: Arc<dyn ExtractionProvider>,
        config: EngineConfig,
    ) -> Self {
        let extractor = Extractor::new(extraction);
        let analyzer = GraphAnalyzer::new(extractor.clone(), config.analysis_chunk_tokens);
        let retriever = PathRetriever::new(config.retriever.clone());
        let retry = RetryPolicy::from_config(&config.retry);

        Self {
            store: RwLock::new(ChunkStore::new(embedder, config.chunk_target_tokens)),
            graph: Mutex::new(NarrativeGraph::new()),
            analyzer,
            extractor,
            retriever,
            docs: Mutex::new(HashMap::new()),
            retry,
            config,
        }
    }

    /// Index (or re-index) a single document: chunk + embed, extract the
    /// entity graph, retract the document's previous graph contribution, and
    /// merge the fresh one. Embedding failure aborts the operation;
    /// extraction failure degrades to an empty graph contribution.
    pub async fn index_document(
        &self,
        doc_id: &str,
        text: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<IndexStats> {
        let started = Instant::now();

        let chunk_ids = self
            .retry
            .run("index chunks", || {
                let store = &self.store;
                let metadata = metadata.clone();
                async move {
                    let mut guard = store.write().await;
                    guard.delete(doc_id);
                    guard.add(text, doc_id, metadata).await
                }
            })
            .await
            .with_context(|| format!("indexing chunks for document {doc_id}"))?;

        let (entities, relationships) = self.analyzer.extract_merged(text).await;

        {
            let mut graph = self.graph.lock().await;
            graph.remove_doc(doc_id);
            graph.merge(&entities, &relationships, Some(doc_id));
        }

        let stats = IndexStats {
            processing_time_ms: started.elapsed().as_millis() as u64,
            chunks_created: chunk_ids.len(),
            entities_extracted: entities.len(),
            relationships_found: relationships.len(),
        };

        self.docs.lock().await.insert(
            doc_id.to_string(),
            DocRecord {
                chunk_count: stats.chunks_created,
                entity_count: stats.entities_extracted,
                relationship_count: stats.relationships_found,
                indexed_at: unix_now(),
            },
        );

        info!(
            doc_id,
            chunks = stats.chunks_created,
            entities = stats.entities_extracted,
            relationships = stats.relationships_found,
            elapsed_ms = stats.processing_time_ms,
            "document indexed"
        );
        Ok(stats)
    }

    /// Index a batch of documents. Extraction fans out concurrently; chunk
    /// storage and graph merges run serialized afterwards so the dedupe maps
    /// never race.
    pub async fn index_folder(&self, documents: Vec<DocumentInput>) -> Result<BatchStats> {
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for doc in documents {
            let analyzer = self.analyzer.clone();
            tasks.spawn(async move {
                let (entities, relationships) = analyzer.extract_merged(&doc.text).await;
                (doc, entities, relationships)
            });
        }

        let mut extracted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            extracted.push(joined.map_err(|e| anyhow!("extraction task failed: {e}"))?);
        }

        let mut stats = BatchStats {
            documents_indexed: 0,
            chunks_created: 0,
            entities_extracted: 0,
            relationships_found: 0,
            processing_time_ms: 0,
        };

        for (doc, entities, relationships) in extracted {
            let chunk_ids = self
                .retry
                .run("index chunks", || {
                    let store = &self.store;
                    let doc = &doc;
                    async move {
                        let mut guard = store.write().await;
                        guard.delete(&doc.doc_id);
                        guard.add(&doc.text, &doc.doc_id, doc.metadata.clone()).await
                    }
                })
                .await
                .with_context(|| format!("indexing chunks for document {}", doc.doc_id))?;

            {
                let mut graph = self.graph.lock().await;
                graph.remove_doc(&doc.doc_id);
                graph.merge(&entities, &relationships, Some(&doc.doc_id));
            }

            self.docs.lock().await.insert(
                doc.doc_id.clone(),
                DocRecord {
                    chunk_count: chunk_ids.len(),
                    entity_count: entities.len(),
                    relationship_count: relationships.len(),
                    indexed_at: unix_now(),
                },
            );

            stats.documents_indexed += 1;
            stats.chunks_created += chunk_ids.len();
            stats.entities_extracted += entities.len();
            stats.relationships_found += relationships.len();
        }

        stats.processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            documents = stats.documents_indexed,
            chunks = stats.chunks_created,
            "folder indexed"
        );
        Ok(stats)
    }

    /// Relevance-ranked relational paths for a free-text query, most
    /// relevant last. Empty collection yields an empty list.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedPath>> {
        let store = self.store.read().await;
        let graph = self.graph.lock().await;
        self.retriever
            .retrieve_paths(&store, &graph, text, top_k)
            .await
            .context("path retrieval")
    }

    pub async fn stats(&self) -> EngineStats {
        let store = self.store.read().await;
        let graph = self.graph.lock().await;
        let docs = self.docs.lock().await;
        EngineStats {
            documents: docs.len(),
            chunks: store.len(),
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
        }
    }

    pub async fn document_record(&self, doc_id: &str) -> Option<DocRecord> {
        self.docs.lock().await.get(doc_id).cloned()
    }

    pub(crate) async fn is_collection_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
