use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use chunks::{ChunkError, ChunkStore};
use extract::{EntityType, RelationType};
use graph::{EdgeData, NarrativeGraph, NodeData};

use crate::render::{render_narrative, supporting_texts};
use crate::scoring::{prune_redundant, query_terms, relevance_score, structural_score};

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Seed nodes gathered from vector-search hits.
    pub seed_count: usize,
    /// Maximum hops per path.
    pub max_path_length: usize,
    /// Candidate paths enumerated per seed before pruning.
    pub max_paths_per_node: usize,
    /// Exponential length penalty base for structural scoring.
    pub distance_decay: f32,
    /// Paths surviving redundancy elimination.
    pub max_pruned_paths: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            seed_count: 5,
            max_path_length: 4,
            max_paths_per_node: 10,
            distance_decay: 0.8,
            max_pruned_paths: 20,
        }
    }
}

/// One relevance-ranked relational path, rendered for prompt construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPath {
    /// Normalized node keys in traversal order; acyclic by construction.
    pub nodes: Vec<String>,
    pub score: f32,
    pub narrative: String,
    /// Display names of the nodes on the path.
    pub entities: Vec<String>,
    /// Relation type names traversed, in order.
    pub relationships: Vec<String>,
    pub supporting_texts: Vec<String>,
}

/// Node/edge allow-list for the constrained character traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    Relationships,
    Events,
    Locations,
    All,
}

impl ContextType {
    /// Lenient parse; anything unrecognized means unconstrained.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "relationships" => Self::Relationships,
            "events" => Self::Events,
            "locations" => Self::Locations,
            _ => Self::All,
        }
    }

    fn allows(&self, edge: &EdgeData, target: &NodeData) -> bool {
        let relation = edge.relation_type.as_str();
        match self {
            Self::All => true,
            Self::Relationships => {
                target.entity_type == EntityType::Character
                    && matches!(
                        relation,
                        RelationType::SPEAKS_TO | RelationType::FEELS_ABOUT | RelationType::MEETS
                    )
            }
            Self::Events => {
                target.entity_type == EntityType::Event
                    && matches!(
                        relation,
                        RelationType::CAUSES
                            | RelationType::PARTICIPATES_IN
                            | RelationType::WITNESSES
                    )
            }
            Self::Locations => {
                target.entity_type == EntityType::Location
                    && matches!(
                        relation,
                        RelationType::GOES_TO | RelationType::LIVES_IN | RelationType::VISITS
                    )
            }
        }
    }
}

const CHARACTER_MAX_DEPTH: usize = 3;
const CHARACTER_MAX_PATHS: usize = 10;

/// Finds relational paths in the narrative graph: vector-search seeds,
/// bounded breadth-first enumeration, redundancy pruning, multi-factor
/// relevance scoring, and narrative rendering.
///
/// Holds no graph or store state; callers pass the current graph snapshot,
/// so a rebuilt graph is picked up on the next call.
#[derive(Debug, Clone, Default)]
pub struct PathRetriever {
    config: RetrieverConfig,
}

impl PathRetriever {
    pub fn new(config: RetrieverConfig) -> Self {
        Self { config }
    }

    /// Top-k relational paths for a free-text query. Empty graph or zero
    /// seeds yield an empty list, never an error. The returned list is
    /// reversed: the most relevant path is last, the convention downstream
    /// prompt builders expect.
    pub async fn retrieve_paths(
        &self,
        store: &ChunkStore,
        graph: &NarrativeGraph,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedPath>, ChunkError> {
        if graph.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let seeds = self.select_seeds(store, graph, query).await?;
        if seeds.is_empty() {
            debug!(query, "no seed nodes found");
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for seed in &seeds {
            candidates.extend(self.enumerate_from(graph, seed));
        }
        debug!(
            seeds = seeds.len(),
            candidates = candidates.len(),
            "paths enumerated"
        );

        Ok(self.finish(store, graph, query, candidates, top_k))
    }

    /// Constrained depth-first variant centered on one character, following
    /// only edges and node types the context allows.
    pub fn character_context_paths(
        &self,
        store: &ChunkStore,
        graph: &NarrativeGraph,
        character: &str,
        context_type: ContextType,
    ) -> Vec<RetrievedPath> {
        if !graph.contains(character) {
            return Vec::new();
        }

        let start = extract::normalize_entity_text(character);
        let mut found: Vec<Vec<String>> = Vec::new();
        let mut stack: Vec<Vec<String>> = vec![vec![start]];

        while let Some(path) = stack.pop() {
            if found.len() >= CHARACTER_MAX_PATHS {
                break;
            }
            if path.len() - 1 >= CHARACTER_MAX_DEPTH {
                continue;
            }
            let last = path.last().expect("paths are non-empty");
            for (next, edge) in graph.out_neighbors(last) {
                if path.contains(&next) {
                    continue;
                }
                let Some(target) = graph.node(&next) else {
                    continue;
                };
                if !context_type.allows(edge, target) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next);
                found.push(extended.clone());
                stack.push(extended);
            }
        }

        self.finish(store, graph, character, found, CHARACTER_MAX_PATHS)
    }

    async fn select_seeds(
        &self,
        store: &ChunkStore,
        graph: &NarrativeGraph,
        query: &str,
    ) -> Result<Vec<String>, ChunkError> {
        let hits = store
            .search(query, 2 * self.config.seed_count, None)
            .await?;

        let mut seeds = Vec::new();
        let mut seen = HashSet::new();
        'outer: for hit in &hits {
            for key in graph.nodes_in_doc(&hit.doc_id) {
                if seen.insert(key.clone()) {
                    seeds.push(key);
                    if seeds.len() >= self.config.seed_count {
                        break 'outer;
                    }
                }
            }
        }
        Ok(seeds)
    }

    /// Breadth-first path enumeration from one seed: acyclic, bounded hops,
    /// capped count. Each extension is recorded, so prefixes of longer paths
    /// appear too; pruning removes the redundant ones.
    fn enumerate_from(&self, graph: &NarrativeGraph, seed: &str) -> Vec<Vec<String>> {
        let mut found = Vec::new();
        let mut queue: VecDeque<Vec<String>> = VecDeque::from([vec![seed.to_string()]]);

        while let Some(path) = queue.pop_front() {
            if found.len() >= self.config.max_paths_per_node {
                break;
            }
            if path.len() - 1 >= self.config.max_path_length {
                continue;
            }
            let last = path.last().expect("paths are non-empty");
            for (next, _) in graph.out_neighbors(last) {
                if path.contains(&next) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next);
                found.push(extended.clone());
                if found.len() >= self.config.max_paths_per_node {
                    return found;
                }
                queue.push_back(extended);
            }
        }
        found
    }

    /// Shared tail of both retrieval modes: structural sort, redundancy
    /// pruning, relevance scoring, rendering, and the reversed final order.
    fn finish(
        &self,
        store: &ChunkStore,
        graph: &NarrativeGraph,
        query: &str,
        candidates: Vec<Vec<String>>,
        top_k: usize,
    ) -> Vec<RetrievedPath> {
        let decay = self.config.distance_decay;
        let mut structural: Vec<(f32, Vec<String>)> = candidates
            .into_iter()
            .map(|path| (structural_score(&path, graph, decay), path))
            .collect();
        structural.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let pruned = prune_redundant(
            structural.into_iter().map(|(_, path)| path).collect(),
            self.config.max_pruned_paths,
        );

        let terms = query_terms(query);
        let mut relevant: Vec<(f32, Vec<String>)> = pruned
            .into_iter()
            .map(|path| (relevance_score(&terms, &path, graph), path))
            .collect();
        relevant.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        relevant.truncate(top_k);

        let mut results: Vec<RetrievedPath> = relevant
            .into_iter()
            .map(|(score, path)| self.render(store, graph, path, score))
            .collect();

        // Most relevant last, for downstream prompt construction.
        results.reverse();
        results
    }

    fn render(
        &self,
        store: &ChunkStore,
        graph: &NarrativeGraph,
        path: Vec<String>,
        score: f32,
    ) -> RetrievedPath {
        let entities: Vec<String> = path
            .iter()
            .filter_map(|key| graph.node(key).map(|n| n.text.clone()))
            .collect();
        let relationships: Vec<String> = path
            .windows(2)
            .filter_map(|pair| graph.edge_between(&pair[0], &pair[1]))
            .map(|edge| edge.relation_type.as_str().to_string())
            .collect();

        RetrievedPath {
            narrative: render_narrative(&path, graph),
            supporting_texts: supporting_texts(&path, graph, store),
            nodes: path,
            score,
            entities,
            relationships,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunks::testing::FakeEmbedder;
    use extract::{Entity, Relationship};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn entity(text: &str, t: EntityType) -> Entity {
        Entity {
            text: text.to_string(),
            entity_type: t,
            start_pos: 0,
            end_pos: text.len(),
            confidence: 0.9,
        }
    }

    fn rel(s: &str, t: &str, k: &str) -> Relationship {
        Relationship {
            source: s.to_string(),
            target: t.to_string(),
            relation_type: RelationType::new(k),
            confidence: 0.8,
            context: String::new(),
        }
    }

    fn story_graph(doc_id: &str) -> NarrativeGraph {
        let mut graph = NarrativeGraph::new();
        graph.merge(
            &[
                entity("Alice", EntityType::Character),
                entity("Bob", EntityType::Character),
                entity("the castle", EntityType::Location),
            ],
            &[
                rel("Alice", "the castle", "LOCATED_IN"),
                rel("Alice", "Bob", "SPEAKS_TO"),
            ],
            Some(doc_id),
        );
        graph
    }

    async fn story_store() -> ChunkStore {
        let mut store = ChunkStore::new(Arc::new(FakeEmbedder::new(64)), 200);
        store
            .add(
                "Alice lived in the castle.\n\nAlice spoke often with Bob.",
                "doc-1",
                HashMap::new(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn empty_graph_returns_empty() {
        let store = story_store().await;
        let retriever = PathRetriever::default();
        let paths = retriever
            .retrieve_paths(&store, &NarrativeGraph::new(), "Alice", 5)
            .await
            .unwrap();
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn retrieves_alice_bob_path_with_speaks_to() {
        let store = story_store().await;
        let graph = story_graph("doc-1");
        let retriever = PathRetriever::default();

        let paths = retriever
            .retrieve_paths(&store, &graph, "Alice", 5)
            .await
            .unwrap();
        assert!(!paths.is_empty());

        let hit = paths.iter().find(|p| {
            p.entities.iter().any(|e| e == "Alice") && p.entities.iter().any(|e| e == "Bob")
        });
        let hit = hit.expect("a path containing Alice and Bob");
        assert!(hit.narrative.contains("speaks to"), "was: {}", hit.narrative);
        assert!(!hit.supporting_texts.is_empty());
    }

    #[tokio::test]
    async fn paths_are_acyclic() {
        let store = story_store().await;
        let mut graph = story_graph("doc-1");
        // Add a cycle back edge
        graph.merge(&[], &[rel("Bob", "Alice", "FEELS_ABOUT")], Some("doc-1"));

        let retriever = PathRetriever::default();
        let paths = retriever
            .retrieve_paths(&store, &graph, "Alice and Bob", 10)
            .await
            .unwrap();

        for path in &paths {
            let unique: HashSet<_> = path.nodes.iter().collect();
            assert_eq!(unique.len(), path.nodes.len(), "cycle in {:?}", path.nodes);
        }
    }

    #[tokio::test]
    async fn most_relevant_path_is_last() {
        let store = story_store().await;
        let graph = story_graph("doc-1");
        let retriever = PathRetriever::default();

        let paths = retriever
            .retrieve_paths(&store, &graph, "Alice Bob", 10)
            .await
            .unwrap();
        assert!(paths.len() >= 2);
        assert!(
            paths.last().unwrap().score >= paths.first().unwrap().score,
            "list must be ascending by relevance"
        );
    }

    #[tokio::test]
    async fn character_context_respects_allow_list() {
        let store = story_store().await;
        let graph = story_graph("doc-1");
        let retriever = PathRetriever::default();

        let relationship_paths = retriever.character_context_paths(
            &store,
            &graph,
            "Alice",
            ContextType::Relationships,
        );
        assert_eq!(relationship_paths.len(), 1);
        assert!(relationship_paths[0].entities.contains(&"Bob".to_string()));

        let location_paths =
            retriever.character_context_paths(&store, &graph, "Alice", ContextType::Locations);
        assert!(
            location_paths.is_empty(),
            "LOCATED_IN is not on the locations allow-list"
        );

        let all_paths =
            retriever.character_context_paths(&store, &graph, "Alice", ContextType::All);
        assert_eq!(all_paths.len(), 2);

        assert!(
            retriever
                .character_context_paths(&store, &graph, "Nobody", ContextType::All)
                .is_empty()
        );
    }

    #[test]
    fn context_type_parses_leniently() {
        assert_eq!(ContextType::parse("Events"), ContextType::Events);
        assert_eq!(ContextType::parse("anything else"), ContextType::All);
    }
}
