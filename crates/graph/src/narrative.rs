use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use extract::{Entity, EntityType, RelationType, Relationship, normalize_entity_text};

/// Node payload: the best-confidence snapshot of an entity plus the list of
/// documents it was mentioned in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    /// Display surface form (highest-confidence instance seen).
    pub text: String,
    pub entity_type: EntityType,
    pub confidence: f32,
    pub start_pos: usize,
    pub end_pos: usize,
    /// Provenance: doc ids this entity was extracted from.
    pub docs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeData {
    pub relation_type: RelationType,
    pub confidence: f32,
    pub context: String,
}

/// Directed, typed graph of narrative entities.
///
/// Node identity is the normalized (lowercased, trimmed) entity text,
/// regardless of type — so a location and a character sharing a name
/// collide into one node, matching the merge protocol the extraction layer
/// assumes. Edges exist only between known nodes; relationships naming
/// unknown entities are dropped as extraction noise.
#[derive(Default)]
pub struct NarrativeGraph {
    graph: StableDiGraph<NodeData, EdgeData>,
    index: HashMap<String, NodeIndex>,
}

impl NarrativeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh graph from one merged extraction.
    pub fn build(entities: &[Entity], relationships: &[Relationship]) -> Self {
        let mut graph = Self::new();
        graph.merge(entities, relationships, None);
        graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&normalize_entity_text(key))
    }

    pub fn node(&self, key: &str) -> Option<&NodeData> {
        let idx = self.index.get(&normalize_entity_text(key))?;
        self.graph.node_weight(*idx)
    }

    /// Normalized keys of every node, in arbitrary order.
    pub fn node_keys(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    /// Nodes whose provenance includes `doc_id`.
    pub fn nodes_in_doc(&self, doc_id: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .index
            .iter()
            .filter(|(_, idx)| {
                self.graph
                    .node_weight(**idx)
                    .is_some_and(|n| n.docs.iter().any(|d| d == doc_id))
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Outgoing edges from a node, as (target key, edge data).
    pub fn out_neighbors(&self, key: &str) -> Vec<(String, &EdgeData)> {
        let Some(&idx) = self.index.get(&normalize_entity_text(key)) else {
            return Vec::new();
        };
        let mut out: Vec<(String, &EdgeData)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|edge| {
                let target = self.graph.node_weight(edge.target())?;
                Some((normalize_entity_text(&target.text), edge.weight()))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Highest-confidence directed edge between two nodes, if any.
    pub fn edge_between(&self, source: &str, target: &str) -> Option<&EdgeData> {
        let a = *self.index.get(&normalize_entity_text(source))?;
        let b = *self.index.get(&normalize_entity_text(target))?;
        self.graph
            .edges_connecting(a, b)
            .map(|e| e.weight())
            .max_by(|x, y| {
                x.confidence
                    .partial_cmp(&y.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Every edge as (source key, target key, data).
    pub fn edges(&self) -> Vec<(String, String, &EdgeData)> {
        self.graph
            .edge_references()
            .filter_map(|edge| {
                let source = self.graph.node_weight(edge.source())?;
                let target = self.graph.node_weight(edge.target())?;
                Some((
                    normalize_entity_text(&source.text),
                    normalize_entity_text(&target.text),
                    edge.weight(),
                ))
            })
            .collect()
    }

    /// Union entities and relationships into the graph: nodes dedupe on
    /// normalized text keeping max confidence, edges dedupe on
    /// (source, target, type) keeping max confidence, provenance lists
    /// accumulate. Idempotent for identical input.
    pub fn merge(
        &mut self,
        entities: &[Entity],
        relationships: &[Relationship],
        doc_id: Option<&str>,
    ) {
        for entity in entities {
            self.upsert_entity(entity, doc_id);
        }

        let mut dropped = 0usize;
        for rel in relationships {
            if !self.upsert_relationship(rel) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "relationships referencing unknown entities dropped");
        }
    }

    fn upsert_entity(&mut self, entity: &Entity, doc_id: Option<&str>) {
        let key = entity.normalized();
        match self.index.get(&key) {
            Some(&idx) => {
                let node = self.graph.node_weight_mut(idx).expect("indexed node exists");
                if entity.confidence > node.confidence {
                    node.text = entity.text.clone();
                    node.entity_type = entity.entity_type;
                    node.confidence = entity.confidence;
                    node.start_pos = entity.start_pos;
                    node.end_pos = entity.end_pos;
                }
                if let Some(doc) = doc_id {
                    if !node.docs.iter().any(|d| d == doc) {
                        node.docs.push(doc.to_string());
                    }
                }
            }
            None => {
                let idx = self.graph.add_node(NodeData {
                    text: entity.text.clone(),
                    entity_type: entity.entity_type,
                    confidence: entity.confidence,
                    start_pos: entity.start_pos,
                    end_pos: entity.end_pos,
                    docs: doc_id.map(|d| vec![d.to_string()]).unwrap_or_default(),
                });
                self.index.insert(key, idx);
            }
        }
    }

    /// Returns false when either endpoint is unknown and the edge was dropped.
    fn upsert_relationship(&mut self, rel: &Relationship) -> bool {
        let source_key = normalize_entity_text(&rel.source);
        let target_key = normalize_entity_text(&rel.target);

        let (Some(&a), Some(&b)) = (self.index.get(&source_key), self.index.get(&target_key))
        else {
            return false;
        };

        let existing = self
            .graph
            .edges_connecting(a, b)
            .find(|e| e.weight().relation_type == rel.relation_type)
            .map(|e| e.id());

        match existing {
            Some(edge_id) => {
                let data = self.graph.edge_weight_mut(edge_id).expect("edge exists");
                if rel.confidence > data.confidence {
                    data.confidence = rel.confidence;
                    data.context = rel.context.clone();
                }
            }
            None => {
                self.graph.add_edge(
                    a,
                    b,
                    EdgeData {
                        relation_type: rel.relation_type.clone(),
                        confidence: rel.confidence,
                        context: rel.context.clone(),
                    },
                );
            }
        }
        true
    }

    /// Retract a document's contribution: drop its provenance entries and
    /// remove nodes (with their incident edges) left with no provenance.
    /// Edges between surviving nodes are kept even if this document first
    /// introduced them; without per-edge provenance that staleness is the
    /// accepted tradeoff.
    pub fn remove_doc(&mut self, doc_id: &str) -> usize {
        let mut to_remove: Vec<(String, NodeIndex)> = Vec::new();

        for (key, &idx) in &self.index {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                node.docs.retain(|d| d != doc_id);
                if node.docs.is_empty() {
                    to_remove.push((key.clone(), idx));
                }
            }
        }

        for (key, idx) in &to_remove {
            self.graph.remove_node(*idx);
            self.index.remove(key);
        }
        to_remove.len()
    }

    // --- read-only analytics, computed on demand ---

    /// Character-to-character edges.
    pub fn character_interactions(&self) -> Vec<(String, String, RelationType)> {
        self.typed_edges(EntityType::Character, Some(EntityType::Character), None)
    }

    /// Character -> location edges of type LOCATED_IN.
    pub fn character_locations(&self) -> Vec<(String, String, RelationType)> {
        self.typed_edges(
            EntityType::Character,
            Some(EntityType::Location),
            Some(RelationType::LOCATED_IN),
        )
    }

    /// Display names of every EVENT node.
    pub fn plot_events(&self) -> Vec<String> {
        let mut events: Vec<String> = self
            .graph
            .node_weights()
            .filter(|n| n.entity_type == EntityType::Event)
            .map(|n| n.text.clone())
            .collect();
        events.sort();
        events
    }

    fn typed_edges(
        &self,
        source_type: EntityType,
        target_type: Option<EntityType>,
        relation: Option<&str>,
    ) -> Vec<(String, String, RelationType)> {
        let mut out: Vec<(String, String, RelationType)> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let source = self.graph.node_weight(edge.source())?;
                let target = self.graph.node_weight(edge.target())?;
                if source.entity_type != source_type {
                    return None;
                }
                if let Some(t) = target_type {
                    if target.entity_type != t {
                        return None;
                    }
                }
                if let Some(r) = relation {
                    if edge.weight().relation_type.as_str() != r {
                        return None;
                    }
                }
                Some((
                    source.text.clone(),
                    target.text.clone(),
                    edge.weight().relation_type.clone(),
                ))
            })
            .collect();
        out.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        out
    }

    /// Undirected adjacency view for centrality computations: stable key
    /// ordering, index-aligned neighbor lists.
    pub(crate) fn adjacency(&self) -> (Vec<String>, Vec<Vec<usize>>) {
        let mut keys: Vec<String> = self.index.keys().cloned().collect();
        keys.sort();
        let positions: HashMap<&str, usize> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();

        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); keys.len()];
        for (source, target, _) in self.edges() {
            let (Some(&i), Some(&j)) = (positions.get(source.as_str()), positions.get(target.as_str()))
            else {
                continue;
            };
            if i != j {
                if !adj[i].contains(&j) {
                    adj[i].push(j);
                }
                if !adj[j].contains(&i) {
                    adj[j].push(i);
                }
            }
        }
        (keys, adj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(text: &str, entity_type: EntityType, confidence: f32) -> Entity {
        Entity {
            text: text.to_string(),
            entity_type,
            start_pos: 0,
            end_pos: text.len(),
            confidence,
        }
    }

    fn rel(source: &str, target: &str, kind: &str) -> Relationship {
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            relation_type: RelationType::new(kind),
            confidence: 0.7,
            context: String::new(),
        }
    }

    fn alice_bob_castle() -> (Vec<Entity>, Vec<Relationship>) {
        (
            vec![
                entity("Alice", EntityType::Character, 0.9),
                entity("Bob", EntityType::Character, 0.8),
                entity("the castle", EntityType::Location, 0.7),
            ],
            vec![
                rel("Alice", "Bob", "SPEAKS_TO"),
                rel("Alice", "the castle", "LOCATED_IN"),
            ],
        )
    }

    #[test]
    fn dangling_relationships_are_dropped() {
        let (entities, mut rels) = alice_bob_castle();
        rels.push(rel("Alice", "the dragon", "FEELS_ABOUT"));

        let graph = NarrativeGraph::build(&entities, &rels);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2, "edge to unknown node must not exist");
    }

    #[test]
    fn merge_is_idempotent() {
        let (entities, rels) = alice_bob_castle();
        let mut graph = NarrativeGraph::new();
        graph.merge(&entities, &rels, Some("doc-1"));
        let (nodes, edges) = (graph.node_count(), graph.edge_count());

        graph.merge(&entities, &rels, Some("doc-1"));
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edge_count(), edges);
        assert_eq!(graph.node("Alice").unwrap().docs, vec!["doc-1"]);
    }

    #[test]
    fn case_insensitive_identity_keeps_max_confidence() {
        let mut graph = NarrativeGraph::new();
        graph.merge(&[entity("ALICE", EntityType::Character, 0.5)], &[], None);
        graph.merge(&[entity("Alice", EntityType::Character, 0.9)], &[], None);

        assert_eq!(graph.node_count(), 1);
        let node = graph.node("alice").unwrap();
        assert_eq!(node.text, "Alice");
        assert_eq!(node.confidence, 0.9);
    }

    #[test]
    fn provenance_tracks_docs_and_remove_doc_retracts() {
        let (entities, rels) = alice_bob_castle();
        let mut graph = NarrativeGraph::new();
        graph.merge(&entities, &rels, Some("doc-1"));
        graph.merge(
            &[entity("Bob", EntityType::Character, 0.8)],
            &[],
            Some("doc-2"),
        );

        assert_eq!(graph.nodes_in_doc("doc-1").len(), 3);

        let removed = graph.remove_doc("doc-1");
        assert_eq!(removed, 2, "alice and the castle had only doc-1");
        assert!(graph.contains("Bob"));
        assert!(!graph.contains("Alice"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn analytics_filter_by_type() {
        let (entities, rels) = alice_bob_castle();
        let mut graph = NarrativeGraph::build(&entities, &rels);
        graph.merge(&[entity("the siege", EntityType::Event, 0.6)], &[], None);

        let interactions = graph.character_interactions();
        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].0, "Alice");

        let locations = graph.character_locations();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].1, "the castle");

        assert_eq!(graph.plot_events(), vec!["the siege".to_string()]);
    }

    #[test]
    fn edge_between_returns_highest_confidence() {
        let (entities, _) = alice_bob_castle();
        let mut graph = NarrativeGraph::new();
        graph.merge(&entities, &[rel("Alice", "Bob", "SPEAKS_TO")], None);

        let edge = graph.edge_between("alice", "bob").unwrap();
        assert_eq!(edge.relation_type.as_str(), "SPEAKS_TO");
        assert!(graph.edge_between("bob", "alice").is_none());
    }
}
