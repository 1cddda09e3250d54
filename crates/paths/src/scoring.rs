use std::collections::HashSet;

use extract::RelationType;
use graph::NarrativeGraph;

/// Traversal weight for one relation kind: causal chains matter most,
/// interpersonal edges next, everything else is baseline.
pub fn edge_weight(relation: &RelationType) -> f32 {
    if relation.is_causal() {
        2.0
    } else if relation.is_interpersonal() {
        1.5
    } else {
        1.0
    }
}

fn is_strong(relation: &RelationType) -> bool {
    relation.is_causal() || relation.is_interpersonal()
}

/// Sum of edge weights with an exponential length penalty: longer threads
/// must earn their keep.
pub fn structural_score(path: &[String], graph: &NarrativeGraph, distance_decay: f32) -> f32 {
    if path.len() < 2 {
        return 0.0;
    }
    let weight_sum: f32 = path
        .windows(2)
        .filter_map(|pair| graph.edge_between(&pair[0], &pair[1]))
        .map(|edge| edge_weight(&edge.relation_type))
        .sum();

    let hops = (path.len() - 1) as i32;
    weight_sum * distance_decay.powi(hops - 1)
}

/// Greedy redundancy elimination over paths already sorted by descending
/// structural score: a path is kept only if it contributes at least one edge
/// not covered by a previously kept path.
pub fn prune_redundant(sorted_paths: Vec<Vec<String>>, cap: usize) -> Vec<Vec<String>> {
    let mut covered: HashSet<(String, String)> = HashSet::new();
    let mut kept = Vec::new();

    for path in sorted_paths {
        if kept.len() >= cap {
            break;
        }
        let edges: Vec<(String, String)> = path
            .windows(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        if edges.iter().any(|e| !covered.contains(e)) {
            covered.extend(edges);
            kept.push(path);
        }
    }
    kept
}

/// Multi-factor relevance: keyword overlap with the query (0.4), count of
/// strong edges traversed (0.3 each), entity-type diversity (0.2), and an
/// inverse-length bonus (0.1). The strong-edge term is a count, not a
/// share, so a long chain of causal edges outranks one short strong hop;
/// the sum is clamped so the result stays in [0, 1].
pub fn relevance_score(query_terms: &[String], path: &[String], graph: &NarrativeGraph) -> f32 {
    if path.is_empty() {
        return 0.0;
    }

    let keyword_overlap = if query_terms.is_empty() {
        0.0
    } else {
        let matched = query_terms
            .iter()
            .filter(|term| {
                path.iter().any(|key| key.contains(term.as_str()))
            })
            .count();
        matched as f32 / query_terms.len() as f32
    };

    let strong_count = path
        .windows(2)
        .filter_map(|pair| graph.edge_between(&pair[0], &pair[1]))
        .filter(|e| is_strong(&e.relation_type))
        .count() as f32;

    let distinct_types: HashSet<_> = path
        .iter()
        .filter_map(|key| graph.node(key).map(|n| n.entity_type))
        .collect();
    let diversity = distinct_types.len() as f32 / path.len() as f32;

    let inverse_length = 1.0 / path.len() as f32;

    (0.4 * keyword_overlap + 0.3 * strong_count + 0.2 * diversity + 0.1 * inverse_length).min(1.0)
}

/// Lowercased alphanumeric query terms, stopword-free enough for label
/// matching.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Entity, EntityType, Relationship};

    fn sample_graph() -> NarrativeGraph {
        let entity = |text: &str, t: EntityType| Entity {
            text: text.to_string(),
            entity_type: t,
            start_pos: 0,
            end_pos: text.len(),
            confidence: 0.9,
        };
        let rel = |s: &str, t: &str, k: &str| Relationship {
            source: s.to_string(),
            target: t.to_string(),
            relation_type: RelationType::new(k),
            confidence: 0.8,
            context: String::new(),
        };
        NarrativeGraph::build(
            &[
                entity("alice", EntityType::Character),
                entity("bob", EntityType::Character),
                entity("castle", EntityType::Location),
            ],
            &[
                rel("alice", "bob", "SPEAKS_TO"),
                rel("bob", "castle", "GOES_TO"),
            ],
        )
    }

    #[test]
    fn causal_edges_weigh_most() {
        assert_eq!(edge_weight(&RelationType::new("CAUSES")), 2.0);
        assert_eq!(edge_weight(&RelationType::new("SPEAKS_TO")), 1.5);
        assert_eq!(edge_weight(&RelationType::new("LOCATED_IN")), 1.0);
    }

    #[test]
    fn structural_score_decays_with_length() {
        let graph = sample_graph();
        let short = structural_score(&["alice".into(), "bob".into()], &graph, 0.8);
        let long = structural_score(
            &["alice".into(), "bob".into(), "castle".into()],
            &graph,
            0.8,
        );
        // 1.5 vs (1.5 + 1.0) * 0.8 = 2.0
        assert!((short - 1.5).abs() < 1e-6);
        assert!((long - 2.0).abs() < 1e-6);
    }

    #[test]
    fn pruning_drops_fully_covered_paths() {
        let paths = vec![
            vec!["alice".to_string(), "bob".to_string(), "castle".to_string()],
            vec!["alice".to_string(), "bob".to_string()],
            vec!["bob".to_string(), "castle".to_string()],
        ];
        let kept = prune_redundant(paths, 20);
        assert_eq!(kept.len(), 1, "sub-paths add no novel edges");
    }

    #[test]
    fn strong_edges_accumulate_rather_than_average() {
        let entity = |text: &str, t: EntityType| Entity {
            text: text.to_string(),
            entity_type: t,
            start_pos: 0,
            end_pos: text.len(),
            confidence: 0.9,
        };
        let rel = |s: &str, t: &str, k: &str| Relationship {
            source: s.to_string(),
            target: t.to_string(),
            relation_type: RelationType::new(k),
            confidence: 0.8,
            context: String::new(),
        };
        let graph = NarrativeGraph::build(
            &[
                entity("alice", EntityType::Character),
                entity("bob", EntityType::Character),
                entity("siege", EntityType::Event),
                entity("castle", EntityType::Location),
            ],
            &[
                rel("alice", "bob", "SPEAKS_TO"),
                rel("bob", "siege", "CAUSES"),
                rel("siege", "castle", "LOCATED_IN"),
            ],
        );

        let short = vec!["alice".to_string(), "bob".to_string()];
        let chain = vec![
            "alice".to_string(),
            "bob".to_string(),
            "siege".to_string(),
            "castle".to_string(),
        ];
        let short_score = relevance_score(&[], &short, &graph);
        let chain_score = relevance_score(&[], &chain, &graph);

        assert!(
            chain_score > short_score,
            "two strong edges must outrank one ({chain_score} vs {short_score})"
        );
        assert!(chain_score <= 1.0);
    }

    #[test]
    fn relevance_rewards_query_overlap() {
        let graph = sample_graph();
        let path = vec!["alice".to_string(), "bob".to_string()];
        let on_topic = relevance_score(&query_terms("what does Alice say"), &path, &graph);
        let off_topic = relevance_score(&query_terms("the weather"), &path, &graph);
        assert!(on_topic > off_topic);
        assert!(on_topic <= 1.0);
    }
}
