use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::narrative::NarrativeGraph;

/// Importance metrics for one node, all normalized to [0, 1] ranges where the
/// metric allows.
#[derive(Debug, Clone, Serialize)]
pub struct CentralityScores {
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
}

/// Degree, betweenness, and closeness centrality over the graph treated as
/// undirected. Computed on demand; the graph mutates too often during
/// indexing for caching to pay off.
pub fn centrality(graph: &NarrativeGraph) -> HashMap<String, CentralityScores> {
    let (keys, adj) = graph.adjacency();
    let n = keys.len();
    if n == 0 {
        return HashMap::new();
    }

    let betweenness = brandes_betweenness(&adj);

    let mut scores = HashMap::with_capacity(n);
    for (i, key) in keys.iter().enumerate() {
        let degree = if n > 1 {
            adj[i].len() as f64 / (n - 1) as f64
        } else {
            0.0
        };
        scores.insert(
            key.clone(),
            CentralityScores {
                degree,
                betweenness: betweenness[i],
                closeness: closeness_from(i, &adj),
            },
        );
    }
    scores
}

fn closeness_from(start: usize, adj: &[Vec<usize>]) -> f64 {
    let distances = bfs_distances(start, adj);
    let mut reachable = 0usize;
    let mut total = 0usize;
    for (node, dist) in distances.iter().enumerate() {
        if node != start {
            if let Some(d) = dist {
                reachable += 1;
                total += d;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        reachable as f64 / total as f64
    }
}

fn bfs_distances(start: usize, adj: &[Vec<usize>]) -> Vec<Option<usize>> {
    let mut distances = vec![None; adj.len()];
    distances[start] = Some(0);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let d = distances[node].expect("queued nodes have distances");
        for &next in &adj[node] {
            if distances[next].is_none() {
                distances[next] = Some(d + 1);
                queue.push_back(next);
            }
        }
    }
    distances
}

/// Brandes' algorithm for unweighted betweenness, normalized by the number
/// of node pairs.
fn brandes_betweenness(adj: &[Vec<usize>]) -> Vec<f64> {
    let n = adj.len();
    let mut centrality = vec![0.0f64; n];

    for source in 0..n {
        let mut stack: Vec<usize> = Vec::new();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];

        sigma[source] = 1.0;
        dist[source] = Some(0);

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].expect("queued nodes have distances");
            for &w in &adj[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    // Undirected: each pair counted twice; normalize to [0, 1]
    if n > 2 {
        let norm = ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value /= norm;
        }
    }
    centrality
}
