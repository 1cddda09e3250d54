//! Knowledge graph of narrative entities: typed directed graph with a
//! noise-tolerant merge protocol, per-document provenance, and on-demand
//! analytics.

pub mod analyzer;
pub mod centrality;
pub mod narrative;

pub use analyzer::GraphAnalyzer;
pub use centrality::{CentralityScores, centrality};
pub use narrative::{EdgeData, NarrativeGraph, NodeData};
