//! Path retrieval over the narrative graph: seed selection via vector
//! search, bounded acyclic traversal, pruning, multi-factor scoring, and
//! natural-language rendering of the surviving paths.

pub mod render;
pub mod retriever;
pub mod scoring;

pub use render::{render_narrative, verb_phrase};
pub use retriever::{ContextType, PathRetriever, RetrievedPath, RetrieverConfig};
pub use scoring::{edge_weight, query_terms, relevance_score, structural_score};
