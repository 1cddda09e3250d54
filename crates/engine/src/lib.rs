//! Hybrid indexing engine that keeps a chunk-level vector store and an
//! entity graph of the same documents in sync, and answers queries by
//! combining both views.

pub mod config;
pub mod consistency;
pub mod feedback;
pub mod indexer;
pub mod retry;
pub mod search;
pub mod suggestions;

pub use config::{EngineConfig, RetryConfig};
pub use consistency::{CheckType, Conflict, ConsistencyReport};
pub use feedback::{ContextPassage, Feedback, MentionedEntity};
pub use indexer::{
    BatchStats, DocRecord, DocumentInput, EngineStats, HybridIndexer, IndexStats,
};
pub use retry::RetryPolicy;
pub use search::{HybridHit, SearchType};
pub use suggestions::{SuggestionType, Suggestions};
