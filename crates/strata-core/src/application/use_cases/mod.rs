//! Application Use Cases
//!
//! Workflows coordinating domain types and ports.

pub mod build_index;
pub mod search;
pub mod split_document;

pub use build_index::{BuildSummary, IndexBuilder, DEFAULT_BATCH_SIZE};
pub use search::{RetrievalEngine, DEFAULT_SCROLL_LIMIT};
pub use split_document::{SemanticSplitter, SplitterSettings, FALLBACK_TITLE};
