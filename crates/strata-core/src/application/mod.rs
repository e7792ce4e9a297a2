//! Application Layer
//!
//! Use cases, the retrieval policy and the ports the infrastructure crate
//! implements.

pub mod embedding;
pub mod errors;
pub mod mocks;
pub mod policy;
pub mod ports;
pub mod use_cases;

pub use embedding::EmbeddingClient;
pub use errors::{AppError, AppResult};
pub use policy::{select_mode, Thresholds};
pub use ports::{
    ChunkModel, CollectionInfo, EmbeddingProvider, PointFilter, ScoredPayload,
    VectorStore,
};
pub use use_cases::*;
