//! Qdrant-backed vector store and its telemetry.

pub mod observability;
pub mod qdrant;

pub use observability::{
    render_metrics, VectorError, VectorHealth, VectorHealthStatus, VectorMetrics,
    VectorTelemetry, VectorTelemetrySnapshot,
};
pub use qdrant::QdrantStore;
