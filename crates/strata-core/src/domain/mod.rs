//! Domain Layer - Pure Business Logic
//!
//! Corpus records, index points and the response shapes of the retrieval
//! engine. No I/O happens here.

pub mod response;
pub mod value_objects;

pub use response::*;
pub use value_objects::*;
