//! Mediatrack Store Library
//!
//! Persistent pipeline state for media assets: one record per asset holding
//! its metadata categories and stage progress flags. Backends are pluggable
//! behind [`DocumentStore`] and selected via Cargo features.

pub mod factory;
pub mod pipeline;
pub mod traits;

#[cfg(feature = "state-dynamodb")]
pub mod dynamodb;

#[cfg(feature = "state-memory")]
pub mod memory;

pub use factory::{create_backend, create_state_store};
pub use mediatrack_core::StateBackend;
pub use pipeline::PipelineStateStore;
pub use traits::{DocumentStore, SetAction, UpdateRequest, WriteOutcome};

#[cfg(feature = "state-dynamodb")]
pub use dynamodb::DynamoDbStore;

#[cfg(feature = "state-memory")]
pub use memory::MemoryStore;
