//! Mediatrack Core Library
//!
//! Record schema, tagged attribute encoding, metadata path registry, error
//! types and configuration shared by every Mediatrack component.

pub mod attribute;
pub mod backend_types;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;

// Re-export commonly used types
pub use attribute::{decode, encode, AttrMap, AttrValue};
pub use backend_types::StateBackend;
pub use config::{Config, LogFormat};
pub use error::{LogLevel, StoreError, StoreResult};
pub use models::{AssetKey, AssetRecord, MetadataCategory, PipelineStage};
pub use paths::PathRegistry;
