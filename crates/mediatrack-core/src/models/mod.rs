//! Data models for the pipeline state store
//!
//! The record schema (keys, metadata and progress documents) plus the two
//! enumerations callers address it with.

mod asset;
mod category;
mod stage;

pub use asset::*;
pub use category::*;
pub use stage::*;
