//! Test helpers: build a pipeline state store over the in-process backend.
//!
//! Run from workspace root: `cargo test -p mediatrack-store`.

#![allow(dead_code)]

use mediatrack_core::{AssetRecord, PathRegistry};
use mediatrack_store::{MemoryStore, PipelineStateStore};
use std::sync::Arc;
use uuid::Uuid;

/// Store plus a handle on its backend for direct inspection.
pub struct TestStore {
    pub store: PipelineStateStore,
    pub backend: MemoryStore,
}

pub fn setup_store() -> TestStore {
    let backend = MemoryStore::new();
    let store = PipelineStateStore::new(
        Arc::new(backend.clone()),
        Arc::new(PathRegistry::default()),
    );
    TestStore { store, backend }
}

/// Fresh `(ownerId, assetId)` pair.
pub fn unique_ids() -> (String, String) {
    (
        format!("owner-{}", Uuid::new_v4()),
        format!("asset-{}", Uuid::new_v4()),
    )
}

/// Create a record and return its ids.
pub async fn initialized_asset(store: &PipelineStateStore) -> (String, String) {
    let (owner_id, asset_id) = unique_ids();
    let created = store
        .initialize_record(&owner_id, &asset_id)
        .await
        .expect("initialize_record failed");
    assert!(created, "fresh asset should be created");
    (owner_id, asset_id)
}

pub async fn fetch(store: &PipelineStateStore, owner_id: &str, asset_id: &str) -> AssetRecord {
    store
        .get_record(owner_id, asset_id)
        .await
        .expect("get_record failed")
        .expect("record should exist")
}
