//! Pipeline state store
//!
//! Records and advances the lifecycle of one asset as it moves through the
//! processing stages. Each public operation turns into exactly one request
//! against the [`DocumentStore`]; nothing here reads before it writes.
//!
//! Results follow a two-level policy:
//!
//! - `Ok(true)`: the backend applied the write
//! - `Ok(false)`: soft failure, i.e. the record already existed on
//!   initialization, or the backend answered with a non-success status
//! - `Err(_)`: caller misuse (rejected before any network call) or a hard
//!   fault whose outcome is unknown
//!
//! Stage ordering is not enforced here, and a stage flag can be written back
//! to `false`; serializing stages is the orchestrator's job.
//!
//! `progress.updatedAt` is stamped from the caller's clock when the request is
//! built. Sequential writes from one caller never move it backwards, but of two
//! racing writers the one applied last may carry the earlier timestamp.

use crate::traits::{DocumentStore, UpdateRequest, WriteOutcome};
use chrono::Utc;
use mediatrack_core::models::{
    format_timestamp, AssetProgress, CREATED_AT_ATTR, CRITICAL_FAILURE_ATTR, METADATA_ATTR,
    PROGRESS_ATTR, UPDATED_AT_ATTR,
};
use mediatrack_core::{
    encode, AssetKey, AssetRecord, AttrValue, MetadataCategory, PathRegistry, PipelineStage,
    StoreResult,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Stateless front for the asset state records. Cheap to clone; clones share
/// the backend client and the path registry.
#[derive(Clone)]
pub struct PipelineStateStore {
    backend: Arc<dyn DocumentStore>,
    paths: Arc<PathRegistry>,
}

impl PipelineStateStore {
    pub fn new(backend: Arc<dyn DocumentStore>, paths: Arc<PathRegistry>) -> Self {
        Self { backend, paths }
    }

    pub fn with_default_paths(backend: Arc<dyn DocumentStore>) -> Self {
        Self::new(backend, Arc::new(PathRegistry::default()))
    }

    pub fn backend(&self) -> &Arc<dyn DocumentStore> {
        &self.backend
    }

    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }

    /// Create the record for an asset, exactly once.
    ///
    /// Returns `false` when a record already exists for the key; the existing
    /// record is not modified.
    #[tracing::instrument(skip(self))]
    pub async fn initialize_record(&self, owner_id: &str, asset_id: &str) -> StoreResult<bool> {
        let key = AssetKey::new(owner_id, asset_id)?;
        let now = Utc::now();

        let mut item = key.to_item();
        item.insert(
            CREATED_AT_ATTR.to_string(),
            AttrValue::Str(format_timestamp(now)),
        );
        item.insert(
            METADATA_ATTR.to_string(),
            AttrValue::Map(self.paths.skeleton()),
        );
        item.insert(
            PROGRESS_ATTR.to_string(),
            AttrValue::Map(AssetProgress::initial_item(now)),
        );

        let outcome = self.backend.put_if_absent(&key, item).await?;
        Ok(report("initialize_record", &key, outcome))
    }

    /// Replace one metadata category with `data`, leaving every sibling
    /// category untouched.
    #[tracing::instrument(skip(self, data), fields(category = %category))]
    pub async fn update_metadata(
        &self,
        owner_id: &str,
        asset_id: &str,
        category: MetadataCategory,
        data: &JsonValue,
    ) -> StoreResult<bool> {
        let key = AssetKey::new(owner_id, asset_id)?;
        let relative = self.paths.resolve(category)?;

        let path = std::iter::once(METADATA_ATTR.to_string()).chain(relative.iter().cloned());
        let request = UpdateRequest::new().set(path, encode(data))?;

        let outcome = self.backend.update(&key, &request).await?;
        Ok(report("update_metadata", &key, outcome))
    }

    /// Set one stage flag and refresh `progress.updatedAt` in the same write.
    #[tracing::instrument(skip(self), fields(stage = %stage))]
    pub async fn update_progress(
        &self,
        owner_id: &str,
        asset_id: &str,
        stage: PipelineStage,
        value: bool,
    ) -> StoreResult<bool> {
        let key = AssetKey::new(owner_id, asset_id)?;
        let request = progress_update(stage.attribute_name(), value)?;

        let outcome = self.backend.update(&key, &request).await?;
        Ok(report("update_progress", &key, outcome))
    }

    /// Set or clear the critical failure alarm. Stage flags are not touched.
    #[tracing::instrument(skip(self))]
    pub async fn mark_critical_failure(
        &self,
        owner_id: &str,
        asset_id: &str,
        value: bool,
    ) -> StoreResult<bool> {
        let key = AssetKey::new(owner_id, asset_id)?;
        let request = progress_update(CRITICAL_FAILURE_ATTR, value)?;

        let outcome = self.backend.update(&key, &request).await?;
        Ok(report("mark_critical_failure", &key, outcome))
    }

    /// Read the current record, if any.
    #[tracing::instrument(skip(self))]
    pub async fn get_record(
        &self,
        owner_id: &str,
        asset_id: &str,
    ) -> StoreResult<Option<AssetRecord>> {
        let key = AssetKey::new(owner_id, asset_id)?;
        let item = self.backend.get(&key).await?;
        item.as_ref().map(AssetRecord::from_item).transpose()
    }
}

fn progress_update(flag: &str, value: bool) -> StoreResult<UpdateRequest> {
    UpdateRequest::new()
        .set([PROGRESS_ATTR, flag], value)?
        .set(
            [PROGRESS_ATTR, UPDATED_AT_ATTR],
            format_timestamp(Utc::now()),
        )
}

fn report(operation: &'static str, key: &AssetKey, outcome: WriteOutcome) -> bool {
    match outcome {
        WriteOutcome::Applied => {
            tracing::debug!(
                operation,
                owner_id = %key.owner_id,
                asset_id = %key.asset_id,
                "State write applied"
            );
            true
        }
        WriteOutcome::ConditionFailed => {
            tracing::info!(
                operation,
                owner_id = %key.owner_id,
                asset_id = %key.asset_id,
                "Record already initialized"
            );
            false
        }
        WriteOutcome::Rejected { reason } => {
            tracing::warn!(
                operation,
                owner_id = %key.owner_id,
                asset_id = %key.asset_id,
                reason = %reason,
                "State write rejected by backend"
            );
            false
        }
    }
}
