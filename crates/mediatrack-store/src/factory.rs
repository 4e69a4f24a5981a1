#[cfg(feature = "state-dynamodb")]
use crate::DynamoDbStore;
#[cfg(feature = "state-memory")]
use crate::MemoryStore;
use crate::{DocumentStore, PipelineStateStore, StateBackend};
use mediatrack_core::{Config, PathRegistry, StoreError, StoreResult};
use std::sync::Arc;

/// Create a document store backend based on configuration
pub async fn create_backend(config: &Config) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.state_backend {
        #[cfg(feature = "state-dynamodb")]
        StateBackend::DynamoDb => {
            let region = config.dynamodb_region.clone().ok_or_else(|| {
                StoreError::Config("DYNAMODB_REGION or AWS_REGION not configured".to_string())
            })?;

            let store = DynamoDbStore::new(
                config.table_name.clone(),
                region,
                config.dynamodb_endpoint.clone(),
            )
            .await?;

            if config.auto_create_table {
                store.ensure_table().await?;
            }

            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "state-dynamodb"))]
        StateBackend::DynamoDb => Err(StoreError::Config(
            "DynamoDB state backend not available (state-dynamodb feature not enabled)".to_string(),
        )),

        #[cfg(feature = "state-memory")]
        StateBackend::Memory => Ok(Arc::new(MemoryStore::new())),

        #[cfg(not(feature = "state-memory"))]
        StateBackend::Memory => Err(StoreError::Config(
            "Memory state backend not available (state-memory feature not enabled)".to_string(),
        )),
    }
}

/// Create the pipeline state store with the default metadata paths.
pub async fn create_state_store(config: &Config) -> StoreResult<PipelineStateStore> {
    let backend = create_backend(config).await?;
    tracing::info!(
        backend = %backend.backend_type(),
        environment = %config.environment,
        "Pipeline state store ready"
    );
    Ok(PipelineStateStore::new(
        backend,
        Arc::new(PathRegistry::default()),
    ))
}
