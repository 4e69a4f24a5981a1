//! Concurrent writers against one asset record.
//!
//! Run with: `cargo test -p mediatrack-store --test concurrency_test`

mod helpers;

use futures::future::join_all;
use helpers::{fetch, initialized_asset, setup_store, unique_ids};
use mediatrack_core::{MetadataCategory, PipelineStage};
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_metadata_writes_all_persist() {
    let test = setup_store();
    let (owner_id, asset_id) = initialized_asset(&test.store).await;

    let writes = MetadataCategory::ALL.into_iter().map(|category| {
        let store = test.store.clone();
        let owner_id = owner_id.clone();
        let asset_id = asset_id.clone();
        tokio::spawn(async move {
            store
                .update_metadata(
                    &owner_id,
                    &asset_id,
                    category,
                    &json!({ "writtenBy": category.as_str() }),
                )
                .await
        })
    });

    for result in join_all(writes).await {
        assert!(result.unwrap().unwrap());
    }

    let record = fetch(&test.store, &owner_id, &asset_id).await;
    for category in MetadataCategory::ALL {
        assert_eq!(
            record.metadata.get(category),
            &json!({ "writtenBy": category.as_str() })
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_progress_and_metadata_writes() {
    let test = setup_store();
    let (owner_id, asset_id) = initialized_asset(&test.store).await;

    let progress = PipelineStage::ALL.into_iter().map(|stage| {
        let store = test.store.clone();
        let owner_id = owner_id.clone();
        let asset_id = asset_id.clone();
        tokio::spawn(async move {
            store
                .update_progress(&owner_id, &asset_id, stage, true)
                .await
        })
    });
    let metadata = {
        let store = test.store.clone();
        let owner_id = owner_id.clone();
        let asset_id = asset_id.clone();
        tokio::spawn(async move {
            store
                .update_metadata(
                    &owner_id,
                    &asset_id,
                    MetadataCategory::Technical,
                    &json!({ "codec": "av1" }),
                )
                .await
        })
    };

    for result in join_all(progress).await {
        assert!(result.unwrap().unwrap());
    }
    assert!(metadata.await.unwrap().unwrap());

    let record = fetch(&test.store, &owner_id, &asset_id).await;
    assert_eq!(record.progress.completed_stages(), PipelineStage::ALL.to_vec());
    assert_eq!(record.metadata.technical, json!({ "codec": "av1" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_initializers_create_once() {
    let test = setup_store();
    let (owner_id, asset_id) = unique_ids();

    let attempts = (0..8).map(|_| {
        let store = test.store.clone();
        let owner_id = owner_id.clone();
        let asset_id = asset_id.clone();
        tokio::spawn(async move { store.initialize_record(&owner_id, &asset_id).await })
    });

    let created = join_all(attempts)
        .await
        .into_iter()
        .map(|result| result.unwrap().unwrap())
        .filter(|created| *created)
        .count();

    assert_eq!(created, 1);
    assert_eq!(test.backend.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_progress_writes_keep_a_written_timestamp() {
    let test = setup_store();
    let (owner_id, asset_id) = initialized_asset(&test.store).await;
    let initial = fetch(&test.store, &owner_id, &asset_id).await;

    let writes = PipelineStage::ALL.into_iter().map(|stage| {
        let store = test.store.clone();
        let owner_id = owner_id.clone();
        let asset_id = asset_id.clone();
        tokio::spawn(async move {
            store.update_progress(&owner_id, &asset_id, stage, true).await?;
            store.get_record(&owner_id, &asset_id).await
        })
    });
    let observed: Vec<_> = join_all(writes)
        .await
        .into_iter()
        .map(|result| result.unwrap().unwrap().unwrap().progress.updated_at)
        .collect();

    // The stored stamp is the one carried by whichever write landed last.
    let record = fetch(&test.store, &owner_id, &asset_id).await;
    assert!(observed.contains(&record.progress.updated_at));
    assert!(record.progress.updated_at >= initial.progress.updated_at);
    assert_eq!(record.progress.completed_stages(), PipelineStage::ALL.to_vec());
}
