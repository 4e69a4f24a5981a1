use crate::traits::{DocumentStore, UpdateRequest, WriteOutcome};
use async_trait::async_trait;
use mediatrack_core::models::{ASSET_ID_ATTR, OWNER_ID_ATTR};
use mediatrack_core::{AssetKey, AttrMap, AttrValue, StateBackend, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Significant digits a DynamoDB number may carry.
const MAX_NUMBER_DIGITS: usize = 38;
/// DynamoDB numbers lie strictly below 1E+126 and at or above 1E-130 in magnitude.
const NUMBER_MAGNITUDE_LIMIT: f64 = 1e126;
const MIN_NUMBER_MAGNITUDE: f64 = 1e-130;

/// In-process document store
///
/// Each request is applied under a single lock, so it is as atomic as a
/// DynamoDB item write. Update semantics mirror DynamoDB: a nested `SET`
/// whose parent document is missing (including on a missing item) and any
/// write to a key attribute are rejected, and a rejected request changes
/// nothing. Values DynamoDB refuses (numbers out of its range or precision,
/// empty map keys) are rejected here as well.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<AssetKey, AttrMap>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items. Still readable after a writer panicked.
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<AssetKey, AttrMap>>> {
        self.items.lock().map_err(|_| {
            StoreError::backend(
                "Memory store lock poisoned",
                anyhow::anyhow!("a writer panicked while holding the lock"),
            )
        })
    }
}

/// Check a value against DynamoDB's limits; returns the rejection reason.
fn validate_value(value: &AttrValue) -> Result<(), String> {
    match value {
        AttrValue::Num(text) => validate_number(text),
        AttrValue::Map(fields) => validate_fields(fields),
        AttrValue::Null | AttrValue::Bool(_) | AttrValue::Str(_) => Ok(()),
    }
}

fn validate_fields(fields: &AttrMap) -> Result<(), String> {
    fields.iter().try_for_each(|(name, value)| {
        if name.is_empty() {
            return Err("Map attribute names must not be empty".to_string());
        }
        validate_value(value)
    })
}

fn validate_number(text: &str) -> Result<(), String> {
    let magnitude = text
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(f64::abs)
        .ok_or_else(|| format!("The parameter cannot be converted to a numeric value: {}", text))?;
    if magnitude >= NUMBER_MAGNITUDE_LIMIT || (magnitude != 0.0 && magnitude < MIN_NUMBER_MAGNITUDE) {
        return Err(format!("Number {} is out of the supported range", text));
    }

    let mantissa = text.split(['e', 'E']).next().unwrap_or(text);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let significant = digits.trim_start_matches('0').trim_end_matches('0');
    if significant.len() > MAX_NUMBER_DIGITS {
        return Err(format!("Number {} has more than 38 significant digits", text));
    }
    Ok(())
}

/// Apply one `SET` to `item`; returns the rejection reason on failure.
fn apply_set(item: &mut AttrMap, path: &[String], value: &AttrValue) -> Result<(), String> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| "update path is empty".to_string())?;

    let root = parents.first().unwrap_or(last);
    if root == OWNER_ID_ATTR || root == ASSET_ID_ATTR {
        return Err(format!(
            "Cannot update attribute {}. This attribute is part of the key",
            root
        ));
    }

    validate_value(value)?;

    let mut node = item;
    for segment in parents {
        node = match node.get_mut(segment) {
            Some(AttrValue::Map(child)) => child,
            _ => {
                return Err(format!(
                    "The document path provided in the update expression is invalid for update: {}",
                    path.join(".")
                ))
            }
        };
    }
    node.insert(last.clone(), value.clone());
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put_if_absent(&self, key: &AssetKey, item: AttrMap) -> StoreResult<WriteOutcome> {
        let mut items = self.lock()?;
        if items.contains_key(key) {
            return Ok(WriteOutcome::ConditionFailed);
        }

        let mut item = item;
        if let Err(reason) = validate_fields(&item) {
            return Ok(WriteOutcome::Rejected { reason });
        }
        item.extend(key.to_item());
        items.insert(key.clone(), item);
        Ok(WriteOutcome::Applied)
    }

    async fn update(&self, key: &AssetKey, request: &UpdateRequest) -> StoreResult<WriteOutcome> {
        if request.is_empty() {
            return Ok(WriteOutcome::Rejected {
                reason: "update request has no actions".to_string(),
            });
        }

        let mut items = self.lock()?;
        // Work on a copy so a rejected action leaves the stored item intact.
        let mut updated = items.get(key).cloned().unwrap_or_else(|| key.to_item());
        for action in request.actions() {
            if let Err(reason) = apply_set(&mut updated, &action.path, &action.value) {
                return Ok(WriteOutcome::Rejected { reason });
            }
        }
        items.insert(key.clone(), updated);
        Ok(WriteOutcome::Applied)
    }

    async fn get(&self, key: &AssetKey) -> StoreResult<Option<AttrMap>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn backend_type(&self) -> StateBackend {
        StateBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AssetKey {
        AssetKey::new("owner-1", "asset-1").unwrap()
    }

    fn item_with_progress() -> AttrMap {
        let mut item = AttrMap::new();
        let mut progress = AttrMap::new();
        progress.insert("upload".to_string(), AttrValue::Bool(false));
        item.insert("progress".to_string(), AttrValue::Map(progress));
        item
    }

    #[tokio::test]
    async fn test_put_if_absent_only_once() {
        let store = MemoryStore::new();
        let first = store.put_if_absent(&key(), item_with_progress()).await.unwrap();
        let second = store.put_if_absent(&key(), AttrMap::new()).await.unwrap();

        assert_eq!(first, WriteOutcome::Applied);
        assert_eq!(second, WriteOutcome::ConditionFailed);

        let stored = store.get(&key()).await.unwrap().unwrap();
        assert!(stored.contains_key("progress"));
        assert_eq!(
            stored.get(OWNER_ID_ATTR),
            Some(&AttrValue::Str("owner-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_nested_update_on_missing_item_rejected() {
        let store = MemoryStore::new();
        let request = UpdateRequest::new()
            .set(["progress", "upload"], true)
            .unwrap();

        let outcome = store.update(&key(), &request).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_request_changes_nothing() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), item_with_progress()).await.unwrap();

        let request = UpdateRequest::new()
            .set(["progress", "upload"], true)
            .unwrap()
            .set(["metadata", "technical"], AttrValue::empty_map())
            .unwrap();

        let outcome = store.update(&key(), &request).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { .. }));

        let stored = store.get(&key()).await.unwrap().unwrap();
        let progress = stored["progress"].as_map().unwrap();
        assert_eq!(progress["upload"], AttrValue::Bool(false));
    }

    #[tokio::test]
    async fn test_key_attributes_are_immutable() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), item_with_progress()).await.unwrap();

        let request = UpdateRequest::new().set([OWNER_ID_ATTR], "someone-else").unwrap();
        let outcome = store.update(&key(), &request).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { ref reason } if reason.contains("part of the key")));
    }

    #[tokio::test]
    async fn test_out_of_range_number_rejected() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), item_with_progress()).await.unwrap();

        let huge = UpdateRequest::new()
            .set(["progress", "score"], AttrValue::Num("1e300".to_string()))
            .unwrap();
        let outcome = store.update(&key(), &huge).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { .. }));

        let precise = UpdateRequest::new()
            .set(
                ["progress", "score"],
                AttrValue::Num("1.000000000000000000000000000000000000001".to_string()),
            )
            .unwrap();
        let outcome = store.update(&key(), &precise).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { .. }));

        let stored = store.get(&key()).await.unwrap().unwrap();
        assert!(!stored["progress"].as_map().unwrap().contains_key("score"));
    }

    #[tokio::test]
    async fn test_numbers_within_limits_accepted() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), item_with_progress()).await.unwrap();

        for number in ["0", "-12.5", "1e125", "1e-130", "12345678901234567890123456789012345678"] {
            let request = UpdateRequest::new()
                .set(["progress", "score"], AttrValue::Num(number.to_string()))
                .unwrap();
            assert!(
                store.update(&key(), &request).await.unwrap().is_applied(),
                "{} should be accepted",
                number
            );
        }
    }

    #[tokio::test]
    async fn test_empty_map_key_rejected() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), item_with_progress()).await.unwrap();

        let mut nested = AttrMap::new();
        nested.insert(String::new(), AttrValue::Num("1".to_string()));
        let request = UpdateRequest::new()
            .set(["progress", "extra"], AttrValue::Map(nested.clone()))
            .unwrap();
        let outcome = store.update(&key(), &request).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { .. }));

        let mut item = AttrMap::new();
        item.insert("extra".to_string(), AttrValue::Map(nested));
        let other = AssetKey::new("owner-1", "asset-2").unwrap();
        let outcome = store.put_if_absent(&other, item).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Rejected { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_len_survives_poisoned_lock() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), item_with_progress()).await.unwrap();

        let poisoner = store.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = poisoner.items.lock().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join()
        .is_err();

        assert!(panicked);
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert!(matches!(
            store.get(&key()).await,
            Err(StoreError::Backend { .. })
        ));
    }

    #[tokio::test]
    async fn test_top_level_set_creates_attribute() {
        let store = MemoryStore::new();
        store.put_if_absent(&key(), AttrMap::new()).await.unwrap();

        let request = UpdateRequest::new().set(["note"], "retry").unwrap();
        assert!(store.update(&key(), &request).await.unwrap().is_applied());

        let stored = store.get(&key()).await.unwrap().unwrap();
        assert_eq!(stored["note"].as_str(), Some("retry"));
    }
}
