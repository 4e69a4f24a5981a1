//! Document store abstraction
//!
//! The backing key-value store addressed by `(ownerId, assetId)`. Every
//! method is one atomic request; implementations must not split a call into
//! several round trips.

use async_trait::async_trait;
use mediatrack_core::{AssetKey, AttrMap, AttrValue, StateBackend, StoreError, StoreResult};

/// Result of a write that reached the backend.
///
/// Hard faults (network, credentials, unknown outcome) are not outcomes;
/// they are returned as `Err(StoreError::Backend)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was committed.
    Applied,
    /// The write's guard did not hold (e.g. the key already exists).
    ConditionFailed,
    /// The backend answered with a non-success status.
    Rejected {
        /// Backend-provided description of the rejection.
        reason: String,
    },
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// One `SET path = value` action.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAction {
    pub path: Vec<String>,
    pub value: AttrValue,
}

/// Partial update: path-addressed `SET` actions applied atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    actions: Vec<SetAction>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `SET` action. The path needs at least one non-empty segment.
    pub fn set<I, S>(mut self, path: I, value: impl Into<AttrValue>) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        if path.is_empty() || path.iter().any(|segment| segment.is_empty()) {
            return Err(StoreError::InvalidPath(format!(
                "update path '{}' is empty or has an empty segment",
                path.join(".")
            )));
        }
        self.actions.push(SetAction {
            path,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn actions(&self) -> &[SetAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Dotted paths touched by this request, for logs.
    pub fn describe(&self) -> String {
        self.actions
            .iter()
            .map(|action| action.path.join("."))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Backing store contract
///
/// All state backends (DynamoDB, in-process memory) implement this trait so
/// the pipeline state store works with any of them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create `item` under `key` only if no item exists there yet.
    ///
    /// An existing item yields [`WriteOutcome::ConditionFailed`] and is left
    /// untouched.
    async fn put_if_absent(&self, key: &AssetKey, item: AttrMap) -> StoreResult<WriteOutcome>;

    /// Apply every action of `request` to the item under `key`, atomically.
    ///
    /// No existence check is made; whether an update to a missing item is
    /// rejected follows the backend's own semantics.
    async fn update(&self, key: &AssetKey, request: &UpdateRequest) -> StoreResult<WriteOutcome>;

    /// Strongly consistent read of the whole item.
    async fn get(&self, key: &AssetKey) -> StoreResult<Option<AttrMap>>;

    /// Get the state backend type
    fn backend_type(&self) -> StateBackend;
}
