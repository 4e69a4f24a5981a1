//! DynamoDB document store
//!
//! ## Table Schema
//! ```text
//! Partition Key: ownerId (S)
//! Sort Key:      assetId (S)
//! Billing:       PAY_PER_REQUEST
//! ```
//!
//! Creation is a `PutItem` guarded by `attribute_not_exists` on both key
//! attributes; partial updates are a single `UpdateItem` with a `SET`
//! expression whose names and values are always passed as placeholders
//! (`#n0`, `:v0`), since attribute names such as `metadata` collide with
//! DynamoDB reserved words.

use crate::traits::{DocumentStore, UpdateRequest, WriteOutcome};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use mediatrack_core::models::{ASSET_ID_ATTR, OWNER_ID_ATTR};
use mediatrack_core::{AssetKey, AttrMap, AttrValue, StateBackend, StoreError, StoreResult};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};

const TABLE_ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const TABLE_ACTIVE_MAX_ATTEMPTS: u32 = 60;

/// Service error codes that mean the caller's identity or credentials are
/// wrong. The request outcome is unknown to the orchestrator, so they are
/// surfaced as hard faults instead of a `false` result.
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "MissingAuthenticationTokenException",
    "InvalidSignatureException",
    "IncompleteSignatureException",
    "ExpiredTokenException",
    "InvalidClientTokenId",
];

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// DynamoDB-backed document store
#[derive(Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
}

impl DynamoDbStore {
    /// Create a new DynamoDbStore instance
    ///
    /// # Arguments
    /// * `table_name` - Table holding one item per asset
    /// * `region` - AWS region (e.g. "us-east-1")
    /// * `endpoint_url` - Optional endpoint override, e.g. "http://localhost:8000"
    ///   for DynamoDB Local
    pub async fn new(
        table_name: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StoreResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()));

        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);

        tracing::debug!(
            table_name = %table_name,
            region = %region,
            "DynamoDB state store initialized"
        );

        Ok(Self::from_client(client, table_name))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table if it does not exist, then wait until it is active.
    #[tracing::instrument(skip(self), fields(db.table = %self.table_name))]
    pub async fn ensure_table(&self) -> StoreResult<()> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!("DynamoDB table already exists");
                return self.wait_for_table_active().await;
            }
            Err(SdkError::ServiceError(service))
                if service.err().is_resource_not_found_exception() => {}
            Err(e) => return Err(StoreError::backend("DescribeTable failed", e)),
        }

        tracing::info!("Creating DynamoDB state table");

        let key_schema = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .map_err(|e| StoreError::Config(format!("Failed to build key schema: {}", e)))
        };
        let attribute = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| {
                    StoreError::Config(format!("Failed to build attribute definition: {}", e))
                })
        };

        let result = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(BillingMode::PayPerRequest)
            .key_schema(key_schema(OWNER_ID_ATTR, KeyType::Hash)?)
            .key_schema(key_schema(ASSET_ID_ATTR, KeyType::Range)?)
            .attribute_definitions(attribute(OWNER_ID_ATTR)?)
            .attribute_definitions(attribute(ASSET_ID_ATTR)?)
            .send()
            .await;

        match result {
            Ok(_) => tracing::info!("DynamoDB state table created"),
            Err(SdkError::ServiceError(service)) if service.err().is_resource_in_use_exception() => {
                tracing::debug!("Table created concurrently, waiting for active");
            }
            Err(e) => return Err(StoreError::backend("CreateTable failed", e)),
        }

        self.wait_for_table_active().await
    }

    async fn wait_for_table_active(&self) -> StoreResult<()> {
        for attempt in 1..=TABLE_ACTIVE_MAX_ATTEMPTS {
            let output = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(|e| StoreError::backend("DescribeTable failed", e))?;

            let status = output.table().and_then(|t| t.table_status());
            if matches!(status, Some(TableStatus::Active)) {
                return Ok(());
            }

            tracing::debug!(attempt, status = ?status, "Waiting for DynamoDB table to become active");
            tokio::time::sleep(TABLE_ACTIVE_POLL_INTERVAL).await;
        }

        Err(StoreError::Config(format!(
            "DynamoDB table {} did not become active",
            self.table_name
        )))
    }

    fn key_attributes(key: &AssetKey) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                OWNER_ID_ATTR.to_string(),
                AttributeValue::S(key.owner_id.clone()),
            ),
            (
                ASSET_ID_ATTR.to_string(),
                AttributeValue::S(key.asset_id.clone()),
            ),
        ])
    }
}

/// Convert a tagged value into the SDK's attribute type.
pub fn to_attribute_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Null => AttributeValue::Null(true),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Num(n) => AttributeValue::N(n.clone()),
        AttrValue::Str(s) => AttributeValue::S(s.clone()),
        AttrValue::Map(fields) => AttributeValue::M(to_item(fields)),
    }
}

pub fn to_item(fields: &AttrMap) -> HashMap<String, AttributeValue> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), to_attribute_value(value)))
        .collect()
}

/// Convert an SDK attribute back into a tagged value.
///
/// Only the types this store writes are accepted; sets, lists and binary
/// values are a decode error.
pub fn from_attribute_value(value: &AttributeValue) -> StoreResult<AttrValue> {
    match value {
        AttributeValue::Null(_) => Ok(AttrValue::Null),
        AttributeValue::Bool(b) => Ok(AttrValue::Bool(*b)),
        AttributeValue::N(n) => Ok(AttrValue::Num(n.clone())),
        AttributeValue::S(s) => Ok(AttrValue::Str(s.clone())),
        AttributeValue::M(fields) => Ok(AttrValue::Map(from_item(fields)?)),
        other => Err(StoreError::Decode(format!(
            "unsupported DynamoDB attribute type: {:?}",
            other
        ))),
    }
}

pub fn from_item(fields: &HashMap<String, AttributeValue>) -> StoreResult<AttrMap> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), from_attribute_value(value)?)))
        .collect()
}

/// `UpdateItem` parameters rendered from an [`UpdateRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedUpdate {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// Render a `SET` expression. Each distinct path segment gets one `#nN`
/// placeholder; each value gets its own `:vN`.
pub fn render_update(request: &UpdateRequest) -> StoreResult<RenderedUpdate> {
    if request.is_empty() {
        return Err(StoreError::InvalidPath(
            "update request has no actions".to_string(),
        ));
    }

    let mut placeholders: HashMap<&str, String> = HashMap::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut clauses = Vec::with_capacity(request.actions().len());

    for (index, action) in request.actions().iter().enumerate() {
        let path = action
            .path
            .iter()
            .map(|segment| {
                let next = placeholders.len();
                placeholders
                    .entry(segment.as_str())
                    .or_insert_with(|| {
                        let placeholder = format!("#n{}", next);
                        names.insert(placeholder.clone(), segment.clone());
                        placeholder
                    })
                    .clone()
            })
            .collect::<Vec<_>>()
            .join(".");

        let value_placeholder = format!(":v{}", index);
        values.insert(value_placeholder.clone(), to_attribute_value(&action.value));
        clauses.push(format!("{} = {}", path, value_placeholder));
    }

    Ok(RenderedUpdate {
        expression: format!("SET {}", clauses.join(", ")),
        names,
        values,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    ConditionFailed,
    Rejected,
    HardFault,
}

fn classify_service_code(code: Option<&str>) -> ErrorClass {
    match code {
        Some(CONDITIONAL_CHECK_FAILED) => ErrorClass::ConditionFailed,
        Some(code) if AUTH_ERROR_CODES.contains(&code) => ErrorClass::HardFault,
        _ => ErrorClass::Rejected,
    }
}

/// Map an SDK error from a write into an outcome or a hard fault.
///
/// Service responses (conflicts, validation, throttling) are outcomes; a
/// request that never got a usable response (dispatch, timeout, construction,
/// unparseable response) or was refused for credentials is a hard fault.
fn write_outcome_from_error<E, R>(operation: &str, err: SdkError<E, R>) -> StoreResult<WriteOutcome>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let classified = match &err {
        SdkError::ServiceError(service) => {
            let code = service.err().code();
            let reason = format!(
                "{}: {}",
                code.unwrap_or("UnknownError"),
                service.err().message().unwrap_or("no message")
            );
            Some((classify_service_code(code), reason))
        }
        _ => None,
    };

    match classified {
        Some((ErrorClass::ConditionFailed, _)) => Ok(WriteOutcome::ConditionFailed),
        Some((ErrorClass::Rejected, reason)) => Ok(WriteOutcome::Rejected { reason }),
        _ => Err(StoreError::backend(format!("{} failed", operation), err)),
    }
}

#[async_trait]
impl DocumentStore for DynamoDbStore {
    #[tracing::instrument(skip(self, item), fields(db.table = %self.table_name))]
    async fn put_if_absent(&self, key: &AssetKey, item: AttrMap) -> StoreResult<WriteOutcome> {
        let start = Instant::now();
        let mut attributes = to_item(&item);
        attributes.extend(Self::key_attributes(key));

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(attributes))
            .condition_expression("attribute_not_exists(#owner) AND attribute_not_exists(#asset)")
            .expression_attribute_names("#owner", OWNER_ID_ATTR)
            .expression_attribute_names("#asset", ASSET_ID_ATTR)
            .send()
            .await;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(_) => {
                tracing::debug!(duration_ms, "DynamoDB PutItem applied");
                Ok(WriteOutcome::Applied)
            }
            Err(e) => write_outcome_from_error("PutItem", e).inspect_err(|err| {
                tracing::error!(error = %err, duration_ms, "DynamoDB PutItem failed");
            }),
        }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(db.table = %self.table_name, paths = %request.describe())
    )]
    async fn update(&self, key: &AssetKey, request: &UpdateRequest) -> StoreResult<WriteOutcome> {
        let rendered = render_update(request)?;
        let start = Instant::now();

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_attributes(key)))
            .update_expression(rendered.expression)
            .set_expression_attribute_names(Some(rendered.names))
            .set_expression_attribute_values(Some(rendered.values))
            .send()
            .await;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(_) => {
                tracing::debug!(duration_ms, "DynamoDB UpdateItem applied");
                Ok(WriteOutcome::Applied)
            }
            Err(e) => write_outcome_from_error("UpdateItem", e).inspect_err(|err| {
                tracing::error!(error = %err, duration_ms, "DynamoDB UpdateItem failed");
            }),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.table_name))]
    async fn get(&self, key: &AssetKey) -> StoreResult<Option<AttrMap>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_attributes(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "DynamoDB GetItem failed");
                StoreError::backend("GetItem failed", e)
            })?;

        output.item().map(from_item).transpose()
    }

    fn backend_type(&self) -> StateBackend {
        StateBackend::DynamoDb
    }
}
