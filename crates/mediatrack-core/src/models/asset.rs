//! Asset record schema
//!
//! One document per asset, keyed by `(ownerId, assetId)`:
//!
//! ```text
//! ownerId, assetId, createdAt,
//! metadata { validation { basic, stream }, technical, quality, content },
//! progress { upload, validation, metadata, gopCreation, transcoding,
//!            completion, distribution, hasCriticalFailure, updatedAt }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::attribute::{decode, AttrMap, AttrValue};
use crate::error::{StoreError, StoreResult};
use crate::models::{MetadataCategory, PipelineStage};

pub const OWNER_ID_ATTR: &str = "ownerId";
pub const ASSET_ID_ATTR: &str = "assetId";
pub const CREATED_AT_ATTR: &str = "createdAt";
pub const METADATA_ATTR: &str = "metadata";
pub const PROGRESS_ATTR: &str = "progress";
pub const UPDATED_AT_ATTR: &str = "updatedAt";
pub const CRITICAL_FAILURE_ATTR: &str = "hasCriticalFailure";

/// Render a timestamp the way it is persisted: RFC 3339, UTC, milliseconds.
///
/// Fixed-width output keeps stored timestamps lexicographically ordered.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(text: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

/// Composite identity of an asset record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetKey {
    pub owner_id: String,
    pub asset_id: String,
}

impl AssetKey {
    /// Build a key, rejecting empty components.
    pub fn new(owner_id: impl Into<String>, asset_id: impl Into<String>) -> StoreResult<Self> {
        let owner_id = owner_id.into();
        let asset_id = asset_id.into();
        if owner_id.trim().is_empty() {
            return Err(StoreError::InvalidKey("ownerId must not be empty".to_string()));
        }
        if asset_id.trim().is_empty() {
            return Err(StoreError::InvalidKey("assetId must not be empty".to_string()));
        }
        Ok(Self { owner_id, asset_id })
    }

    /// Key attributes as they appear on the stored item.
    pub fn to_item(&self) -> AttrMap {
        let mut item = AttrMap::new();
        item.insert(OWNER_ID_ATTR.to_string(), AttrValue::Str(self.owner_id.clone()));
        item.insert(ASSET_ID_ATTR.to_string(), AttrValue::Str(self.asset_id.clone()));
        item
    }
}

/// Validation sub-tree of the metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetadata {
    pub basic: JsonValue,
    pub stream: JsonValue,
}

/// Stage-discovered facts about an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub validation: ValidationMetadata,
    pub technical: JsonValue,
    pub quality: JsonValue,
    pub content: JsonValue,
}

impl AssetMetadata {
    /// Leaf for a category.
    pub fn get(&self, category: MetadataCategory) -> &JsonValue {
        match category {
            MetadataCategory::ValidationBasic => &self.validation.basic,
            MetadataCategory::ValidationStream => &self.validation.stream,
            MetadataCategory::Technical => &self.technical,
            MetadataCategory::Quality => &self.quality,
            MetadataCategory::Content => &self.content,
        }
    }

    fn from_attr(metadata: &AttrMap) -> StoreResult<Self> {
        let validation = match metadata.get("validation") {
            None => AttrMap::new(),
            Some(AttrValue::Map(m)) => m.clone(),
            Some(other) => {
                return Err(StoreError::Decode(format!(
                    "metadata.validation must be a map, found {}",
                    other.type_tag()
                )))
            }
        };

        Ok(Self {
            validation: ValidationMetadata {
                basic: leaf(&validation, "basic"),
                stream: leaf(&validation, "stream"),
            },
            technical: leaf(metadata, "technical"),
            quality: leaf(metadata, "quality"),
            content: leaf(metadata, "content"),
        })
    }
}

// Leaves that were never written read back as empty objects.
fn leaf(parent: &AttrMap, name: &str) -> JsonValue {
    parent
        .get(name)
        .map(decode)
        .unwrap_or_else(|| JsonValue::Object(JsonMap::new()))
}

/// Per-stage progress flags plus the critical failure alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProgress {
    pub upload: bool,
    pub validation: bool,
    pub metadata: bool,
    pub gop_creation: bool,
    pub transcoding: bool,
    pub completion: bool,
    pub distribution: bool,
    pub has_critical_failure: bool,
    pub updated_at: DateTime<Utc>,
}

impl AssetProgress {
    pub fn flag(&self, stage: PipelineStage) -> bool {
        match stage {
            PipelineStage::Upload => self.upload,
            PipelineStage::Validation => self.validation,
            PipelineStage::Metadata => self.metadata,
            PipelineStage::GopCreation => self.gop_creation,
            PipelineStage::Transcoding => self.transcoding,
            PipelineStage::Completion => self.completion,
            PipelineStage::Distribution => self.distribution,
        }
    }

    /// Stages whose flag is currently set, in pipeline order.
    pub fn completed_stages(&self) -> Vec<PipelineStage> {
        PipelineStage::ALL
            .into_iter()
            .filter(|stage| self.flag(*stage))
            .collect()
    }

    /// Progress document for a freshly initialized record: every flag false.
    pub fn initial_item(now: DateTime<Utc>) -> AttrMap {
        let mut progress: AttrMap = PipelineStage::ALL
            .into_iter()
            .map(|stage| (stage.attribute_name().to_string(), AttrValue::Bool(false)))
            .collect();
        progress.insert(CRITICAL_FAILURE_ATTR.to_string(), AttrValue::Bool(false));
        progress.insert(
            UPDATED_AT_ATTR.to_string(),
            AttrValue::Str(format_timestamp(now)),
        );
        progress
    }

    fn from_attr(progress: &AttrMap) -> StoreResult<Self> {
        let flag = |name: &str| -> StoreResult<bool> {
            match progress.get(name) {
                None => Ok(false),
                Some(AttrValue::Bool(b)) => Ok(*b),
                Some(other) => Err(StoreError::Decode(format!(
                    "progress.{} must be a boolean, found {}",
                    name,
                    other.type_tag()
                ))),
            }
        };

        Ok(Self {
            upload: flag(PipelineStage::Upload.attribute_name())?,
            validation: flag(PipelineStage::Validation.attribute_name())?,
            metadata: flag(PipelineStage::Metadata.attribute_name())?,
            gop_creation: flag(PipelineStage::GopCreation.attribute_name())?,
            transcoding: flag(PipelineStage::Transcoding.attribute_name())?,
            completion: flag(PipelineStage::Completion.attribute_name())?,
            distribution: flag(PipelineStage::Distribution.attribute_name())?,
            has_critical_failure: flag(CRITICAL_FAILURE_ATTR)?,
            updated_at: parse_timestamp(required_str(progress, UPDATED_AT_ATTR, "progress.")?)?,
        })
    }
}

/// The persisted document for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub owner_id: String,
    pub asset_id: String,
    pub created_at: DateTime<Utc>,
    pub metadata: AssetMetadata,
    pub progress: AssetProgress,
}

impl AssetRecord {
    pub fn key(&self) -> AssetKey {
        AssetKey {
            owner_id: self.owner_id.clone(),
            asset_id: self.asset_id.clone(),
        }
    }

    /// Decode a stored item. Anything that does not fit the schema is a
    /// [`StoreError::Decode`].
    pub fn from_item(item: &AttrMap) -> StoreResult<Self> {
        Ok(Self {
            owner_id: required_str(item, OWNER_ID_ATTR, "")?.to_string(),
            asset_id: required_str(item, ASSET_ID_ATTR, "")?.to_string(),
            created_at: parse_timestamp(required_str(item, CREATED_AT_ATTR, "")?)?,
            metadata: AssetMetadata::from_attr(required_map(item, METADATA_ATTR)?)?,
            progress: AssetProgress::from_attr(required_map(item, PROGRESS_ATTR)?)?,
        })
    }
}

fn required_str<'a>(fields: &'a AttrMap, name: &str, prefix: &str) -> StoreResult<&'a str> {
    match fields.get(name) {
        Some(AttrValue::Str(s)) => Ok(s),
        Some(other) => Err(StoreError::Decode(format!(
            "{}{} must be a string, found {}",
            prefix,
            name,
            other.type_tag()
        ))),
        None => Err(StoreError::Decode(format!("{}{} is missing", prefix, name))),
    }
}

fn required_map<'a>(fields: &'a AttrMap, name: &str) -> StoreResult<&'a AttrMap> {
    match fields.get(name) {
        Some(AttrValue::Map(m)) => Ok(m),
        Some(other) => Err(StoreError::Decode(format!(
            "{} must be a map, found {}",
            name,
            other.type_tag()
        ))),
        None => Err(StoreError::Decode(format!("{} is missing", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::encode;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_item() -> AttrMap {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut item = AssetKey::new("u1", "a1").unwrap().to_item();
        item.insert(
            CREATED_AT_ATTR.to_string(),
            AttrValue::Str(format_timestamp(now)),
        );
        let metadata = encode(&json!({
            "validation": { "basic": {}, "stream": {} },
            "technical": { "codec": "h264" },
            "quality": {},
            "content": {}
        }));
        item.insert(METADATA_ATTR.to_string(), metadata);
        item.insert(
            PROGRESS_ATTR.to_string(),
            AttrValue::Map(AssetProgress::initial_item(now)),
        );
        item
    }

    #[test]
    fn test_asset_key_rejects_empty_parts() {
        assert!(matches!(
            AssetKey::new("", "a1"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            AssetKey::new("u1", "  "),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(AssetKey::new("u1", "a1").is_ok());
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(at), "2026-01-02T03:04:05.000Z");
        assert_eq!(parse_timestamp("2026-01-02T03:04:05.000Z").unwrap(), at);
    }

    #[test]
    fn test_decode_initial_record() {
        let record = AssetRecord::from_item(&sample_item()).unwrap();
        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.asset_id, "a1");
        assert_eq!(record.metadata.technical, json!({ "codec": "h264" }));
        assert_eq!(record.metadata.validation.basic, json!({}));
        assert!(record.progress.completed_stages().is_empty());
        assert!(!record.progress.has_critical_failure);
        assert_eq!(record.progress.updated_at, record.created_at);
    }

    #[test]
    fn test_missing_leaf_reads_as_empty_object() {
        let mut item = sample_item();
        item.insert(METADATA_ATTR.to_string(), AttrValue::empty_map());
        let record = AssetRecord::from_item(&item).unwrap();
        assert_eq!(record.metadata.get(MetadataCategory::Quality), &json!({}));
        assert_eq!(
            record.metadata.get(MetadataCategory::ValidationStream),
            &json!({})
        );
    }

    #[test]
    fn test_wrongly_typed_flag_is_decode_error() {
        let mut item = sample_item();
        let mut progress = AssetProgress::initial_item(Utc::now());
        progress.insert("upload".to_string(), AttrValue::Str("yes".to_string()));
        item.insert(PROGRESS_ATTR.to_string(), AttrValue::Map(progress));

        let err = AssetRecord::from_item(&item).unwrap_err();
        assert!(matches!(err, StoreError::Decode(ref msg) if msg.contains("progress.upload")));
    }

    #[test]
    fn test_missing_progress_is_decode_error() {
        let mut item = sample_item();
        item.remove(PROGRESS_ATTR);
        assert!(matches!(
            AssetRecord::from_item(&item),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_record_serializes_with_persisted_names() {
        let record = AssetRecord::from_item(&sample_item()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["progress"]["gopCreation"], false);
        assert_eq!(json["progress"]["hasCriticalFailure"], false);
    }
}
