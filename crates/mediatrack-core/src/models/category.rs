use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::StoreError;

/// Addressable metadata sub-document, each owned by one processing stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataCategory {
    #[serde(rename = "validation.basic")]
    ValidationBasic,
    #[serde(rename = "validation.stream")]
    ValidationStream,
    #[serde(rename = "technical")]
    Technical,
    #[serde(rename = "quality")]
    Quality,
    #[serde(rename = "content")]
    Content,
}

impl MetadataCategory {
    pub const ALL: [MetadataCategory; 5] = [
        MetadataCategory::ValidationBasic,
        MetadataCategory::ValidationStream,
        MetadataCategory::Technical,
        MetadataCategory::Quality,
        MetadataCategory::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataCategory::ValidationBasic => "validation.basic",
            MetadataCategory::ValidationStream => "validation.stream",
            MetadataCategory::Technical => "technical",
            MetadataCategory::Quality => "quality",
            MetadataCategory::Content => "content",
        }
    }
}

impl Display for MetadataCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetadataCategory {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetadataCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| StoreError::UnknownCategory(s.to_string()))
    }
}
