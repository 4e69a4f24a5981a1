use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::StoreError;

/// One named phase of asset processing, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Upload,
    Validation,
    Metadata,
    GopCreation,
    Transcoding,
    Completion,
    Distribution,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        PipelineStage::Upload,
        PipelineStage::Validation,
        PipelineStage::Metadata,
        PipelineStage::GopCreation,
        PipelineStage::Transcoding,
        PipelineStage::Completion,
        PipelineStage::Distribution,
    ];

    /// Attribute name of this stage's flag inside `progress`.
    pub fn attribute_name(&self) -> &'static str {
        match self {
            PipelineStage::Upload => "upload",
            PipelineStage::Validation => "validation",
            PipelineStage::Metadata => "metadata",
            PipelineStage::GopCreation => "gopCreation",
            PipelineStage::Transcoding => "transcoding",
            PipelineStage::Completion => "completion",
            PipelineStage::Distribution => "distribution",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.attribute_name())
    }
}

impl FromStr for PipelineStage {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.attribute_name() == s)
            .ok_or_else(|| StoreError::UnknownStage(s.to_string()))
    }
}
