use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// State backend types
///
/// Defined in core because it is used by configuration and by the store
/// factory alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StateBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dynamodb" | "ddb" => Ok(StateBackend::DynamoDb),
            "memory" => Ok(StateBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid state backend: {}", s)),
        }
    }
}

impl Display for StateBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StateBackend::DynamoDb => write!(f, "dynamodb"),
            StateBackend::Memory => write!(f, "memory"),
        }
    }
}
