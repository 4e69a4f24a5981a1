//! Configuration module
//!
//! Environment-driven settings for the state store: which backend to use,
//! where the DynamoDB table lives, and how logs are rendered.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::backend_types::StateBackend;

const DEFAULT_TABLE_NAME: &str = "asset-state";
const DEFAULT_ENVIRONMENT: &str = "development";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// State store configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub state_backend: StateBackend,
    pub table_name: String,
    pub dynamodb_region: Option<String>,
    // Custom endpoint for DynamoDB Local or other compatible services
    pub dynamodb_endpoint: Option<String>,
    pub auto_create_table: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let state_backend = match lookup("STATE_BACKEND") {
            Some(value) => value.parse()?,
            None => StateBackend::DynamoDb,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        let config = Config {
            environment,
            state_backend,
            table_name: lookup("STATE_TABLE_NAME")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            dynamodb_region: lookup("DYNAMODB_REGION")
                .or_else(|| lookup("AWS_REGION"))
                .filter(|s| !s.is_empty()),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT").filter(|s| !s.is_empty()),
            auto_create_table: lookup("STATE_AUTO_CREATE_TABLE")
                .unwrap_or_else(|| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.state_backend {
            StateBackend::DynamoDb => {
                if self.table_name.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STATE_TABLE_NAME must not be empty when using the DynamoDB backend"
                    ));
                }
                if self.dynamodb_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "DYNAMODB_REGION or AWS_REGION must be set when using the DynamoDB backend"
                    ));
                }
            }
            StateBackend::Memory => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "STATE_BACKEND=memory is not durable and cannot be used in production"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_region() {
        let config = load(&[("AWS_REGION", "eu-west-1")]).unwrap();
        assert_eq!(config.state_backend, StateBackend::DynamoDb);
        assert_eq!(config.table_name, "asset-state");
        assert_eq!(config.dynamodb_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.dynamodb_endpoint, None);
        assert!(!config.auto_create_table);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.is_production());
    }

    #[test]
    fn test_dynamodb_region_takes_precedence() {
        let config = load(&[
            ("AWS_REGION", "eu-west-1"),
            ("DYNAMODB_REGION", "us-east-2"),
            ("DYNAMODB_ENDPOINT", "http://localhost:8000"),
            ("STATE_AUTO_CREATE_TABLE", "TRUE"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.dynamodb_region.as_deref(), Some("us-east-2"));
        assert_eq!(
            config.dynamodb_endpoint.as_deref(),
            Some("http://localhost:8000")
        );
        assert!(config.auto_create_table);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_dynamodb_requires_region() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("AWS_REGION"));
    }

    #[test]
    fn test_memory_backend_needs_no_region() {
        let config = load(&[("STATE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.state_backend, StateBackend::Memory);
    }

    #[test]
    fn test_memory_backend_refused_in_production() {
        let err = load(&[("STATE_BACKEND", "memory"), ("ENVIRONMENT", "prod")]).unwrap_err();
        assert!(err.to_string().contains("production"));
    }

    #[test]
    fn test_invalid_backend_rejected() {
        assert!(load(&[("STATE_BACKEND", "postgres")]).is_err());
    }
}
