//! Error types module
//!
//! All failures raised by the pipeline state store are unified under
//! [`StoreError`]. Soft failures (creation conflicts, backend rejections) are
//! never represented here: the store reports those as a `false` result. What
//! remains is caller misuse, which is detected before any network call, and
//! hard faults whose outcome is genuinely unknown.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for programming mistakes surfaced to the caller
    Debug,
    /// Warning level - for malformed data that was read back
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown metadata category: {0}")]
    UnknownCategory(String),

    #[error("Unknown pipeline stage: {0}")]
    UnknownStage(String),

    #[error("Invalid asset key: {0}")]
    InvalidKey(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to decode stored record: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for state store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Wrap a hard fault raised by the backend client.
    pub fn backend(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            StoreError::UnknownStage(_) => "UNKNOWN_STAGE",
            StoreError::InvalidKey(_) => "INVALID_KEY",
            StoreError::InvalidPath(_) => "INVALID_PATH",
            StoreError::Backend { .. } => "BACKEND_ERROR",
            StoreError::Decode(_) => "DECODE_ERROR",
            StoreError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Caller misuse: a programming defect that no retry can fix.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownCategory(_)
                | StoreError::UnknownStage(_)
                | StoreError::InvalidKey(_)
                | StoreError::InvalidPath(_)
        )
    }

    /// Whether the orchestrator may retry the operation.
    ///
    /// Only hard faults qualify; the store itself never retries.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Backend { .. })
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            StoreError::UnknownCategory(_)
            | StoreError::UnknownStage(_)
            | StoreError::InvalidKey(_)
            | StoreError::InvalidPath(_) => LogLevel::Debug,
            StoreError::Decode(_) => LogLevel::Warn,
            StoreError::Backend { .. } | StoreError::Config(_) => LogLevel::Error,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(format!("JSON error: {}", err))
    }
}

impl From<chrono::ParseError> for StoreError {
    fn from(err: chrono::ParseError) -> Self {
        StoreError::Decode(format!("Invalid timestamp: {}", err))
    }
}
