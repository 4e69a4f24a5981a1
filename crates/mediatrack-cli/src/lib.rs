use anyhow::Context;
use mediatrack_core::LogFormat;
use serde_json::Value as JsonValue;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "mediatrack=info";

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays valid JSON.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Parse a `true`/`false` command-line flag value.
pub fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow::anyhow!(
            "expected true or false, got '{}'",
            other
        )),
    }
}

/// Parse a metadata payload. Categories hold JSON objects.
pub fn parse_metadata_payload(text: &str) -> anyhow::Result<JsonValue> {
    let value: JsonValue = serde_json::from_str(text).context("Metadata payload is not valid JSON")?;
    if !value.is_object() {
        return Err(anyhow::anyhow!("Metadata payload must be a JSON object"));
    }
    Ok(value)
}
