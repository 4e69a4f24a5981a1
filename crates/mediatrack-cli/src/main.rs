//! Mediatrack CLI: drive the pipeline state store from the shell.
//!
//! Configuration comes from the environment (and `.env`): STATE_BACKEND,
//! STATE_TABLE_NAME, DYNAMODB_REGION or AWS_REGION, DYNAMODB_ENDPOINT.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediatrack_cli::{init_tracing, parse_flag, parse_metadata_payload};
use mediatrack_core::{Config, MetadataCategory, PipelineStage, StateBackend};
use mediatrack_store::{create_state_store, DynamoDbStore};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mediatrack", about = "Media pipeline state store CLI")]
struct Cli {
    /// Owner of the asset
    #[arg(long, global = true)]
    owner: Option<String>,
    /// Asset identifier
    #[arg(long, global = true)]
    asset: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the asset record (a new asset id is generated if --asset is omitted)
    Init,
    /// Replace one metadata category, e.g. `metadata technical '{"codec":"h264"}'`
    Metadata {
        /// Category: validation.basic, validation.stream, technical, quality, content
        category: MetadataCategory,
        /// JSON object to store
        data: String,
    },
    /// Set a stage completion flag
    Progress {
        /// Stage: upload, validation, metadata, gopCreation, transcoding, completion, distribution
        stage: PipelineStage,
        /// true or false
        value: String,
    },
    /// Set or clear the critical failure flag
    Fail {
        /// true or false
        value: String,
    },
    /// Print the current record
    Show,
    /// Create the DynamoDB table if it does not exist
    EnsureTable,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteReport<'a> {
    owner_id: &'a str,
    asset_id: &'a str,
    operation: &'static str,
    applied: bool,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--{} is required for this command", flag))
}

async fn ensure_table(config: &Config) -> anyhow::Result<()> {
    if config.state_backend != StateBackend::DynamoDb {
        anyhow::bail!("ensure-table requires STATE_BACKEND=dynamodb");
    }
    let region = config
        .dynamodb_region
        .clone()
        .context("DYNAMODB_REGION or AWS_REGION not configured")?;
    let store = DynamoDbStore::new(
        config.table_name.clone(),
        region,
        config.dynamodb_endpoint.clone(),
    )
    .await?;
    store.ensure_table().await?;
    print_json(&serde_json::json!({
        "table": store.table_name(),
        "ready": true,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    if let Commands::EnsureTable = cli.command {
        return ensure_table(&config).await;
    }

    let store = create_state_store(&config).await?;
    let owner_id = required(&cli.owner, "owner")?;

    match cli.command {
        Commands::Init => {
            let asset_id = cli
                .asset
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let applied = store.initialize_record(owner_id, &asset_id).await?;
            print_json(&WriteReport {
                owner_id,
                asset_id: &asset_id,
                operation: "init",
                applied,
            })?;
        }
        Commands::Metadata { category, data } => {
            let asset_id = required(&cli.asset, "asset")?;
            let data = parse_metadata_payload(&data)?;
            let applied = store
                .update_metadata(owner_id, asset_id, category, &data)
                .await?;
            print_json(&WriteReport {
                owner_id,
                asset_id,
                operation: "metadata",
                applied,
            })?;
        }
        Commands::Progress { stage, value } => {
            let asset_id = required(&cli.asset, "asset")?;
            let applied = store
                .update_progress(owner_id, asset_id, stage, parse_flag(&value)?)
                .await?;
            print_json(&WriteReport {
                owner_id,
                asset_id,
                operation: "progress",
                applied,
            })?;
        }
        Commands::Fail { value } => {
            let asset_id = required(&cli.asset, "asset")?;
            let applied = store
                .mark_critical_failure(owner_id, asset_id, parse_flag(&value)?)
                .await?;
            print_json(&WriteReport {
                owner_id,
                asset_id,
                operation: "fail",
                applied,
            })?;
        }
        Commands::Show => {
            let asset_id = required(&cli.asset, "asset")?;
            let record = store.get_record(owner_id, asset_id).await?;
            print_json(&record)?;
        }
        Commands::EnsureTable => ensure_table(&config).await?,
    }

    Ok(())
}
