//! Spares Sync - catalog synchronization tool

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use spares_common::logging::{init_logging, LogConfig, LogLevel};
use spares_sync::{
    stats::{CatalogStats, ExtraFieldStats, DEFAULT_ANALYSIS_LIMIT},
    store::{create_pool, health_check, DbConfig},
    table, HttpCatalogClient, HttpReportClient, PgRecordStore, PipelineOptions, RecordStore,
    SyncConfig, SyncPipeline,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "spares-sync")]
#[command(author, version, about = "Spare-parts catalog sync and audit tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: upstream to store to report
    Sync,

    /// Fetch the upstream catalog into the store
    Pull,

    /// Publish the stored catalog to the report API
    Push,

    /// Read the results artifact from the report API
    Results,

    /// Show audit history of one spare, most recent first
    History {
        /// Spare code
        code: String,

        /// Maximum entries to return
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show audit history across all spares
    HistoryAll {
        /// Maximum entries to return
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Count stored spares by status and type
    Stats,

    /// Analyze extra fields carried by stored spares
    ExtraFields {
        /// Records to analyze
        #[arg(short, long, default_value_t = DEFAULT_ANALYSIS_LIMIT)]
        limit: usize,
    },

    /// Print the table that would be published
    Render {
        /// Append a column per discovered extra field
        #[arg(long)]
        all_fields: bool,
    },

    /// Apply database migrations
    Migrate,
}

type Pipeline = SyncPipeline<HttpCatalogClient, PgRecordStore, HttpReportClient>;

fn pipeline(config: &SyncConfig, store: PgRecordStore) -> Result<Pipeline> {
    Ok(SyncPipeline::new(
        HttpCatalogClient::new(&config.upstream, &config.tenant_id)?,
        store,
        HttpReportClient::new(&config.report, &config.tenant_id)?,
        PipelineOptions::from(&config.pipeline),
    ))
}

async fn migrate(database: &DbConfig) -> Result<()> {
    let pool = create_pool(database).await?;
    health_check(&pool).await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("spares-sync")
        .filter_directives("sqlx=warn,hyper=info,reqwest=info")
        .build()
        .overlay_env()?;

    let _guard = init_logging(&log_config)?;

    // Migrations need the database only, not the tenant or remote endpoints
    let command = match cli.command {
        Command::Migrate => return migrate(&DbConfig::load()?).await,
        command => command,
    };

    let config = SyncConfig::load()?;
    let pool = create_pool(&config.database).await?;
    health_check(&pool).await?;

    let store = PgRecordStore::new(pool);

    match command {
        Command::Migrate => migrate(&config.database).await,
        Command::History { code, limit } => print_json(&store.get_history(&code, limit).await?),
        Command::HistoryAll { limit } => print_json(&store.get_all_history(limit).await?),
        Command::Stats => print_json(&CatalogStats::from_records(&store.get_all().await?)),
        Command::ExtraFields { limit } => {
            print_json(&ExtraFieldStats::from_records(&store.get_all().await?, limit))
        },
        Command::Render { all_fields } => {
            let records = store.get_all().await?;
            let separator = &config.pipeline.csv_separator;
            let text = if all_fields {
                table::render_with_all_fields(&records, separator)
            } else {
                table::render_default(&records, separator)
            };
            println!("{}", text);
            Ok(())
        },
        Command::Sync => print_json(&pipeline(&config, store)?.run_full_sync().await?),
        Command::Pull => print_json(&pipeline(&config, store)?.sync_upstream_to_store().await?),
        Command::Push => print_json(&pipeline(&config, store)?.sync_store_to_report().await?),
        Command::Results => print_json(&pipeline(&config, store)?.fetch_results().await?),
    }
}
