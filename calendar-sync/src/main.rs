use anyhow::Context;
use calendar_sync::{
    db::{self, PgSyncStore},
    expand::Horizon,
    preview_feed, DatabaseConfig, HttpFeedFetcher, PgSyncEngine, SyncConfig, SyncScheduler,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::{SyncResult, SyncSummary};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "calendar-sync")]
#[command(about = "Import blocked dates from external iCalendar feeds")]
#[command(
    long_about = "Operator tool for the external calendar sync engine.\n\n\
    Runs the recurring batch sync, triggers one-off syncs for a property or a\n\
    single connection, and previews what a feed URL would block without\n\
    writing anything."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduled batch sync until interrupted
    ///
    /// The first batch starts immediately, then repeats every
    /// CALENDAR_SYNC_INTERVAL_SECS seconds.
    Run,

    /// Sync every connection attached to a property, once
    SyncAll,

    /// Sync all connections of one property
    SyncProperty {
        /// The property UUID.
        property_id: Uuid,
    },

    /// Sync a single connection
    SyncConnection {
        /// The calendar connection UUID.
        connection_id: Uuid,
    },

    /// Fetch and parse a feed and show the nights it would block
    ///
    /// Does not need a database.
    Preview {
        /// Feed URL (http, https or webcal).
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calendar_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = SyncConfig::from_env()?;

    if let Command::Preview { url } = &cli.command {
        return preview(&config, url).await;
    }

    let engine = build_engine(&config)?;

    match cli.command {
        Command::Run => run(engine, &config).await?,
        Command::SyncAll => {
            let summary = engine.sync_all().await?;
            print_summary(&summary);
        }
        Command::SyncProperty { property_id } => {
            let summary = engine.sync_property(property_id).await?;
            print_summary(&summary);
        }
        Command::SyncConnection { connection_id } => {
            let result = engine
                .sync_connection_by_id(connection_id)
                .await?
                .with_context(|| format!("Calendar connection {} not found", connection_id))?;
            print_result(&result);
        }
        Command::Preview { .. } => {}
    }

    Ok(())
}

fn build_engine(config: &SyncConfig) -> anyhow::Result<PgSyncEngine> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = db::establish_connection_pool(&db_config)?;
    tracing::info!("Database connection pool initialized");

    let fetcher = HttpFeedFetcher::from_config(config)?;
    Ok(PgSyncEngine::new(
        Arc::new(PgSyncStore::new(pool)),
        Arc::new(fetcher),
        config,
    ))
}

async fn run(engine: PgSyncEngine, config: &SyncConfig) -> anyhow::Result<()> {
    let handle = SyncScheduler::new(engine, config.interval()).spawn();

    tracing::info!("Calendar sync running. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");

    handle.abort();
    Ok(())
}

async fn preview(config: &SyncConfig, url: &str) -> anyhow::Result<()> {
    let fetcher = HttpFeedFetcher::from_config(config)?;
    let horizon = Horizon::starting(Utc::now().date_naive(), config.horizon_days);
    let preview = preview_feed(&fetcher, url, &horizon).await?;

    println!("{} events:", preview.events.len());
    for event in &preview.events {
        println!("  {} → {}  {}", event.start, event.end, event.summary);
    }

    println!(
        "\n{} nights would be blocked between {} and {}",
        preview.dates.len(),
        horizon.first,
        horizon.last
    );
    for date in &preview.dates {
        println!("  {}", date);
    }

    if preview.beyond_horizon > 0 {
        println!(
            "\n{} nights fall beyond the horizon and would be ignored",
            preview.beyond_horizon
        );
    }

    Ok(())
}

fn print_result(result: &SyncResult) {
    let id = result.connection_id.to_string();
    let short_id = &id[..8];
    if result.success {
        println!(
            "✓ [{}] {}: {} events, {} nights blocked",
            short_id, result.label, result.events_found, result.dates_blocked
        );
    } else {
        println!(
            "✗ [{}] {}: {}",
            short_id,
            result.label,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn print_summary(summary: &SyncSummary) {
    for result in &summary.results {
        print_result(result);
    }
    println!(
        "\n{} connections: {} succeeded, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
}
