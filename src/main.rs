use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleetdays::accrual::{AccrualService, InvocationContext};
use fleetdays::config::{default_config_path, ResolvedConfig};
use fleetdays::models::Id;
use fleetdays::storage::{find_asset, AssetRepository, JsonFileStorage};
use rand::seq::SliceRandom;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "fleetdays")]
#[command(about = "Rented-days accrual for leasable assets")]
#[command(version = VERSION)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Name recorded in logs as the initiator of this run
    #[arg(long, env = "FLEETDAYS_ACTOR", default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show resolved configuration
    Config,

    /// Recompute and store rented days for one asset (by id or label)
    Update { asset: String },

    /// Recompute rented days for every active asset
    UpdateAll {
        /// Number of assets processed at once (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Compare stored rented days against a fresh recomputation without writing
    Audit {
        /// Asset ids to check
        ids: Vec<String>,

        /// Check every active asset
        #[arg(long, conflicts_with_all = ["ids", "sample"])]
        all: bool,

        /// Check a random sample of this many active assets (defaults to config)
        #[arg(long, conflicts_with = "ids")]
        sample: Option<usize>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn audit_sample(
    storage: &JsonFileStorage,
    ids: Vec<String>,
    all: bool,
    sample: usize,
) -> Result<Vec<Id>> {
    if !ids.is_empty() {
        return ids
            .into_iter()
            .map(|id| Id::from_string_checked(id).map_err(Into::into))
            .collect();
    }

    let mut active = storage.list_active_asset_ids().await?;
    if !all {
        active.shuffle(&mut rand::thread_rng());
        active.truncate(sample);
    }
    Ok(active)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let ctx = InvocationContext::new(cli.actor);
    let service = AccrualService::from_storage(storage.clone())
        .with_write_attempts(config.accrual.write_attempts)
        .with_concurrency(config.batch.concurrency);

    match cli.command {
        Command::Config => {
            println!("Config file: {}", cli.config.display());
            print_json(&config)?;
        }
        Command::Update { asset } => {
            let asset = find_asset(storage.as_ref(), &asset)
                .await?
                .with_context(|| format!("Asset not found: {asset}"))?;
            let result = service.update_one(&ctx, &asset.id).await?;
            print_json(&result)?;
        }
        Command::UpdateAll { concurrency } => {
            let service = match concurrency {
                Some(n) => service.with_concurrency(n),
                None => service,
            };

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received; finishing in-flight assets");
                    on_ctrl_c.cancel();
                }
            });

            let summary = service.update_all(&ctx, &cancel).await;
            print_json(&summary)?;
        }
        Command::Audit { ids, all, sample } => {
            let sample = sample.unwrap_or(config.audit.sample_size);
            let ids = audit_sample(&storage, ids, all, sample).await?;
            let results = service.audit(&ctx, &ids).await;
            print_json(&results)?;
        }
    }

    Ok(())
}
