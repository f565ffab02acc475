//! inspectord — the colony inspector daemon.
//!
//! Assembles the crawler from its collaborators:
//! - Document store (redb)
//! - Colony registry gateway client
//! - Crawler + scheduler
//!
//! # Usage
//!
//! ```text
//! inspectord --config /etc/colony-inspector/inspector.toml run
//! inspectord once --endpoint 127.0.0.1:8545 --data-dir ./data
//! inspectord show --data-dir ./data
//! ```

mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use inspector_crawler::{Crawler, Scheduler, SystemClock};
use inspector_source::HttpColonySource;
use inspector_store::{records, DocumentStore, Metric};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{InspectorConfig, Settings};

const DEFAULT_LOG_FILTER: &str = "info,inspectord=debug,inspector_crawler=debug";

#[derive(Parser)]
#[command(name = "inspectord", about = "Colony inspector daemon")]
struct Cli {
    /// Path to inspector.toml. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl on the configured interval until interrupted.
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run a single crawl cycle and print its report.
    Once {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print the persisted statistics and time series.
    Show {
        /// Data directory holding the store.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Args)]
struct Overrides {
    /// Registry gateway address (host:port).
    #[arg(long)]
    endpoint: Option<String>,

    /// Data directory for persistent state.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Crawl interval, e.g. "60s" or "5m".
    #[arg(long)]
    interval: Option<String>,

    /// Maximum concurrent colony fetches.
    #[arg(long)]
    concurrency: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut InspectorConfig) {
        if let Some(endpoint) = self.endpoint {
            config.source.endpoint = endpoint;
        }
        if let Some(data_dir) = self.data_dir {
            config.store.data_dir = data_dir;
        }
        if let Some(interval) = self.interval {
            config.crawler.interval = interval;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = InspectorConfig::load(cli.config.as_deref())
        .with_context(|| config_label(cli.config.as_deref()))?;

    match cli.command {
        Command::Run { overrides } => {
            overrides.apply(&mut config);
            run(config.settings()?).await
        }
        Command::Once { overrides } => {
            overrides.apply(&mut config);
            once(config.settings()?).await
        }
        Command::Show { data_dir } => {
            if let Some(data_dir) = data_dir {
                config.store.data_dir = data_dir;
            }
            show(config.settings()?)
        }
    }
}

fn config_label(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("loading config {}", path.display()),
        None => "loading default config".to_string(),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

fn open_store(settings: &Settings) -> anyhow::Result<DocumentStore> {
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("creating data dir {}", settings.data_dir.display()))?;
    let db_path = settings.db_path();
    let store = DocumentStore::open(&db_path)
        .with_context(|| format!("opening store {}", db_path.display()))?;
    info!(path = %db_path.display(), "document store opened");
    Ok(store)
}

fn build_crawler(settings: &Settings) -> anyhow::Result<Crawler> {
    let store = open_store(settings)?;
    let source = HttpColonySource::new(settings.endpoint.clone());
    info!(endpoint = %settings.endpoint, "registry gateway configured");

    Ok(Crawler::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(SystemClock),
        settings.crawl,
    ))
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    info!("colony inspector starting");
    let crawler = Arc::new(build_crawler(&settings)?);

    let handle = Scheduler::new(settings.interval).spawn(move || {
        let crawler = Arc::clone(&crawler);
        async move { crawler.run_once().await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("installing CTRL+C handler")?;
    info!("shutdown signal received");

    handle.stop().await;
    info!("colony inspector stopped");
    Ok(())
}

async fn once(settings: Settings) -> anyhow::Result<()> {
    let crawler = build_crawler(&settings)?;
    let report = crawler.run_once().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn show(settings: Settings) -> anyhow::Result<()> {
    let db_path = settings.db_path();
    let store = DocumentStore::open_read_only(&db_path)
        .with_context(|| format!("opening store {}", db_path.display()))?;

    let mut series = BTreeMap::new();
    for metric in Metric::ALL {
        series.insert(metric.name(), records::read_time_series(&store, metric)?);
    }

    let view = serde_json::json!({
        "statistics": records::read_statistics(&store)?,
        "snapshot-date": records::read_snapshot_date(&store)?,
        "time-series-data": series,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
