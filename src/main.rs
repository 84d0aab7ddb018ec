use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use annuaire::config::Config;
use annuaire::ingest::IngestionPipeline;
use annuaire::stats::StatsReporter;
use annuaire::store::{SharedDocumentStore, SqliteStore};

#[derive(Parser)]
#[command(
    name = "annuaire",
    version,
    about = "Business-directory ingestion with per-category collections and deduplication",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// SQLite store path (overrides config)
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSON array of scraped records into the store
    Ingest {
        /// Input JSON file (array of records)
        input: PathBuf,

        /// Merge policy for existing establishments (overwrite, append)
        #[arg(long)]
        merge_policy: Option<String>,

        /// Print run statistics as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Report statistics across all collections
    Stats {
        /// Include the per-category breakdown
        #[arg(long, default_value = "false")]
        per_type: bool,

        /// Print statistics as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List all collections
    Collections,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let mut config = Config::from_env()?;
    if let Some(path) = cli.store_path {
        config.store.sqlite_path = path;
    }
    config.validate()?;

    match cli.command {
        Commands::Ingest {
            input,
            merge_policy,
            json,
        } => {
            if let Some(policy) = merge_policy {
                config.ingest.merge_policy = policy.parse()?;
            }
            tracing::info!(
                input = %input.display(),
                merge_policy = config.ingest.merge_policy.as_str(),
                "Starting ingest command"
            );
            ingest(&config, &input, json).await?;
        }

        Commands::Stats { per_type, json } => {
            stats(&config, per_type, json).await?;
        }

        Commands::Collections => {
            collections(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("annuaire=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("annuaire=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<SharedDocumentStore> {
    let store = SqliteStore::open(&config.store.sqlite_path)
        .map_err(annuaire::error::Error::StoreConnection)?;
    Ok(Arc::new(store))
}

async fn ingest(config: &Config, input: &PathBuf, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let pipeline = IngestionPipeline::new(store, config.ingest.clone());

    // Ctrl-C finishes the record in flight, then stops the run
    let stop = pipeline.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::Relaxed);
        }
    });

    let stats = pipeline.ingest_file(input).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Run {}", stats.run_id);
        println!("  inserted:            {}", stats.inserted);
        println!("  updated:             {}", stats.updated);
        println!("  unchanged:           {}", stats.unchanged);
        println!("  failed:              {}", stats.failed);
        println!("  collections created: {}", stats.collections_created);
        for failure in &stats.failures {
            println!(
                "  failure [{}] {}: {}",
                failure.index,
                failure.name.as_deref().unwrap_or("<no name>"),
                failure.reason
            );
        }
    }

    Ok(())
}

async fn stats(config: &Config, per_type: bool, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let reporter = StatsReporter::new(store);

    let global = reporter.global_stats().await?;

    if json {
        let mut output = serde_json::json!({ "global": global });
        if per_type {
            output["per_type"] = serde_json::to_value(reporter.per_type_stats().await?)?;
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Establishments: {}", global.total_establishments);
    println!("Collections:    {}", global.collections_count);
    match global.average_rating {
        Some(avg) => println!("Average rating: {avg:.2}"),
        None => println!("Average rating: n/a"),
    }

    if per_type {
        for (name, stats) in reporter.per_type_stats().await? {
            match stats.average_rating {
                Some(avg) => println!("  {name}: {} ({avg:.2})", stats.count),
                None => println!("  {name}: {}", stats.count),
            }
        }
    }

    Ok(())
}

async fn collections(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    for name in store.list_collections().await? {
        println!("{name}");
    }
    Ok(())
}
