//! Dossier CLI: correlate a target's tool output into the entity graph.
//!
//! Usage:
//!   dossier correlate -t <target> [-d data_dir] [--db path] [--config file]
//!   dossier summary -t <target> [--db path] [--limit n] [--json]

use clap::{Parser, Subcommand};
use dossier::{
    CorrelationDriver, CorrelationStore, CorrelatorConfig, MemoryStore, OpenStore, RunSummary, SqliteStore,
    TargetSummary,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dossier", version, about = "Entity correlation engine for OSINT tool output")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and merge everything under <data_dir>/targets/<target>
    Correlate {
        /// Investigation target name
        #[arg(short, long)]
        target: String,
        /// Data root holding targets/<target>/<tool>/...
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Files per batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Concurrent parse workers
        #[arg(long)]
        workers: Option<usize>,
        /// Merge into a throwaway in-memory store
        #[arg(long)]
        dry_run: bool,
    },
    /// Print entity counts for a target
    Summary {
        /// Investigation target name
        #[arg(short, long)]
        target: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Top entities listed per type
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(db: &Path) -> Result<Arc<dyn CorrelationStore>, String> {
    let store = SqliteStore::open(db).map_err(|e| format!("Failed to open database {}: {}", db.display(), e))?;
    Ok(Arc::new(store))
}

fn print_run(summary: &RunSummary) {
    println!(
        "{}: {} of {} files processed, {} skipped",
        summary.target, summary.files_processed, summary.files_discovered, summary.files_skipped
    );
    println!(
        "  entities: {} merged, {} unchanged, {} rejected",
        summary.entities_merged, summary.entities_unchanged, summary.entities_rejected
    );
    println!(
        "  relationships: {} merged, {} rejected",
        summary.relationships_merged, summary.relationships_rejected
    );
    if summary.cancelled {
        println!("  (cancelled after {} batches)", summary.batches);
    }
}

async fn cmd_correlate(
    target: &str,
    data_dir: Option<PathBuf>,
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    batch_size: Option<usize>,
    workers: Option<usize>,
    dry_run: bool,
) -> i32 {
    let mut config = match CorrelatorConfig::load(config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(db) = db {
        config.db_path = db;
    }
    if let Some(n) = batch_size {
        config.batch_size = n;
    }
    if let Some(n) = workers {
        config.parse_workers = n;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return 1;
    }

    let store: Arc<dyn CorrelationStore> = if dry_run {
        Arc::new(MemoryStore::new())
    } else {
        match open_store(&config.db_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    };

    let driver = CorrelationDriver::new(store, &config);
    let token = driver.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    match driver.run(target).await {
        Ok(summary) => {
            print_run(&summary);
            if summary.success() {
                0
            } else {
                eprintln!("Error: no files processed for target '{}'", target);
                1
            }
        }
        Err(e) => {
            if let Some(summary) = e.summary() {
                print_run(summary);
            }
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_summary(target: &str, db: Option<PathBuf>, limit: usize, json: bool) -> i32 {
    let db = match db {
        Some(db) => db,
        None => match CorrelatorConfig::load(None) {
            Ok(config) => config.db_path,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
    };
    let store = match open_store(&db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let summary = match TargetSummary::build(store.as_ref(), target, limit) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        return 0;
    }

    if summary.types.is_empty() {
        println!("No entities for target '{}'.", target);
        return 0;
    }
    println!("{:<16}  {:>7}  TOP", "TYPE", "COUNT");
    println!("{}", "-".repeat(64));
    for entry in &summary.types {
        let top: Vec<&str> = entry.top.iter().map(|e| e.value.as_str()).collect();
        println!("{:<16}  {:>7}  {}", entry.entity_type.as_str(), entry.count, top.join(", "));
    }
    for (rel_type, count) in &summary.relationship_types {
        println!("{:<16}  {:>7}", rel_type.as_str(), count);
    }
    println!(
        "{} entities, {} relationships",
        summary.total_entities, summary.total_relationships
    );
    if !summary.sources.is_empty() {
        println!("tools: {}", summary.sources.join(", "));
    }
    0
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Correlate {
            target,
            data_dir,
            db,
            config,
            batch_size,
            workers,
            dry_run,
        } => cmd_correlate(&target, data_dir, db, config, batch_size, workers, dry_run).await,
        Commands::Summary { target, db, limit, json } => cmd_summary(&target, db, limit, json),
    };
    std::process::exit(code);
}
