use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use realty_insight::area_extractor::MatchMode;
use realty_insight::config::AppConfig;
use realty_insight::db::{open_store, DatasetStore};
use realty_insight::upload::upload_file;
use realty_insight::QueryEngine;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "realty-insight")]
#[command(about = "Answer natural-language questions about real estate price and demand data")]
struct Args {
    /// SQLite database path (or set REALTY_DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Seed dataset used when the store is empty or unreachable (or set REALTY_SEED_PATH)
    #[arg(long, global = true)]
    seed_path: Option<PathBuf>,

    /// Area matching: "substring" or "word" (or set AREA_MATCH_MODE)
    #[arg(long, global = true)]
    match_mode: Option<MatchMode>,

    /// LLM API key (or set GEMINI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a question, e.g. "price trend koramangala"
    Query {
        query: String,
    },
    /// Replace the dataset with an Excel, CSV or Parquet file
    Upload {
        file: PathBuf,
    },
    /// List the known areas
    Areas,
    /// Dataset statistics
    Stats,
    /// Data and LLM availability
    Health,
    /// Recently analysed queries
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    // an unopenable store still lets `query` and `health` fall back to the seed file
    let store: Arc<dyn DatasetStore> = open_store(&config.db_path);
    if config.llm_configured() {
        info!("LLM key found, AI summaries enabled ({})", config.llm_model);
    } else {
        info!("No LLM key configured, using rule-based summaries");
    }

    match args.command {
        Commands::Query { query } => {
            let engine = QueryEngine::from_config(&config, Arc::clone(&store));
            print_json(&engine.analyze_query(&query).await)
        }
        Commands::Upload { file } => {
            let outcome = upload_file(store.as_ref(), &file, &config.seed_path)
                .with_context(|| format!("Failed to upload {}", file.display()))?;
            print_json(&outcome)
        }
        Commands::Areas => print_json(&store.distinct("Area").context("Failed to list areas")?),
        Commands::Stats => print_json(&store.statistics().context("Failed to compute statistics")?),
        Commands::Health => {
            let engine = QueryEngine::from_config(&config, Arc::clone(&store));
            print_json(&engine.health().await)
        }
        Commands::History { limit } => {
            print_json(&store.recent_queries(limit).context("Failed to read query history")?)
        }
    }
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(path) = &args.db_path {
        config.db_path = path.clone();
    }
    if let Some(path) = &args.seed_path {
        config.seed_path = path.clone();
    }
    if let Some(mode) = args.match_mode {
        config.match_mode = mode;
    }
    if let Some(key) = &args.api_key {
        config.llm_api_key = Some(key.clone());
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
