use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use draft_oracle::api::{Api, ApiResponse};
use draft_oracle::artifact::ModelContext;
use draft_oracle::config::{self, AppConfig};
use draft_oracle::dashboard;
use draft_oracle::stats::StatsAggregator;
use draft_oracle::store::MatchStore;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Predict draft winners and report prediction stats", long_about = None)]
struct CommandArgs {
    /// Model artifact (overrides DRAFT_ORACLE_MODEL_PATH)
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    /// SQLite prediction store (overrides DRAFT_ORACLE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Roles and known champions
    Options,
    /// Score a draft given as `{"blue": {...}, "red": {...}}`
    Predict {
        /// JSON file with the draft, `-` for stdin
        #[arg(long, default_value = "-")]
        body: String,
    },
    /// Win rates and pick rankings over stored predictions
    Stats,
    /// Live stats view in the terminal
    Dashboard {
        #[arg(long, default_value_t = 5)]
        refresh_secs: u64,
    },
    /// Describe the model artifact's columns and forest
    InspectModel,
    /// Show the first stored prediction and champion, if any
    CheckStore,
    /// Fill the champion catalog from the model vocabulary
    SeedChampions,
}

fn main() -> Result<ExitCode> {
    let args = CommandArgs::parse();
    let cfg = AppConfig::from_env()?.with_overrides(args.model.as_deref(), args.db.as_deref());
    config::init_logging(&cfg.log_filter);

    match args.mode {
        Mode::Options => respond(build_api(&cfg)?.options()),
        Mode::Predict { body } => {
            let raw = read_body(&body)?;
            respond(build_api(&cfg)?.predict(&raw))
        }
        Mode::Stats => respond(build_api(&cfg)?.stats()),
        Mode::Dashboard { refresh_secs } => {
            let store = Arc::new(open_store(&cfg.db_path)?);
            let aggregator = StatsAggregator::new(store);
            dashboard::run(&aggregator, Duration::from_secs(refresh_secs.max(1)))?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::InspectModel => {
            inspect_model(&cfg.model_path)?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::CheckStore => {
            check_store(&cfg.db_path)?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::SeedChampions => {
            let model = load_model(&cfg.model_path)?;
            let store = open_store(&cfg.db_path)?;
            let inserted = store.seed_champions(&model.encoders.champions())?;
            info!(inserted, "champion catalog seeded");
            println!("Champions added: {inserted}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_api(cfg: &AppConfig) -> Result<Api> {
    let model = Arc::new(load_model(&cfg.model_path)?);
    let store = Arc::new(open_store(&cfg.db_path)?);
    Ok(Api::new(model, store))
}

fn load_model(path: &Path) -> Result<ModelContext> {
    ModelContext::load(path).with_context(|| format!("load model {}", path.display()))
}

fn open_store(path: &Path) -> Result<MatchStore> {
    MatchStore::open(path).with_context(|| format!("open store {}", path.display()))
}

fn read_body(source: &str) -> Result<Vec<u8>> {
    if source == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("read draft from stdin")?;
        return Ok(buf);
    }
    fs::read(source).with_context(|| format!("read draft {source}"))
}

fn respond(response: ApiResponse) -> Result<ExitCode> {
    let json = serde_json::to_string_pretty(&response.body).context("render response")?;
    println!("{json}");
    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("status {}", response.status);
        Ok(ExitCode::FAILURE)
    }
}

fn inspect_model(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    println!("Model: {}", path.display());
    println!("SHA-256: {}", model.fingerprint);
    println!("Classifier: {}", model.classifier.describe());
    for (idx, column) in model.encoders.columns().iter().enumerate() {
        println!(
            "  column {idx:>2} {:<18} {} classes",
            column.name(),
            column.classes().len()
        );
    }
    println!("Champions known: {}", model.encoders.champions().len());
    Ok(())
}

fn check_store(path: &Path) -> Result<()> {
    let store = open_store(path)?;
    println!("Store: {}", path.display());
    println!("Predictions: {}", store.count()?);

    match store.first_record()? {
        Some(record) => println!(
            "First prediction: #{} at {} -> {} (blue {:.4}, red {:.4})",
            record.id,
            record.timestamp.to_rfc3339(),
            record.winner.result_label(),
            record.probability_blue,
            record.probability_red
        ),
        None => println!("No predictions stored."),
    }

    let champions = store.champion_names()?;
    match champions.first() {
        Some(first) => println!("Champions: {} (first: {first})", champions.len()),
        None => println!("No champions in catalog."),
    }
    Ok(())
}
