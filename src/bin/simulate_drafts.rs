use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rayon::prelude::*;
use tracing::warn;

use draft_oracle::artifact::ModelContext;
use draft_oracle::config::{self, AppConfig};
use draft_oracle::draft::Side;
use draft_oracle::fake_draft::random_draft;
use draft_oracle::predictor::Predictor;
use draft_oracle::store::MatchStore;

/// Submits random drafts through the prediction pipeline to fill a store.
#[derive(Debug, Parser)]
struct Args {
    /// Number of drafts to submit
    #[arg(long, default_value_t = 200)]
    count: usize,
    #[arg(long)]
    model: Option<PathBuf>,
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = AppConfig::from_env()?.with_overrides(args.model.as_deref(), args.db.as_deref());
    config::init_logging(&cfg.log_filter);

    let model = Arc::new(
        ModelContext::load(&cfg.model_path)
            .with_context(|| format!("load model {}", cfg.model_path.display()))?,
    );
    let store = Arc::new(
        MatchStore::open(&cfg.db_path)
            .with_context(|| format!("open store {}", cfg.db_path.display()))?,
    );
    let predictor = Predictor::new(Arc::clone(&model), Arc::clone(&store));

    let blue_wins = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);
    let started = Instant::now();

    (0..args.count).into_par_iter().for_each(|_| {
        let mut rng = rand::thread_rng();
        let Some(draft) = random_draft(&model.encoders, &mut rng) else {
            failures.fetch_add(1, Ordering::Relaxed);
            return;
        };
        match predictor.predict(&draft) {
            Ok(prediction) => {
                if prediction.winner == Side::Blue {
                    blue_wins.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(err) => {
                warn!(error = %err, "simulated draft failed");
                failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let failures = failures.into_inner();
    let submitted = args.count - failures;
    if args.count > 0 && submitted == 0 {
        return Err(anyhow!("no simulated draft could be scored"));
    }

    println!("Simulation complete");
    println!("DB: {}", cfg.db_path.display());
    println!("Drafts stored: {submitted}/{}", args.count);
    println!("Blue wins: {}", blue_wins.into_inner());
    println!("Failures: {failures}");
    println!("Stored total: {}", store.count()?);
    println!("Elapsed: {:.2?}", started.elapsed());
    Ok(())
}
