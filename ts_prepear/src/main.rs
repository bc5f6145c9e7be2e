//! Training-corpus preparation binary (`ts_prepear`).
//!
//! Turns a folder of labeled images into a Tesseract ground-truth corpus
//! without running any external tool.
//!
//! # Workflow
//! 1. Wipes `train/`, `test/` and `langdata/` under the output base.
//! 2. Extracts a label from every file name in the input directory.
//! 3. Shuffles and splits the samples into train and test sets.
//! 4. Writes `<model>_<NNNNNN>.png` + `.gt.txt` records for both sets.
//! 5. Checks minimum counts and writes `test/list.txt`.
//! 6. Writes `langdata/unicharset`, `numbers`, `punc` and `wordlist`.
//!
//! # Usage
//! ```text
//! cargo run --release -p ts_prepear -- \
//!     --config ./data/config.json --input-dir ./data/source \
//!     [--train-percent 90] [--seed 42] [--model-name meter]
//! ```

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use dataset_lib::{Pipeline, PipelineConfig, Result};
use tracing::{error, info};

/// CLI arguments for a preparation run.
///
/// Every flag is optional; unset flags keep the value from `--config` (or
/// the built-in default when no config file is given).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub output_base: Option<PathBuf>,
    /// Label regex with exactly one capture group.
    #[arg(long)]
    pub pattern: Option<String>,
    #[arg(short, long)]
    pub train_percent: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(short, long)]
    pub model_name: Option<String>,
    /// Space-separated alphabet tokens.
    #[arg(short, long)]
    pub alphabet: Option<String>,
    /// Write the effective configuration to this file.
    #[arg(long)]
    pub dump_config: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::read(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(d) = &self.input_dir { config.input_dir = d.clone(); }
        if let Some(d) = &self.output_base { config.output_base = d.clone(); }
        if let Some(d) = &self.pattern { config.label_pattern = d.clone(); }
        if let Some(d) = self.train_percent { config.train_percent = d; }
        if let Some(d) = self.seed { config.seed = Some(d); }
        if let Some(d) = &self.model_name { config.model_name = d.clone(); }
        if let Some(d) = &self.alphabet { config.alphabet = d.clone(); }
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match prepare_main(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

fn prepare_main(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    if let Some(path) = &args.dump_config {
        config.save(path)?;
        info!(path = %path.display(), "configuration written");
    }

    let pipeline = Pipeline::new(config)?;
    let corpus = pipeline.prepare()?;

    println!(
        "train: {} written, {} skipped; test: {} written, {} skipped{}",
        corpus.train.written,
        corpus.train.skipped,
        corpus.test.written,
        corpus.test.skipped,
        if corpus.full_train { " (test is a subset of train)" } else { "" }
    );
    println!("manifest: {}", corpus.validated.manifest.display());
    println!("seed: {}", corpus.seed);
    Ok(())
}
