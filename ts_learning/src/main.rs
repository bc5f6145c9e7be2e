//! Tesseract LSTM training binary (`ts_learning`).
//!
//! Runs the whole chain for one model:
//!
//! 1. Prepares the ground-truth corpus (same steps as `ts_prepear`).
//! 2. Runs `make training` in the tesstrain checkout with the train
//!    directory, the evaluation list and the configured hyperparameters.
//! 3. Checks that `<tesstrain>/data/<model>.traineddata` was produced.
//! 4. Recognizes every test image with the new model (`--psm 7`) and prints
//!    character and string accuracy. Per-sample rows go to
//!    `<output_base>/evaluation.csv`.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use dataset_lib::{Pipeline, PipelineConfig, Result};
use tesseract_lib::commands::TesstrainCli;
use tracing::{error, info};

/// CLI arguments for a training run.
///
/// Unset flags keep the value from `--config` or the built-in default.
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
    #[arg(long)]
    pub pattern: Option<String>,
    #[arg(short, long)]
    pub train_percent: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(short, long)]
    pub model_name: Option<String>,
    #[arg(short, long)]
    pub alphabet: Option<String>,
    #[arg(long)]
    pub max_iterations: Option<u32>,
    #[arg(long)]
    pub learning_rate: Option<f64>,
    /// Base model name looked up in the tessdata directory.
    #[arg(long)]
    pub base_model: Option<String>,
    /// Path to a `.traineddata` to continue from instead of `--base-model`.
    #[arg(long)]
    pub custom_base_model: Option<PathBuf>,
    /// Train without a start model. `--from-scratch false` clears a value
    /// set in the config file.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", action = clap::ArgAction::Set)]
    pub from_scratch: Option<bool>,
    #[arg(long)]
    pub tessdata_dir: Option<PathBuf>,
    #[arg(long)]
    pub tesstrain_dir: Option<PathBuf>,
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
        if let Some(d) = self.max_iterations { config.max_iterations = d; }
        if let Some(d) = self.learning_rate { config.learning_rate = d; }
        if let Some(d) = &self.base_model { config.base_model = d.clone(); }
        if let Some(d) = &self.custom_base_model { config.custom_base_model = Some(d.clone()); }
        if let Some(d) = self.from_scratch { config.from_scratch = d; }
        if let Some(d) = &self.tessdata_dir { config.tessdata_dir = d.clone(); }
        if let Some(d) = &self.tesstrain_dir { config.tesstrain_dir = d.clone(); }
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
    match learning_main(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

fn learning_main(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    if let Some(path) = &args.dump_config {
        config.save(path)?;
        info!(path = %path.display(), "configuration written");
    }

    let pipeline = Pipeline::new(config)?;
    let trainer = TesstrainCli::new(&pipeline.config().tesstrain_dir);
    let report = pipeline.run(&trainer, |artifact| pipeline.recognizer_for(artifact))?;

    println!("model: {}", report.artifact.display());
    println!(
        "train: {} records, test: {} records, seed {}",
        report.corpus.train.written, report.corpus.test.written, report.corpus.seed
    );
    println!("{}", report.evaluation.report);
    Ok(())
}
