//! OCR ground-truth corpus preparation, training and evaluation.
//!
//! Image files whose names carry their label are turned into a Tesseract
//! training corpus (`<model>_<NNNNNN>.png` + `.gt.txt`), split into train and
//! test sets, validated, handed to the external trainer and finally scored.
//! See [`pipeline::Pipeline`] for the stage order.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod label;
pub mod langdata;
pub mod materialize;
pub mod partition;
pub mod pipeline;
pub mod validate;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PreparedCorpus, RunReport};
