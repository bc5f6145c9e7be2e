//! Error type shared by every stage of the corpus pipeline.

use std::{io, path::{Path, PathBuf}};

use images::png::base::ImageError;
use tesseract_lib::{commands::ToolError, fs::FsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid label pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("input directory {0} is not found")]
    InputDirMissing(PathBuf),

    #[error("no valid samples: nothing in the input directory matched the label pattern")]
    EmptyDataset,

    #[error("not enough training images: found {found}, need at least {required}")]
    InsufficientTrainData { found: usize, required: usize },

    #[error("not enough test images: found {found}, need at least {required}")]
    InsufficientTestData { found: usize, required: usize },

    #[error("evaluation manifest {0} is missing or empty")]
    ManifestWrite(PathBuf),

    #[error("trained model {0} was not found after training")]
    ArtifactMissing(PathBuf),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("evaluation report: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub fn io<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    /// Process exit status for this error. Every fatal dataset condition has
    /// its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) | Self::InvalidPattern(_) => 2,
            Self::InputDirMissing(_) => 3,
            Self::EmptyDataset => 4,
            Self::InsufficientTrainData { .. } => 5,
            Self::InsufficientTestData { .. } => 6,
            Self::ManifestWrite(_) => 7,
            Self::ArtifactMissing(_) => 8,
            Self::Tool(_) => 9,
            Self::Fs(_) | Self::Image(_) | Self::Io { .. } | Self::Json(_) | Self::Csv(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
