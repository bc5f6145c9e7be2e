//! Wrappers around the external Tesseract tools.
//!
//! Two collaborators are exposed as traits so that corpus code can be tested
//! without the real executables:
//! - [`Recognizer`]: runs OCR on one image and returns its text
//!   ([`TesseractCli`] calls `tesseract <img> stdout`).
//! - [`Trainer`]: fine-tunes or trains a model from a ground-truth directory
//!   ([`TesstrainCli`] calls `make training` inside a tesstrain checkout).

use std::{fmt, io, path::{Path, PathBuf}, process::Command};

use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("error launching {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("{tool} produced non UTF-8 output")]
    Utf8 { tool: String },
}

/// Tesseract page segmentation modes used by this workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSegMode {
    /// Fully automatic page segmentation (`--psm 3`).
    Auto,
    /// Treat the image as a single text line (`--psm 7`).
    SingleLine,
}

impl PageSegMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleLine => "7",
        }
    }
}

impl fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// OCR collaborator: image in, raw recognized text out.
pub trait Recognizer {
    fn recognize(&self, image: &Path) -> Result<String, ToolError>;
}

/// Runs the `tesseract` executable for one image and captures stdout.
#[derive(Clone, Debug)]
pub struct TesseractCli {
    pub binary: PathBuf,
    pub tessdata_dir: PathBuf,
    pub lang: String,
    pub psm: PageSegMode,
}

impl TesseractCli {
    pub fn new<P: AsRef<Path>>(tessdata_dir: P, lang: &str, psm: PageSegMode) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: tessdata_dir.as_ref().to_path_buf(),
            lang: lang.to_string(),
            psm,
        }
    }
}

impl Recognizer for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String, ToolError> {
        let tool = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata_dir)
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg(self.psm.as_arg())
            .output()
            .map_err(|source| ToolError::Launch { tool: tool.clone(), source })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| ToolError::Utf8 { tool })
    }
}

/// Model the trainer continues from.
#[derive(Clone, Debug, PartialEq)]
pub struct StartModel {
    /// Language name as found in `tessdata_dir` (`<name>.traineddata`).
    pub name: String,
    pub tessdata_dir: PathBuf,
}

impl StartModel {
    /// Builds a start model from an explicit `.traineddata` file path.
    pub fn from_traineddata(path: &Path) -> Option<Self> {
        let name = path.file_stem()?.to_str()?.to_string();
        let tessdata_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(Self { name, tessdata_dir })
    }
}

/// Everything one training run needs.
#[derive(Clone, Debug)]
pub struct TrainRequest {
    pub model_name: String,
    /// `None` trains from scratch.
    pub start_model: Option<StartModel>,
    /// Search directory for base models when no start model overrides it.
    pub tessdata_dir: PathBuf,
    pub max_iterations: u32,
    pub learning_rate: f64,
    pub ground_truth_dir: PathBuf,
    pub eval_list: PathBuf,
}

impl TrainRequest {
    fn tessdata(&self) -> &Path {
        match &self.start_model {
            Some(start) => &start.tessdata_dir,
            None => &self.tessdata_dir,
        }
    }
}

/// Training collaborator. Returns the path where the model artifact for
/// `request.model_name` is expected; callers check that it exists.
pub trait Trainer {
    fn train(&self, request: &TrainRequest) -> Result<PathBuf, ToolError>;
}

/// Drives `make training` in a tesstrain checkout.
#[derive(Clone, Debug)]
pub struct TesstrainCli {
    pub make: PathBuf,
    pub tesstrain_dir: PathBuf,
}

impl TesstrainCli {
    pub fn new<P: AsRef<Path>>(tesstrain_dir: P) -> Self {
        Self { make: PathBuf::from("make"), tesstrain_dir: tesstrain_dir.as_ref().to_path_buf() }
    }

    /// Location of the finished model for `model_name`.
    pub fn artifact_path(&self, model_name: &str) -> PathBuf {
        self.tesstrain_dir.join("data").join(format!("{}.traineddata", model_name))
    }

    /// Make variables passed to the `training` target.
    pub fn make_args(&self, request: &TrainRequest) -> Vec<String> {
        let mut args = vec![
            "-C".to_string(),
            self.tesstrain_dir.display().to_string(),
            "training".to_string(),
            format!("MODEL_NAME={}", request.model_name),
        ];
        if let Some(start) = &request.start_model {
            args.push(format!("START_MODEL={}", start.name));
        }
        args.push(format!("TESSDATA={}", request.tessdata().display()));
        args.push(format!("MAX_ITERATIONS={}", request.max_iterations));
        args.push(format!("LEARNING_RATE={}", request.learning_rate));
        args.push(format!("GROUND_TRUTH_DIR={}", request.ground_truth_dir.display()));
        args.push(format!("EVAL_LIST={}", request.eval_list.display()));
        args
    }
}

impl Trainer for TesstrainCli {
    #[instrument(skip_all, fields(model = %request.model_name))]
    fn train(&self, request: &TrainRequest) -> Result<PathBuf, ToolError> {
        let tool = self.make.display().to_string();
        let args = self.make_args(request);
        debug!(?args, "launching trainer");

        let status = Command::new(&self.make)
            .args(&args)
            .status()
            .map_err(|source| ToolError::Launch { tool: tool.clone(), source })?;
        if !status.success() {
            return Err(ToolError::Failed { tool, status: status.to_string(), stderr: String::new() });
        }

        let artifact = self.artifact_path(&request.model_name);
        info!(artifact = %artifact.display(), "training finished");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start_model: Option<StartModel>) -> TrainRequest {
        TrainRequest {
            model_name: "meter".to_string(),
            start_model,
            tessdata_dir: PathBuf::from("/usr/share/tessdata"),
            max_iterations: 400,
            learning_rate: 0.0001,
            ground_truth_dir: PathBuf::from("out/train"),
            eval_list: PathBuf::from("out/test/list.txt"),
        }
    }

    #[test]
    fn make_args_with_base_model() {
        let cli = TesstrainCli::new("tesstrain");
        let start = StartModel { name: "eng".to_string(), tessdata_dir: PathBuf::from("/usr/share/tessdata") };
        let args = cli.make_args(&request(Some(start)));
        assert_eq!(args[0..3], ["-C", "tesstrain", "training"]);
        assert!(args.contains(&"MODEL_NAME=meter".to_string()));
        assert!(args.contains(&"START_MODEL=eng".to_string()));
        assert!(args.contains(&"TESSDATA=/usr/share/tessdata".to_string()));
        assert!(args.contains(&"MAX_ITERATIONS=400".to_string()));
        assert!(args.contains(&"LEARNING_RATE=0.0001".to_string()));
        assert!(args.contains(&"GROUND_TRUTH_DIR=out/train".to_string()));
        assert!(args.contains(&"EVAL_LIST=out/test/list.txt".to_string()));
    }

    #[test]
    fn make_args_from_scratch_has_no_start_model() {
        let cli = TesstrainCli::new("tesstrain");
        let args = cli.make_args(&request(None));
        assert!(!args.iter().any(|a| a.starts_with("START_MODEL=")));
        assert!(args.contains(&"TESSDATA=/usr/share/tessdata".to_string()));
    }

    #[test]
    fn custom_traineddata_overrides_tessdata() {
        let start = StartModel::from_traineddata(Path::new("/models/digits.traineddata")).unwrap();
        assert_eq!(start.name, "digits");
        let cli = TesstrainCli::new("tesstrain");
        let args = cli.make_args(&request(Some(start)));
        assert!(args.contains(&"START_MODEL=digits".to_string()));
        assert!(args.contains(&"TESSDATA=/models".to_string()));
    }

    #[test]
    fn artifact_is_addressed_by_model_name() {
        let cli = TesstrainCli::new("/opt/tesstrain");
        assert_eq!(cli.artifact_path("meter"), PathBuf::from("/opt/tesstrain/data/meter.traineddata"));
    }

    #[test]
    fn missing_binary_is_a_launch_error() {
        let mut cli = TesseractCli::new("/nonexistent", "eng", PageSegMode::SingleLine);
        cli.binary = PathBuf::from("/nonexistent/tesseract-binary");
        let err = cli.recognize(Path::new("a.png")).unwrap_err();
        assert!(matches!(err, ToolError::Launch { .. }));
    }
}
