use std::{fs::File, io::{BufWriter, Read, Write}, path::{Path, PathBuf}};

use regex::{Regex, RegexBuilder};
use tesseract_lib::commands::{StartModel, TrainRequest};

use crate::error::{PipelineError, Result};

pub const TRAIN_DIR: &str = "train";
pub const TEST_DIR: &str = "test";
pub const LANGDATA_DIR: &str = "langdata";
pub const MANIFEST_NAME: &str = "list.txt";
pub const EVAL_REPORT_NAME: &str = "evaluation.csv";

// Full run configuration. Built once (defaults -> JSON file -> CLI flags)
// and then only borrowed by the pipeline stages.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_base: PathBuf,
    /// Regex with exactly one capture group, matched case-insensitively.
    pub label_pattern: String,
    /// Share of samples used for training, `0 < p <= 100`.
    pub train_percent: f64,
    pub seed: Option<u64>,
    pub max_iterations: u32,
    pub learning_rate: f64,
    pub model_name: String,
    pub base_model: String,
    pub custom_base_model: Option<PathBuf>,
    pub from_scratch: bool,
    /// Space-separated character tokens.
    pub alphabet: String,
    pub tessdata_dir: PathBuf,
    pub tesstrain_dir: PathBuf,
    pub min_train: usize,
    pub min_test: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/source"),
            output_base: PathBuf::from("data/ground_truth"),
            label_pattern: r"_([0-9]+(?:\.[0-9]+)?[A-Z]*)\.[a-z0-9]+$".to_string(),
            train_percent: 90.0,
            seed: None,
            max_iterations: 10000,
            learning_rate: 0.0001,
            model_name: "custom".to_string(),
            base_model: "eng".to_string(),
            custom_base_model: None,
            from_scratch: false,
            alphabet: "0 1 2 3 4 5 6 7 8 9 . A B".to_string(),
            tessdata_dir: PathBuf::from("/usr/share/tesseract-ocr/5/tessdata"),
            tesstrain_dir: PathBuf::from("tesstrain"),
            min_train: 10,
            min_test: 1,
        }
    }
}

impl PipelineConfig {
    // Reads config JSON from disk. Missing fields fall back to defaults.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|err| PipelineError::io(path, err))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|err| PipelineError::io(path, err))?;
        Ok(serde_json::from_str(&contents)?)
    }

    // Saves the full configuration as pretty-formatted JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let pretty_json = serde_json::to_string_pretty(self)?;
        let data_file = File::create(path).map_err(|err| PipelineError::io(path, err))?;
        let mut data_file = BufWriter::new(data_file);
        data_file.write_all(pretty_json.as_bytes()).map_err(|err| PipelineError::io(path, err))?;
        data_file.flush().map_err(|err| PipelineError::io(path, err))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_percent > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "train_percent must be greater than 0, got {}",
                self.train_percent
            )));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig("max_iterations must be greater than 0".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "learning_rate must be greater than 0, got {}",
                self.learning_rate
            )));
        }
        if self.model_name.is_empty()
            || !self.model_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PipelineError::InvalidConfig(format!(
                "model_name {:?} must be non-empty and use only [A-Za-z0-9_-]",
                self.model_name
            )));
        }
        if self.alphabet_tokens().is_empty() {
            return Err(PipelineError::InvalidConfig("alphabet is empty".to_string()));
        }
        // Output subdirectories are wiped on every run.
        let wiped = [self.train_dir(), self.test_dir(), self.langdata_dir()];
        if self.input_dir == self.output_base || wiped.iter().any(|dir| self.input_dir.starts_with(dir)) {
            return Err(PipelineError::InvalidConfig(format!(
                "input_dir {} overlaps the generated corpus under {}",
                self.input_dir.display(),
                self.output_base.display()
            )));
        }
        self.compile_pattern()?;
        Ok(())
    }

    /// Compiles `label_pattern` case-insensitively and checks it has exactly
    /// one capture group.
    pub fn compile_pattern(&self) -> Result<Regex> {
        let re = RegexBuilder::new(&self.label_pattern).case_insensitive(true).build()?;
        // captures_len counts the implicit whole-match group.
        if re.captures_len() != 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "label_pattern must have exactly one capture group, found {}",
                re.captures_len() - 1
            )));
        }
        Ok(re)
    }

    pub fn alphabet_tokens(&self) -> Vec<&str> {
        self.alphabet.split_whitespace().collect()
    }

    pub fn train_dir(&self) -> PathBuf {
        self.output_base.join(TRAIN_DIR)
    }

    pub fn test_dir(&self) -> PathBuf {
        self.output_base.join(TEST_DIR)
    }

    pub fn langdata_dir(&self) -> PathBuf {
        self.output_base.join(LANGDATA_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.test_dir().join(MANIFEST_NAME)
    }

    pub fn eval_report_path(&self) -> PathBuf {
        self.output_base.join(EVAL_REPORT_NAME)
    }

    /// Model training continues from; `None` when training from scratch.
    /// A custom `.traineddata` path wins over the named base model.
    pub fn start_model(&self) -> Result<Option<StartModel>> {
        if self.from_scratch {
            return Ok(None);
        }
        match &self.custom_base_model {
            Some(path) => StartModel::from_traineddata(path).map(Some).ok_or_else(|| {
                PipelineError::InvalidConfig(format!("custom_base_model {} has no file name", path.display()))
            }),
            None => Ok(Some(StartModel { name: self.base_model.clone(), tessdata_dir: self.tessdata_dir.clone() })),
        }
    }

    pub fn train_request(&self) -> Result<TrainRequest> {
        Ok(TrainRequest {
            model_name: self.model_name.clone(),
            start_model: self.start_model()?,
            tessdata_dir: self.tessdata_dir.clone(),
            max_iterations: self.max_iterations,
            learning_rate: self.learning_rate,
            ground_truth_dir: self.train_dir(),
            eval_list: self.manifest_path(),
        })
    }
}
