//! The full run, stage by stage.
//!
//! [`Pipeline::prepare`] builds the corpus (labels, split, records,
//! manifest, language resources) without touching any external tool.
//! [`Pipeline::train`] hands the corpus to a [`Trainer`] and checks that the
//! model artifact exists, and [`Pipeline::evaluate`] scores it through a
//! [`Recognizer`]. Every stage returns a typed result; the first error ends
//! the run.

use std::path::{Path, PathBuf};

use tesseract_lib::{
    commands::{PageSegMode, Recognizer, TesseractCli, Trainer},
    fs::{recreate_dir, remove_file_if_exists},
};
use tracing::{info, warn};

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    evaluate::{evaluate_dir, write_report_csv, Evaluation},
    label::{collect_samples, foreign_chars, LabelExtractor},
    langdata::{write_langdata, LangdataPaths},
    materialize::{materialize, MaterializeStats},
    partition::partition_seeded,
    validate::{validate_corpus, ValidatedCorpus},
};

/// Summary of a finished preparation stage.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedCorpus {
    /// Shuffle seed actually used, for reproducing the split.
    pub seed: u64,
    pub accepted: usize,
    pub no_value: usize,
    pub unmatched: usize,
    pub full_train: bool,
    pub train: MaterializeStats,
    pub test: MaterializeStats,
    pub validated: ValidatedCorpus,
    pub langdata: LangdataPaths,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub corpus: PreparedCorpus,
    pub artifact: PathBuf,
    pub evaluation: Evaluation,
}

pub struct Pipeline {
    config: PipelineConfig,
    extractor: LabelExtractor,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let extractor = LabelExtractor::new(config.compile_pattern()?);
        Ok(Self { config, extractor })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clears everything a previous run generated under `output_base`.
    fn reset_output(&self) -> Result<()> {
        for dir in [self.config.train_dir(), self.config.test_dir(), self.config.langdata_dir()] {
            recreate_dir(dir)?;
        }
        let langdata = LangdataPaths::under(&self.config.output_base);
        for file in [langdata.numbers, langdata.punc, langdata.wordlist, self.config.eval_report_path()] {
            remove_file_if_exists(file)?;
        }
        Ok(())
    }

    pub fn prepare(&self) -> Result<PreparedCorpus> {
        let config = &self.config;
        self.reset_output()?;

        let scan = collect_samples(&config.input_dir, &self.extractor)?;
        let alphabet = config.alphabet_tokens();
        for sample in &scan.samples {
            let foreign = foreign_chars(&sample.label, &alphabet);
            if !foreign.is_empty() {
                warn!(file = %sample.image_path.display(), label = %sample.label, ?foreign, "label has characters outside the alphabet");
            }
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, train_percent = config.train_percent, "partitioning");
        let accepted = scan.samples.len();
        let partition = partition_seeded(scan.samples, config.train_percent, seed)?;

        let train = materialize(&partition.train, &config.train_dir(), 0, &config.model_name)?;
        let test = materialize(&partition.test, &config.test_dir(), 0, &config.model_name)?;

        let validated = validate_corpus(&config.train_dir(), &config.test_dir(), config.min_train, config.min_test)?;
        let langdata = write_langdata(&config.output_base, &config.alphabet)?;

        let corpus = PreparedCorpus {
            seed,
            accepted,
            no_value: scan.no_value,
            unmatched: scan.unmatched,
            full_train: partition.full_train,
            train,
            test,
            validated,
            langdata,
        };
        info!(
            accepted = corpus.accepted,
            train_written = corpus.train.written,
            test_written = corpus.test.written,
            skipped = corpus.train.skipped + corpus.test.skipped,
            manifest = %corpus.validated.manifest.display(),
            "corpus prepared"
        );
        Ok(corpus)
    }

    /// Runs the trainer on the prepared corpus and returns the artifact path.
    pub fn train<T: Trainer + ?Sized>(&self, trainer: &T) -> Result<PathBuf> {
        let request = self.config.train_request()?;
        match std::fs::metadata(&request.eval_list) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            _ => return Err(PipelineError::ManifestWrite(request.eval_list)),
        }
        info!(
            model = %request.model_name,
            start_model = ?request.start_model.as_ref().map(|m| &m.name),
            max_iterations = request.max_iterations,
            learning_rate = request.learning_rate,
            "training"
        );
        let artifact = trainer.train(&request)?;
        if !artifact.is_file() {
            return Err(PipelineError::ArtifactMissing(artifact));
        }
        Ok(artifact)
    }

    /// Scores the test records and writes the per-sample report.
    pub fn evaluate<R: Recognizer + ?Sized>(&self, recognizer: &R) -> Result<Evaluation> {
        let evaluation = evaluate_dir(&self.config.test_dir(), recognizer)?;
        write_report_csv(&self.config.eval_report_path(), &evaluation.records)?;
        Ok(evaluation)
    }

    /// Recognizer for the freshly trained model, found by name next to the
    /// artifact, reading single text lines.
    pub fn recognizer_for(&self, artifact: &Path) -> TesseractCli {
        let tessdata = artifact.parent().unwrap_or_else(|| Path::new("."));
        TesseractCli::new(tessdata, &self.config.model_name, PageSegMode::SingleLine)
    }

    /// prepare -> train -> evaluate.
    pub fn run<T, R, F>(&self, trainer: &T, make_recognizer: F) -> Result<RunReport>
    where
        T: Trainer + ?Sized,
        R: Recognizer,
        F: FnOnce(&Path) -> R,
    {
        let corpus = self.prepare()?;
        let artifact = self.train(trainer)?;
        let recognizer = make_recognizer(&artifact);
        let evaluation = self.evaluate(&recognizer)?;
        Ok(RunReport { corpus, artifact, evaluation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::{cell::RefCell, fs};
    use tesseract_lib::commands::{ToolError, TrainRequest};

    struct FakeTrainer {
        out_dir: PathBuf,
        produce: bool,
        seen: RefCell<Option<TrainRequest>>,
    }

    impl Trainer for FakeTrainer {
        fn train(&self, request: &TrainRequest) -> std::result::Result<PathBuf, ToolError> {
            *self.seen.borrow_mut() = Some(request.clone());
            let artifact = self.out_dir.join(format!("{}.traineddata", request.model_name));
            if self.produce {
                fs::write(&artifact, b"model").unwrap();
            }
            Ok(artifact)
        }
    }

    /// Reads the answer from the sidecar, with OCR-style trailing newline.
    struct OracleRecognizer;

    impl Recognizer for OracleRecognizer {
        fn recognize(&self, image: &Path) -> std::result::Result<String, ToolError> {
            let gt = image.with_extension("gt.txt");
            Ok(format!("{}\n", fs::read_to_string(gt).unwrap()))
        }
    }

    fn write_inputs(dir: &Path, count: usize) {
        fs::create_dir_all(dir).unwrap();
        for i in 0..count {
            let name = format!("meter_{:02}_{}.0BB.png", i, i + 1);
            RgbImage::from_pixel(6, 3, Rgb([0, 0, 0])).save(dir.join(name)).unwrap();
        }
    }

    fn config(root: &Path, train_percent: f64) -> PipelineConfig {
        PipelineConfig {
            input_dir: root.join("source"),
            output_base: root.join("out"),
            train_percent,
            seed: Some(11),
            model_name: "meter".to_string(),
            alphabet: "0 1 2 3 4 5 6 7 8 9 B".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn twelve_images_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(&tmp.path().join("source"), 12);
        fs::write(tmp.path().join("source").join("meter_NO_VALUE_3BB.png"), b"").unwrap();

        let pipeline = Pipeline::new(config(tmp.path(), 83.34)).unwrap();
        let trainer = FakeTrainer { out_dir: tmp.path().to_path_buf(), produce: true, seen: RefCell::new(None) };
        let report = pipeline.run(&trainer, |_artifact| OracleRecognizer).unwrap();

        let corpus = &report.corpus;
        assert_eq!(corpus.accepted, 12);
        assert_eq!(corpus.no_value, 1);
        assert_eq!(corpus.train, MaterializeStats { written: 10, skipped: 0 });
        assert_eq!(corpus.test, MaterializeStats { written: 2, skipped: 0 });
        assert_eq!(corpus.validated.manifest_entries, 2);

        let manifest = fs::read_to_string(tmp.path().join("out/test/list.txt")).unwrap();
        assert_eq!(manifest.lines().count(), 2);
        let unicharset = fs::read_to_string(tmp.path().join("out/langdata/unicharset")).unwrap();
        assert_eq!(unicharset.lines().count(), 11);
        assert!(tmp.path().join("out/numbers").is_file());

        let label = fs::read_to_string(tmp.path().join("out/train/meter_000000.gt.txt")).unwrap();
        assert!(label.ends_with("BB") && !label.contains('.'));

        let seen = trainer.seen.borrow().clone().unwrap();
        assert_eq!(seen.ground_truth_dir, tmp.path().join("out/train"));
        assert_eq!(seen.start_model.unwrap().name, "eng");

        assert_eq!(report.evaluation.report.string_accuracy(), Some(1.0));
        assert_eq!(report.evaluation.report.char_accuracy(), Some(1.0));
        assert!(tmp.path().join("out/evaluation.csv").is_file());
    }

    #[test]
    fn second_run_replaces_previous_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(&tmp.path().join("source"), 12);
        let pipeline = Pipeline::new(config(tmp.path(), 100.0)).unwrap();
        pipeline.prepare().unwrap();
        fs::write(tmp.path().join("out/train/stale.png"), b"").unwrap();

        let corpus = pipeline.prepare().unwrap();
        assert!(corpus.full_train);
        assert_eq!(corpus.train.written, 12);
        assert_eq!(corpus.test.written, 1);
        assert!(!tmp.path().join("out/train/stale.png").exists());
    }

    #[test]
    fn single_sample_fails_train_threshold() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(&tmp.path().join("source"), 1);
        let pipeline = Pipeline::new(config(tmp.path(), 90.0)).unwrap();
        let err = pipeline.prepare().unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientTrainData { found: 0, required: 10 }));
    }

    #[test]
    fn no_matching_files_is_empty_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("source")).unwrap();
        fs::write(tmp.path().join("source/readme.txt"), b"").unwrap();
        let pipeline = Pipeline::new(config(tmp.path(), 90.0)).unwrap();
        assert!(matches!(pipeline.prepare(), Err(PipelineError::EmptyDataset)));
    }

    #[test]
    fn missing_artifact_stops_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(&tmp.path().join("source"), 12);
        let pipeline = Pipeline::new(config(tmp.path(), 83.34)).unwrap();
        let trainer = FakeTrainer { out_dir: tmp.path().to_path_buf(), produce: false, seen: RefCell::new(None) };
        let err = pipeline.run(&trainer, |_| OracleRecognizer).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactMissing(_)));
        assert_eq!(err.exit_code(), 8);
    }

    #[test]
    fn training_without_manifest_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(tmp.path(), 90.0)).unwrap();
        let trainer = FakeTrainer { out_dir: tmp.path().to_path_buf(), produce: true, seen: RefCell::new(None) };
        assert!(matches!(pipeline.train(&trainer), Err(PipelineError::ManifestWrite(_))));
        assert!(trainer.seen.borrow().is_none());
    }

    #[test]
    fn training_with_empty_manifest_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(tmp.path(), 90.0)).unwrap();
        fs::create_dir_all(tmp.path().join("out/test")).unwrap();
        fs::write(tmp.path().join("out/test/list.txt"), b"").unwrap();
        let trainer = FakeTrainer { out_dir: tmp.path().to_path_buf(), produce: true, seen: RefCell::new(None) };
        let err = pipeline.train(&trainer).unwrap_err();
        assert!(matches!(err, PipelineError::ManifestWrite(_)));
        assert_eq!(err.exit_code(), 7);
        assert!(trainer.seen.borrow().is_none());
    }

    #[test]
    fn recognizer_uses_artifact_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(tmp.path(), 90.0)).unwrap();
        let cli = pipeline.recognizer_for(Path::new("/opt/tesstrain/data/meter.traineddata"));
        assert_eq!(cli.tessdata_dir, PathBuf::from("/opt/tesstrain/data"));
        assert_eq!(cli.lang, "meter");
        assert_eq!(cli.psm, PageSegMode::SingleLine);
    }
}
