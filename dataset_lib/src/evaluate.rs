//! Accuracy of a trained model on the materialized test records.
//!
//! Both prediction and ground truth are compared with all whitespace
//! removed. Character accuracy is positional: for each sample the longer of
//! the two strings sets the length `L`, and position `i < L` counts as
//! correct only when both strings have the same character there. There is
//! no alignment, so an early insertion or deletion shifts every following
//! position.
//!
//! Per-sample rows also carry the Levenshtein distance between the cleaned
//! strings; it is reported separately and never folded into the positional
//! figure.

use std::{fmt, fs, path::{Path, PathBuf}};

use strsim::levenshtein;
use tesseract_lib::{commands::Recognizer, fs::{list_files, strip_suffix}};
use tracing::{debug, info, instrument};

use crate::{
    error::{PipelineError, Result},
    materialize::{GT_EXT, IMAGE_EXT},
};

/// Removes every whitespace character, including newlines.
pub fn clean_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleScore {
    pub correct_chars: usize,
    /// `max(len(prediction), len(ground_truth))` in characters.
    pub length: usize,
    pub exact: bool,
    pub edit_distance: usize,
    pub truth_chars: usize,
}

/// Scores one already cleaned `(prediction, ground_truth)` pair.
pub fn score_sample(prediction: &str, ground_truth: &str) -> SampleScore {
    let pred: Vec<char> = prediction.chars().collect();
    let truth: Vec<char> = ground_truth.chars().collect();
    let length = pred.len().max(truth.len());
    let correct_chars = (0..length)
        .filter(|&i| matches!((pred.get(i), truth.get(i)), (Some(p), Some(t)) if p == t))
        .count();
    SampleScore {
        correct_chars,
        length,
        exact: prediction == ground_truth,
        edit_distance: levenshtein(prediction, ground_truth),
        truth_chars: truth.len(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccuracyReport {
    pub total_chars: usize,
    pub correct_chars: usize,
    pub total_strings: usize,
    pub correct_strings: usize,
    pub edit_distance: usize,
    pub truth_chars: usize,
}

impl AccuracyReport {
    pub fn add(&mut self, score: &SampleScore) {
        self.total_chars += score.length;
        self.correct_chars += score.correct_chars;
        self.total_strings += 1;
        if score.exact {
            self.correct_strings += 1;
        }
        self.edit_distance += score.edit_distance;
        self.truth_chars += score.truth_chars;
    }

    /// `None` when no characters were evaluated.
    pub fn char_accuracy(&self) -> Option<f64> {
        ratio(self.correct_chars, self.total_chars)
    }

    pub fn string_accuracy(&self) -> Option<f64> {
        ratio(self.correct_strings, self.total_strings)
    }

    /// Summed edit distance over summed ground-truth length.
    pub fn edit_error_rate(&self) -> Option<f64> {
        ratio(self.edit_distance, self.truth_chars)
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 { None } else { Some(num as f64 / den as f64) }
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.char_accuracy() {
            Some(acc) => writeln!(
                f,
                "character accuracy: {:.2}% ({}/{})",
                acc * 100.0,
                self.correct_chars,
                self.total_chars
            )?,
            None => writeln!(f, "character accuracy: no characters evaluated")?,
        }
        match self.string_accuracy() {
            Some(acc) => writeln!(
                f,
                "string accuracy: {:.2}% ({}/{})",
                acc * 100.0,
                self.correct_strings,
                self.total_strings
            )?,
            None => writeln!(f, "string accuracy: no samples evaluated")?,
        }
        if let Some(rate) = self.edit_error_rate() {
            write!(f, "edit distance: {} ({:.2}% of ground truth)", self.edit_distance, rate * 100.0)?;
        }
        Ok(())
    }
}

/// One evaluated test record, as written to the detail report.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EvalRecord {
    pub name: String,
    pub ground_truth: String,
    pub prediction: String,
    pub exact: bool,
    pub correct_chars: usize,
    pub length: usize,
    pub edit_distance: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub report: AccuracyReport,
    pub records: Vec<EvalRecord>,
}

impl Evaluation {
    pub fn push(&mut self, name: &str, prediction: &str, ground_truth: &str) {
        let prediction = clean_text(prediction);
        let ground_truth = clean_text(ground_truth);
        let score = score_sample(&prediction, &ground_truth);
        self.report.add(&score);
        self.records.push(EvalRecord {
            name: name.to_string(),
            ground_truth,
            prediction,
            exact: score.exact,
            correct_chars: score.correct_chars,
            length: score.length,
            edit_distance: score.edit_distance,
        });
    }
}

/// Test images that have a ground-truth sidecar, paired with that sidecar.
pub fn test_pairs(test_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut pairs = Vec::new();
    for image in list_files(test_dir, Some(IMAGE_EXT))? {
        let Some(base) = strip_suffix(&image, IMAGE_EXT) else { continue };
        let mut gt = base.into_os_string();
        gt.push(GT_EXT);
        let gt = PathBuf::from(gt);
        if gt.is_file() {
            pairs.push((image, gt));
        } else {
            debug!(image = %image.display(), "no ground truth sidecar, not evaluated");
        }
    }
    Ok(pairs)
}

/// Runs `recognizer` over every test pair in `test_dir`. A recognizer
/// failure aborts the evaluation.
#[instrument(skip(recognizer), fields(test_dir = %test_dir.display()))]
pub fn evaluate_dir<R: Recognizer + ?Sized>(test_dir: &Path, recognizer: &R) -> Result<Evaluation> {
    let mut evaluation = Evaluation::default();
    for (image, gt) in test_pairs(test_dir)? {
        let ground_truth = fs::read_to_string(&gt).map_err(|err| PipelineError::io(&gt, err))?;
        let prediction = recognizer.recognize(&image)?;
        let name = image.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        evaluation.push(&name, &prediction, &ground_truth);
        debug!(image = %name, prediction = %prediction.trim(), truth = %ground_truth, "evaluated");
    }
    info!(
        samples = evaluation.report.total_strings,
        correct_strings = evaluation.report.correct_strings,
        correct_chars = evaluation.report.correct_chars,
        total_chars = evaluation.report.total_chars,
        "evaluation finished"
    );
    Ok(evaluation)
}

/// Writes per-sample rows as `;`-separated CSV with a header line.
pub fn write_report_csv(path: &Path, records: &[EvalRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|err| PipelineError::io(path, err))
}
