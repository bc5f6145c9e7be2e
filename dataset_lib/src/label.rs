//! Ground-truth labels from image file names.
//!
//! A file name yields a label when it does not carry the `NO_VALUE` marker
//! and the configured pattern matches it. The last (rightmost) match wins and
//! its single capture group is the raw label.

use std::path::{Path, PathBuf};

use regex::Regex;
use tesseract_lib::fs::{dir_exists, list_files};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

pub const NO_VALUE_MARKER: &str = "NO_VALUE";

/// One training unit: a source image and the label derived from its name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub image_path: PathBuf,
    pub label: String,
}

/// Outcome of looking at one file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    Label(String),
    NoValue,
    NoMatch,
}

#[derive(Clone, Debug)]
pub struct LabelExtractor {
    pattern: Regex,
}

impl LabelExtractor {
    /// `pattern` must already be compiled case-insensitively with exactly
    /// one capture group (see `PipelineConfig::compile_pattern`).
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn classify(&self, file_name: &str) -> Extraction {
        if file_name.to_uppercase().contains(NO_VALUE_MARKER) {
            return Extraction::NoValue;
        }
        let raw = self
            .pattern
            .captures_iter(file_name)
            .last()
            .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()));
        match raw {
            Some(raw) => Extraction::Label(normalize_label(&raw)),
            None => Extraction::NoMatch,
        }
    }

    pub fn extract(&self, file_name: &str) -> Option<String> {
        match self.classify(file_name) {
            Extraction::Label(label) => Some(label),
            _ => None,
        }
    }
}

/// Drops the first `.0` that ends a numeric part of a label, so that whole
/// numbers written with a trailing zero decimal read the same as plain
/// integers: `12.0BB` -> `12BB`, `12.0` -> `12`, `12.05` and `7BB` unchanged.
pub fn normalize_label(raw: &str) -> String {
    let cut = raw
        .match_indices(".0")
        .find(|(idx, _)| !raw[idx + 2..].starts_with(|c: char| c.is_ascii_digit()));
    match cut {
        Some((idx, _)) => format!("{}{}", &raw[..idx], &raw[idx + 2..]),
        None => raw.to_string(),
    }
}

/// Accepted samples plus counters for what was left out.
#[derive(Clone, Debug, Default)]
pub struct SampleScan {
    pub samples: Vec<Sample>,
    pub no_value: usize,
    pub unmatched: usize,
}

/// Lists `input_dir` (sorted, files only) and extracts a label for each file.
pub fn collect_samples(input_dir: &Path, extractor: &LabelExtractor) -> Result<SampleScan> {
    if dir_exists(input_dir, false).is_err() {
        return Err(PipelineError::InputDirMissing(input_dir.to_path_buf()));
    }

    let mut scan = SampleScan::default();
    for path in list_files(input_dir, None)? {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(file = %path.display(), "skipping file with non UTF-8 name");
            scan.unmatched += 1;
            continue;
        };
        match extractor.classify(file_name) {
            Extraction::Label(label) => scan.samples.push(Sample { image_path: path.clone(), label }),
            Extraction::NoValue => {
                debug!(file = file_name, "excluded by {} marker", NO_VALUE_MARKER);
                scan.no_value += 1;
            }
            Extraction::NoMatch => {
                debug!(file = file_name, "label pattern did not match");
                scan.unmatched += 1;
            }
        }
    }
    info!(
        accepted = scan.samples.len(),
        no_value = scan.no_value,
        unmatched = scan.unmatched,
        "labels extracted"
    );
    Ok(scan)
}

/// Labels holding characters that are not alphabet tokens. Only used for
/// warnings; such samples are still part of the corpus.
pub fn foreign_chars(label: &str, alphabet: &[&str]) -> Vec<char> {
    let mut foreign: Vec<char> = label
        .chars()
        .filter(|c| !alphabet.iter().any(|token| token.chars().eq(std::iter::once(*c))))
        .collect();
    foreign.sort_unstable();
    foreign.dedup();
    foreign
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn extractor() -> LabelExtractor {
        LabelExtractor::new(PipelineConfig::default().compile_pattern().unwrap())
    }

    #[test]
    fn no_value_marker_excludes_any_case() {
        let ex = extractor();
        assert_eq!(ex.classify("meter_NO_VALUE_12BB.png"), Extraction::NoValue);
        assert_eq!(ex.classify("meter_no_value_12BB.png"), Extraction::NoValue);
        assert_eq!(ex.classify("No_Value_3.png"), Extraction::NoValue);
        assert_eq!(ex.extract("meter_nO_vAlUe.png"), None);
    }

    #[test]
    fn trailing_zero_decimal_is_dropped() {
        let ex = extractor();
        assert_eq!(ex.extract("meter_12.0BB.png").as_deref(), Some("12BB"));
        assert_eq!(ex.extract("meter_7BB.png").as_deref(), Some("7BB"));
        assert_eq!(ex.extract("meter_12.0.png").as_deref(), Some("12"));
        assert_eq!(ex.extract("meter_12.05.png").as_deref(), Some("12.05"));
    }

    #[test]
    fn normalize_label_cases() {
        assert_eq!(normalize_label("12.0BB"), "12BB");
        assert_eq!(normalize_label("12.0"), "12");
        assert_eq!(normalize_label("7BB"), "7BB");
        assert_eq!(normalize_label("3.05"), "3.05");
        assert_eq!(normalize_label("1.0A2.0B"), "1A2.0B");
        assert_eq!(normalize_label("1.05.0B"), "1.05B");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn matching_is_case_insensitive_and_rightmost() {
        let ex = extractor();
        assert_eq!(ex.extract("METER_42ab.PNG").as_deref(), Some("42ab"));

        let re = regex::RegexBuilder::new(r"v([0-9]+)").case_insensitive(true).build().unwrap();
        let ex = LabelExtractor::new(re);
        assert_eq!(ex.extract("v1_V2_v3.png").as_deref(), Some("3"));
    }

    #[test]
    fn unmatched_names_are_skipped() {
        let ex = extractor();
        assert_eq!(ex.classify("readme.txt"), Extraction::NoMatch);
        assert_eq!(ex.classify("meter.png"), Extraction::NoMatch);
    }

    #[test]
    fn collect_samples_counts_exclusions() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b_2A.png", "a_1.0B.png", "c_NO_VALUE.png", "notes.md"] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        let scan = collect_samples(tmp.path(), &extractor()).unwrap();
        let labels: Vec<_> = scan.samples.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["1B", "2A"]);
        assert_eq!(scan.no_value, 1);
        assert_eq!(scan.unmatched, 1);
    }

    #[test]
    fn missing_input_dir_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = collect_samples(&tmp.path().join("nope"), &extractor()).unwrap_err();
        assert!(matches!(err, PipelineError::InputDirMissing(_)));
    }

    #[test]
    fn foreign_chars_are_reported_once() {
        let alphabet = ["1", "2", "B"];
        assert_eq!(foreign_chars("12BB", &alphabet), Vec::<char>::new());
        assert_eq!(foreign_chars("1XX2", &alphabet), vec!['X']);
        assert_eq!(foreign_chars("X1YX", &alphabet), vec!['X', 'Y']);
    }
}
