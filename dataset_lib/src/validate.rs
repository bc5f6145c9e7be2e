//! Minimum-count checks on the materialized corpus and the evaluation
//! manifest consumed by the trainer.

use std::{fs, path::{Path, PathBuf}};

use tesseract_lib::fs::{count_files, list_files, strip_suffix};
use tracing::info;

use crate::{
    config::MANIFEST_NAME,
    error::{PipelineError, Result},
    materialize::{GT_EXT, IMAGE_EXT},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedCorpus {
    pub train_count: usize,
    pub test_count: usize,
    pub manifest: PathBuf,
    pub manifest_entries: usize,
}

/// Checks `train_dir` holds at least `min_train` images and `test_dir` at
/// least `min_test`, then writes `<test_dir>/list.txt`.
pub fn validate_corpus(train_dir: &Path, test_dir: &Path, min_train: usize, min_test: usize) -> Result<ValidatedCorpus> {
    let train_count = count_files(train_dir, IMAGE_EXT)?;
    if train_count < min_train {
        return Err(PipelineError::InsufficientTrainData { found: train_count, required: min_train });
    }
    let test_count = count_files(test_dir, IMAGE_EXT)?;
    if test_count < min_test {
        return Err(PipelineError::InsufficientTestData { found: test_count, required: min_test });
    }

    let (manifest, manifest_entries) = write_manifest(test_dir)?;
    info!(train_count, test_count, manifest = %manifest.display(), "corpus validated");
    Ok(ValidatedCorpus { train_count, test_count, manifest, manifest_entries })
}

/// One base path (sidecar path without `.gt.txt`) per line, sorted.
/// Fails when the resulting file is missing or empty.
pub fn write_manifest(test_dir: &Path) -> Result<(PathBuf, usize)> {
    let manifest = test_dir.join(MANIFEST_NAME);
    let bases: Vec<PathBuf> = list_files(test_dir, Some(GT_EXT))?
        .iter()
        .filter_map(|gt| strip_suffix(gt, GT_EXT))
        .collect();

    let contents: String = bases.iter().map(|base| format!("{}\n", base.display())).collect();
    fs::write(&manifest, contents).map_err(|err| PipelineError::io(&manifest, err))?;

    match fs::metadata(&manifest) {
        Ok(meta) if meta.len() > 0 => Ok((manifest, bases.len())),
        _ => Err(PipelineError::ManifestWrite(manifest)),
    }
}
