//! Writes partition samples to disk as `<model>_<NNNNNN>.png` plus a
//! `<model>_<NNNNNN>.gt.txt` sidecar holding the label.

use std::{fs, path::Path};

use images::png::base::ImagePNG;
use tracing::{info, instrument, warn};

use crate::{error::{PipelineError, Result}, label::Sample};

pub const IMAGE_EXT: &str = ".png";
pub const GT_EXT: &str = ".gt.txt";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub written: usize,
    pub skipped: usize,
}

pub fn record_basename(model_name: &str, index: usize) -> String {
    format!("{}_{:06}", model_name, index)
}

/// Materializes `samples` into `dest`, numbering records from `start_index`
/// in partition order. Unreadable source images are logged and skipped;
/// failures writing into `dest` abort the batch.
#[instrument(skip(samples), fields(dest = %dest.display(), count = samples.len()))]
pub fn materialize(samples: &[Sample], dest: &Path, start_index: usize, model_name: &str) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();

    for (position, sample) in samples.iter().enumerate() {
        let basename = record_basename(model_name, start_index + position);

        let image = match ImagePNG::read(&sample.image_path) {
            Ok(image) => image,
            Err(err) => {
                warn!(file = %sample.image_path.display(), reason = %err, "skipping unreadable image");
                stats.skipped += 1;
                continue;
            }
        };

        image.write(dest.join(format!("{}{}", basename, IMAGE_EXT)))?;
        let gt_path = dest.join(format!("{}{}", basename, GT_EXT));
        fs::write(&gt_path, sample.label.as_bytes()).map_err(|err| PipelineError::io(&gt_path, err))?;
        stats.written += 1;
    }

    info!(written = stats.written, skipped = stats.skipped, "records materialized");
    Ok(stats)
}
