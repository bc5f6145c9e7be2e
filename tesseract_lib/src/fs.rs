//! Filesystem helpers shared by the corpus preparation crates.
//!
//! Directory checks, per-run directory recreation and sorted, suffix-filtered
//! file listing. Listings are always sorted so that downstream stages see
//! the same order on every platform.

use std::{fs, io, path::{Path, PathBuf}};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("{0}: dir is not found")]
    NotFound(PathBuf),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    fn io<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }
}

/// Checks whether a directory exists.
///
/// When `need_create` is `true` and the path is absent, all missing directory
/// components are created.
pub fn dir_exists<P: AsRef<Path>>(path: P, need_create: bool) -> Result<(), FsError> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(());
    }
    if need_create {
        return fs::create_dir_all(path).map_err(|err| FsError::io(path, err));
    }
    Err(FsError::NotFound(path.to_path_buf()))
}

/// Removes `path` with everything below it (if present) and creates it empty.
pub fn recreate_dir<P: AsRef<Path>>(path: P) -> Result<(), FsError> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_dir_all(path).map_err(|err| FsError::io(path, err))?;
    }
    fs::create_dir_all(path).map_err(|err| FsError::io(path, err))
}

/// Removes a single file if it exists.
pub fn remove_file_if_exists<P: AsRef<Path>>(path: P) -> Result<(), FsError> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(FsError::io(path, err)),
    }
}

/// Lists full paths of the direct file children of a directory, sorted.
///
/// Subdirectories are skipped. When `suffix` is `Some(s)` only files whose
/// name ends with `s` (ASCII case-insensitive) are returned, so multi-part
/// suffixes such as `.gt.txt` work as expected.
pub fn list_files<P: AsRef<Path>>(in_path: P, suffix: Option<&str>) -> Result<Vec<PathBuf>, FsError> {
    let in_path = in_path.as_ref();
    let entries = fs::read_dir(in_path).map_err(|err| FsError::io(in_path, err))?;
    let suffix = suffix.map(|s| s.to_ascii_lowercase());

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| FsError::io(in_path, err))?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(suffix) = &suffix {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_ascii_lowercase(),
                None => continue,
            };
            if !name.ends_with(suffix.as_str()) {
                continue;
            }
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Counts direct file children whose name ends with `suffix`.
pub fn count_files<P: AsRef<Path>>(in_path: P, suffix: &str) -> Result<usize, FsError> {
    Ok(list_files(in_path, Some(suffix))?.len())
}

/// Strips a multi-part suffix such as `.gt.txt` from a path, keeping the
/// directory part. Returns `None` when the file name does not carry it.
pub fn strip_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(suffix)?;
    Some(path.with_file_name(stem))
}
