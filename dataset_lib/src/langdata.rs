//! Auxiliary language resources derived from the configured alphabet.

use std::{fs, path::{Path, PathBuf}};

use tesseract_lib::fs::dir_exists;
use tracing::info;

use crate::{config::LANGDATA_DIR, error::{PipelineError, Result}};

pub const UNICHARSET_NAME: &str = "unicharset";
pub const NUMBERS_NAME: &str = "numbers";
pub const PUNC_NAME: &str = "punc";
pub const WORDLIST_NAME: &str = "wordlist";

pub const NUMBERS: &str = "0123456789";
pub const PUNC: &str = ".";
pub const WORDLIST: &str = "0";

#[derive(Clone, Debug, PartialEq)]
pub struct LangdataPaths {
    pub unicharset: PathBuf,
    pub numbers: PathBuf,
    pub punc: PathBuf,
    pub wordlist: PathBuf,
}

impl LangdataPaths {
    pub fn under(output_base: &Path) -> Self {
        Self {
            unicharset: output_base.join(LANGDATA_DIR).join(UNICHARSET_NAME),
            numbers: output_base.join(NUMBERS_NAME),
            punc: output_base.join(PUNC_NAME),
            wordlist: output_base.join(WORDLIST_NAME),
        }
    }
}

/// One alphabet token per line.
pub fn unicharset_contents(alphabet: &str) -> String {
    alphabet.split_whitespace().map(|token| format!("{}\n", token)).collect()
}

pub fn write_langdata(output_base: &Path, alphabet: &str) -> Result<LangdataPaths> {
    let paths = LangdataPaths::under(output_base);
    dir_exists(output_base.join(LANGDATA_DIR), true)?;

    let files = [
        (&paths.unicharset, unicharset_contents(alphabet)),
        (&paths.numbers, format!("{}\n", NUMBERS)),
        (&paths.punc, format!("{}\n", PUNC)),
        (&paths.wordlist, format!("{}\n", WORDLIST)),
    ];
    for (path, contents) in files {
        fs::write(path, contents).map_err(|err| PipelineError::io(path, err))?;
    }
    info!(unicharset = %paths.unicharset.display(), "language resources written");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicharset_has_one_token_per_line() {
        assert_eq!(unicharset_contents("0 1  2\tB"), "0\n1\n2\nB\n");
    }

    #[test]
    fn writes_all_four_files() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = write_langdata(tmp.path(), "0 1 2 . A").unwrap();
        assert_eq!(fs::read_to_string(&paths.unicharset).unwrap().lines().count(), 5);
        assert_eq!(fs::read_to_string(&paths.numbers).unwrap().trim(), NUMBERS);
        assert_eq!(fs::read_to_string(&paths.punc).unwrap().trim(), PUNC);
        assert_eq!(fs::read_to_string(&paths.wordlist).unwrap().trim(), WORDLIST);
        assert_eq!(paths.unicharset, tmp.path().join("langdata").join("unicharset"));
    }
}
