use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("failed to read exclusion file {path}: {source}")]
    ExclusionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConsolidateError>;
