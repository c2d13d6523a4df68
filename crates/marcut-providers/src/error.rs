use thiserror::Error;

use marcut_core::CoreError;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid pattern for {label}: {source}")]
    InvalidPattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Label(#[from] CoreError),

    #[error("failed to parse spans: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
