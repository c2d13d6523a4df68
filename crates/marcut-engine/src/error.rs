use thiserror::Error;

use marcut_consolidate::ConsolidateError;
use marcut_docx::DocxError;
use marcut_providers::ProviderError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("document error: {0}")]
    Document(#[from] DocxError),

    #[error("document carries tracked changes and revision acceptance is disabled")]
    PendingRevisions,

    #[error("consolidation error: {0}")]
    Consolidate(#[from] ConsolidateError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
