use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown entity label: {0}")]
    UnknownLabel(String),

    #[error("Invalid span {start}..{end}: {reason}")]
    InvalidSpan {
        start: usize,
        end: usize,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
