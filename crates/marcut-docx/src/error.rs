use thiserror::Error;

use crate::{NodeId, PartId};

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("document has no body attached to its root")]
    MissingBody,

    #[error("node {0} does not exist in this document")]
    UnknownNode(NodeId),

    #[error("part {0} does not exist or has no readable content")]
    UnknownPart(PartId),

    #[error("node {id} is a {found}, expected {expected}")]
    UnexpectedNode {
        id: NodeId,
        expected: &'static str,
        found: String,
    },

    #[error("failed to format revision timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, DocxError>;
