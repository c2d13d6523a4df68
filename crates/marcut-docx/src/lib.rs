//! WordprocessingML tree handling for marcut
//!
//! This crate contains:
//! - An arena tree for document stories and their auxiliary parts
//! - The text projector and its byte-level position index
//! - The redaction applicator emitting tracked deletions and insertions
//! - Acceptance of pre-existing revisions and XML serialization

pub mod applicator;
pub mod document;
pub mod error;
pub mod node;
pub mod projector;
pub mod revisions;
mod xml;

pub use applicator::{ApplyOptions, ApplyStats, RedactionApplicator};
pub use document::{Document, Part, PartId, PartKind, Section};
pub use error::{DocxError, Result};
pub use node::{NodeId, Tag, XmlNode};
pub use projector::{IndexEntry, PositionIndex, Projection, RevisionView, TextProjector};
pub use revisions::{RevisionSummary, accept_revisions, has_revisions};
