//! Core domain models for marcut
//!
//! This crate contains:
//! - Entity labels and their overlap priority
//! - Spans (candidate and final) and their provenance
//! - Replacements derived from final spans

pub mod error;
pub mod label;
pub mod replacement;
pub mod span;

pub use error::{CoreError, Result};
pub use label::{EntityLabel, LabelClass};
pub use replacement::Replacement;
pub use span::{Span, SpanSource};
