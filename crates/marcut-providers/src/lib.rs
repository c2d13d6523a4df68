//! Span providers for marcut
//!
//! This crate contains:
//! - The `SpanProvider` trait every candidate source implements
//! - A regex pattern provider with built-in identifier rules
//! - A fixed provider for precomputed spans
//! - Concurrent collection with a per-provider timeout

pub mod collect;
pub mod error;
pub mod fixed;
pub mod pattern;
pub mod provider;

pub use collect::{Collected, ProviderReport, ProviderSet};
pub use error::{ProviderError, Result};
pub use fixed::FixedProvider;
pub use pattern::{PatternProvider, PatternRule};
pub use provider::SpanProvider;
