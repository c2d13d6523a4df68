//! Entity clustering for marcut
//!
//! Mentions of the same person, organization or brand share one identifier
//! (`NAME_1`, `ORG_2`) so every mention gets the same tag. Other labels are
//! numbered per exact text.

pub mod similarity;
pub mod table;

pub use similarity::{normalize, token_set_ratio};
pub use table::{AGREEMENT_BOOST, ClusterEntry, ClusterTable, DEFAULT_THRESHOLD, Link};
