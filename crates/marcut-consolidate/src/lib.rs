//! Span consolidation for marcut
//!
//! Turns raw candidate spans from any number of providers into a sorted,
//! non-overlapping set aligned to token boundaries:
//! - Validation and exclusion filtering
//! - Overlap merging and boundary snapping
//! - Label heuristics (organization trimming, aliases, addresses)
//! - A consistency rescan for missed mentions

pub mod consistency;
pub mod error;
pub mod exclusion;
pub mod heuristics;
pub mod merge;
pub mod snap;
mod text;

pub use consistency::{CONSISTENCY_CONFIDENCE, ConsistencyPass};
pub use error::{ConsolidateError, Result};
pub use exclusion::ExclusionList;
pub use heuristics::{HeuristicReport, Heuristics};
pub use merge::merge_overlaps;
pub use snap::snap_to_boundaries;

use serde::{Deserialize, Serialize};
use tracing::debug;

use marcut_config::{Config, ConsolidateConfig};
use marcut_core::{EntityLabel, LabelClass, Span};

/// Counts from one consolidation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationStats {
    pub input: usize,
    /// Candidates dropped for bad ranges or confidence
    pub invalid: usize,
    pub excluded_pre: usize,
    /// Spans absorbed by overlap merging
    pub merged: usize,
    pub heuristics: HeuristicReport,
    pub consistency_spans: usize,
    pub excluded_post: usize,
    pub output: usize,
}

/// Final spans plus what happened to the candidates
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub spans: Vec<Span>,
    pub stats: ConsolidationStats,
}

pub struct Consolidator {
    config: ConsolidateConfig,
    exclusions: ExclusionList,
}

impl Consolidator {
    pub fn new(config: ConsolidateConfig, exclusions: ExclusionList) -> Self {
        Self { config, exclusions }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let exclusions = ExclusionList::from_config(&config.exclusions)?;
        Ok(Self::new(config.consolidate.clone(), exclusions))
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    pub fn exclusions_mut(&mut self) -> &mut ExclusionList {
        &mut self.exclusions
    }

    /// Consolidate provider candidates against the projected text.
    pub fn consolidate(&self, text: &str, candidates: Vec<Span>) -> Consolidation {
        let mut stats = ConsolidationStats {
            input: candidates.len(),
            ..Default::default()
        };

        // 1. Drop malformed candidates and re-slice their text
        let spans: Vec<Span> = candidates
            .into_iter()
            .filter_map(|mut span| {
                if let Err(e) = span.validate(text) {
                    debug!("Dropping candidate: {}", e);
                    stats.invalid += 1;
                    return None;
                }
                span.confidence = span.confidence.clamp(0.0, 1.0);
                let (start, end) = (span.start, span.end);
                span.reslice(text, start, end);
                Some(span)
            })
            .collect();

        // 2. Boilerplate before merging
        let before = spans.len();
        let spans = self.filter_excluded(spans);
        stats.excluded_pre = before - spans.len();

        // 3. Overlaps
        let spans = self.merge(text, spans, &mut stats);

        // 4. Token boundaries, then merge what snapping made overlap
        let spans = snap_to_boundaries(text, spans);
        let spans = self.merge(text, spans, &mut stats);

        // 5. Label heuristics
        let heuristics = Heuristics::new(&self.config, &self.exclusions);
        let spans = heuristics.apply(text, spans, &mut stats.heuristics);
        let mut spans = self.merge(text, spans, &mut stats);

        // 6. Missed mentions of accepted entities
        if self.config.consistency_pass {
            let found = ConsistencyPass::new(&self.config).find(text, &spans);
            stats.consistency_spans = found.len();
            spans.extend(found);
        }

        // 7. Boilerplate again, then the final merge
        let before = spans.len();
        let spans = self.filter_excluded(spans);
        stats.excluded_post = before - spans.len();
        let spans = self.merge(text, spans, &mut stats);

        stats.output = spans.len();
        debug!(
            input = stats.input,
            invalid = stats.invalid,
            excluded = stats.excluded_pre + stats.excluded_post,
            merged = stats.merged,
            consistency = stats.consistency_spans,
            output = stats.output,
            "Consolidated spans"
        );

        Consolidation { spans, stats }
    }

    fn merge(&self, text: &str, spans: Vec<Span>, stats: &mut ConsolidationStats) -> Vec<Span> {
        let before = spans.len();
        let merged = merge_overlaps(text, spans);
        stats.merged += before - merged.len();
        merged
    }

    /// Entity-class spans whose text is boilerplate are removed
    fn filter_excluded(&self, spans: Vec<Span>) -> Vec<Span> {
        spans
            .into_iter()
            .filter(|span| {
                if span.label.class() != LabelClass::Entity {
                    return true;
                }
                let excluded = self.exclusions.is_excluded(&span.text)
                    || self.exclusions.is_generic_phrase(&span.text)
                    || (span.label == EntityLabel::Org && self.exclusions.is_generic_org(&span.text));
                if excluded {
                    debug!(label = span.label.as_str(), text = %span.text, "Excluded span");
                }
                !excluded
            })
            .collect()
    }
}
