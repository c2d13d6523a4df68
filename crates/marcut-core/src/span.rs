//! Span domain model

use serde::{Deserialize, Serialize};

use crate::{CoreError, EntityLabel, Result};

/// Which producer emitted a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    /// Deterministic pattern engine
    Rule,
    /// Language-model extractor
    Model,
    /// Whole-document rescan for entities accepted elsewhere
    ConsistencyPass,
    /// Parenthetical defined term attached to a name or organization
    DefinedTermAlias,
    /// Span reshaped by a label heuristic (address promotion)
    Heuristic,
    /// Any other provider
    External,
}

/// A labeled byte range of the projected text.
///
/// Offsets are byte offsets into the projected UTF-8 text; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub label: EntityLabel,
    pub confidence: f64,
    pub source: SpanSource,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        label: EntityLabel,
        confidence: f64,
        source: SpanSource,
        text: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            label,
            confidence,
            source,
            text: text.into(),
            entity_id: None,
        }
    }

    /// Build a span whose text is sliced from `doc`. Returns `None` when the
    /// range is not a valid, non-empty slice of `doc`.
    pub fn from_range(
        doc: &str,
        start: usize,
        end: usize,
        label: EntityLabel,
        confidence: f64,
        source: SpanSource,
    ) -> Option<Self> {
        if start >= end {
            return None;
        }
        let text = doc.get(start..end)?;
        Some(Self::new(start, end, label, confidence, source, text))
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn overlaps_range(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }

    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }

    /// Check the span against the document it claims to index.
    pub fn validate(&self, doc: &str) -> Result<()> {
        let invalid = |reason| CoreError::InvalidSpan {
            start: self.start,
            end: self.end,
            reason,
        };
        if self.start >= self.end {
            return Err(invalid("empty or inverted range"));
        }
        if self.end > doc.len() {
            return Err(invalid("range exceeds document length"));
        }
        if !doc.is_char_boundary(self.start) || !doc.is_char_boundary(self.end) {
            return Err(invalid("range splits a character"));
        }
        if !self.confidence.is_finite() {
            return Err(invalid("confidence is not a finite number"));
        }
        Ok(())
    }

    /// Move the span to a new range and re-slice its text from `doc`.
    pub fn reslice(&mut self, doc: &str, start: usize, end: usize) {
        self.start = start;
        self.end = end;
        self.text = doc.get(start..end).unwrap_or_default().to_string();
    }
}
