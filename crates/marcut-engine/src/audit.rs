//! Audit trail

use serde::{Deserialize, Serialize};

use marcut_core::{EntityLabel, Span, SpanSource};

/// Maximum characters of span text kept in an audit entry
pub const AUDIT_TEXT_LIMIT: usize = 120;

/// One redacted span as recorded for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub start: usize,
    pub end: usize,
    pub label: EntityLabel,
    pub entity_id: Option<String>,
    pub confidence: f64,
    pub source: SpanSource,
    pub text: String,
}

impl From<&Span> for AuditEntry {
    fn from(span: &Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
            label: span.label,
            entity_id: span.entity_id.clone(),
            confidence: span.confidence,
            source: span.source,
            text: truncate_chars(&span.text, AUDIT_TEXT_LIMIT),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((pos, _)) => text[..pos].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_copies_span() {
        let span = Span::new(3, 13, EntityLabel::Name, 0.9, SpanSource::Model, "Jordan Lee")
            .with_entity_id("NAME_1");
        let entry = AuditEntry::from(&span);
        assert_eq!(entry.entity_id.as_deref(), Some("NAME_1"));
        assert_eq!(entry.text, "Jordan Lee");
        assert_eq!((entry.start, entry.end), (3, 13));
    }

    #[test]
    fn test_text_truncated_on_char_boundary() {
        let long = "é".repeat(200);
        let span = Span::new(0, long.len(), EntityLabel::Org, 0.9, SpanSource::Model, long);
        let entry = AuditEntry::from(&span);
        assert_eq!(entry.text.chars().count(), AUDIT_TEXT_LIMIT);
    }
}
