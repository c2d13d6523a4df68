//! Replacement derivation
//!
//! A replacement is the final, applicator-facing form of an accepted span:
//! the consumed byte range plus the tag that stands in for it.

use serde::{Deserialize, Serialize};

use crate::Span;

/// Possessive suffixes kept outside the bracketed tag
const POSSESSIVE_SUFFIXES: [&str; 2] = ["'s", "\u{2019}s"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// Start of the consumed range
    pub start: usize,
    /// End of the consumed range, including a possessive suffix when present
    pub end: usize,
    /// Tag inserted in place of the span, e.g. `[NAME_1]`
    pub tag: String,
    pub possessive: bool,
    /// Possessive suffix as it appeared in the document; left in place as plain text
    pub suffix: String,
}

impl Replacement {
    /// Derive the replacement for `span` against the projected `text`.
    pub fn derive(text: &str, span: &Span) -> Self {
        let id = span
            .entity_id
            .clone()
            .unwrap_or_else(|| span.label.as_str().to_string());

        let mut end = span.end;
        let mut suffix = String::new();
        if let Some(rest) = text.get(span.end..) {
            for candidate in POSSESSIVE_SUFFIXES {
                if let Some(after) = rest.strip_prefix(candidate) {
                    if !after.starts_with(|c: char| c.is_alphanumeric()) {
                        suffix = candidate.to_string();
                        end += candidate.len();
                        break;
                    }
                }
            }
        }

        let left_bracket = text
            .get(..span.start)
            .is_some_and(|before| before.ends_with('['));
        let right_bracket = text.get(end..).is_some_and(|after| after.starts_with(']'));
        let tag = if left_bracket && right_bracket {
            id
        } else {
            format!("[{}]", id)
        };

        Self {
            start: span.start,
            end,
            tag,
            possessive: !suffix.is_empty(),
            suffix,
        }
    }

    /// Text a reader sees in place of the consumed range
    pub fn rendered(&self) -> String {
        format!("{}{}", self.tag, self.suffix)
    }
}
