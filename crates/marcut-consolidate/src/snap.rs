//! Boundary snapping
//!
//! Spans grow outward to whole tokens (`20[DATE]25` becomes `[DATE]`) and then
//! shed leading and trailing punctuation.

use marcut_core::{EntityLabel, Span};

use crate::text::ends_with_abbreviation;

/// Which characters count as part of a token for a label
#[derive(Debug, Clone, Copy)]
enum TokenClass {
    /// Letters and digits, with inner `-` and `'`
    Word,
    /// Digits bridged by the given punctuation
    Numeric(&'static str),
    Alnum,
}

fn token_class(label: EntityLabel) -> TokenClass {
    match label {
        EntityLabel::Name | EntityLabel::Org | EntityLabel::Brand | EntityLabel::Loc => {
            TokenClass::Word
        }
        EntityLabel::Phone | EntityLabel::Ssn | EntityLabel::Card | EntityLabel::Account => {
            TokenClass::Numeric("-().+ ")
        }
        EntityLabel::Money | EntityLabel::Number | EntityLabel::Percent => {
            TokenClass::Numeric(".,")
        }
        _ => TokenClass::Alnum,
    }
}

fn is_joiner(c: char) -> bool {
    matches!(c, '-' | '\'' | '\u{2019}')
}

/// A digit group that can continue a phone or card number across a space:
/// `555`, `(555)`, `123-4567`, `+1`
fn is_number_group(token: &str) -> bool {
    let token = token.trim_end_matches(|c: char| ".,;:".contains(c));
    if let Some(code) = token.strip_prefix('+') {
        return (1..=3).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit());
    }
    let inner = token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(token);
    !inner.is_empty()
        && inner
            .split(['-', '.'])
            .all(|g| (3..=4).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

fn char_before(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

fn char_after(text: &str, pos: usize) -> Option<char> {
    text[pos..].chars().next()
}

/// New start if the span can take one more character on the left
fn step_left(text: &str, pos: usize, class: TokenClass) -> Option<usize> {
    let c = char_before(text, pos)?;
    let next = pos - c.len_utf8();
    let take = match class {
        TokenClass::Alnum => c.is_alphanumeric(),
        TokenClass::Word => {
            c.is_alphanumeric()
                || (is_joiner(c) && char_before(text, next).is_some_and(char::is_alphanumeric))
        }
        TokenClass::Numeric(bridge) if c == ' ' => {
            bridge.contains(' ')
                && text[..next]
                    .rsplit(char::is_whitespace)
                    .next()
                    .is_some_and(is_number_group)
        }
        TokenClass::Numeric(bridge) => {
            c.is_ascii_digit()
                || (bridge.contains(c)
                    && char_before(text, next).is_some_and(|b| b.is_ascii_digit()))
                || (c == '('
                    && bridge.contains(c)
                    && char_after(text, pos).is_some_and(|a| a.is_ascii_digit()))
        }
    };
    take.then_some(next)
}

/// New end if the span can take one more character on the right
fn step_right(text: &str, pos: usize, class: TokenClass) -> Option<usize> {
    let c = char_after(text, pos)?;
    let next = pos + c.len_utf8();
    let take = match class {
        TokenClass::Alnum => c.is_alphanumeric(),
        TokenClass::Word => {
            if c.is_alphanumeric() {
                true
            } else if is_joiner(c) {
                let possessive = c != '-'
                    && char_after(text, next) == Some('s')
                    && !char_after(text, next + 1).is_some_and(char::is_alphanumeric);
                !possessive && char_after(text, next).is_some_and(char::is_alphanumeric)
            } else {
                false
            }
        }
        TokenClass::Numeric(bridge) if c == ' ' => {
            bridge.contains(' ')
                && text[next..]
                    .split(char::is_whitespace)
                    .next()
                    .is_some_and(is_number_group)
        }
        TokenClass::Numeric(bridge) => {
            c.is_ascii_digit()
                || (bridge.contains(c) && char_after(text, next).is_some_and(|a| a.is_ascii_digit()))
                || (c == ')'
                    && bridge.contains(c)
                    && char_before(text, pos).is_some_and(|b| b.is_ascii_digit()))
        }
    };
    take.then_some(next)
}

fn keeps_leading(c: char, rest: &str, label: EntityLabel) -> bool {
    c.is_alphanumeric()
        || (c == '(' && rest.contains(')'))
        || (label == EntityLabel::Money && matches!(c, '$' | '\u{20ac}' | '\u{a3}' | '\u{a5}'))
}

fn keeps_trailing(c: char, slice: &str, label: EntityLabel) -> bool {
    if c.is_alphanumeric() {
        return true;
    }
    match c {
        ')' => slice.matches('(').count() >= slice.matches(')').count(),
        '.' => ends_with_abbreviation(slice),
        '%' => label == EntityLabel::Percent,
        _ => false,
    }
}

/// Snap every span to token boundaries; spans left empty are dropped.
pub fn snap_to_boundaries(text: &str, spans: Vec<Span>) -> Vec<Span> {
    spans
        .into_iter()
        .filter_map(|mut span| {
            let class = token_class(span.label);
            let (mut start, mut end) = (span.start, span.end);

            while let Some(next) = step_left(text, start, class) {
                start = next;
            }
            while let Some(next) = step_right(text, end, class) {
                end = next;
            }

            while let Some(c) = text[start..end].chars().next() {
                if keeps_leading(c, &text[start + c.len_utf8()..end], span.label) {
                    break;
                }
                start += c.len_utf8();
            }
            while let Some(c) = text[start..end].chars().next_back() {
                if keeps_trailing(c, &text[start..end], span.label) {
                    break;
                }
                end -= c.len_utf8();
            }

            if start >= end {
                return None;
            }
            if (start, end) != (span.start, span.end) {
                span.reslice(text, start, end);
            }
            Some(span)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marcut_core::SpanSource;

    fn snap_one(text: &str, start: usize, end: usize, label: EntityLabel) -> Option<String> {
        let span = Span::from_range(text, start, end, label, 0.9, SpanSource::Model).unwrap();
        snap_to_boundaries(text, vec![span])
            .pop()
            .map(|s| s.text)
    }

    #[test]
    fn test_expands_partial_tokens() {
        assert_eq!(snap_one("Dated 2025 here", 8, 10, EntityLabel::Date).unwrap(), "2025");
        assert_eq!(snap_one("Mr Johnson", 4, 7, EntityLabel::Name).unwrap(), "Johnson");
    }

    #[test]
    fn test_name_joiners() {
        let text = "Dear O'Brien-Smith,";
        assert_eq!(snap_one(text, 7, 12, EntityLabel::Name).unwrap(), "O'Brien-Smith");
    }

    #[test]
    fn test_possessive_not_absorbed() {
        assert_eq!(snap_one("John's car", 0, 3, EntityLabel::Name).unwrap(), "John");
    }

    #[test]
    fn test_phone_bridging() {
        let text = "call 555-123-4567 now";
        assert_eq!(snap_one(text, 9, 12, EntityLabel::Phone).unwrap(), "555-123-4567");
    }

    #[test]
    fn test_phone_does_not_absorb_neighbouring_numbers() {
        let text = "Room 12 555-123-4567";
        assert_eq!(snap_one(text, 8, 20, EntityLabel::Phone).unwrap(), "555-123-4567");
        let text = "Phone 555 123 4567 ext";
        assert_eq!(snap_one(text, 10, 13, EntityLabel::Phone).unwrap(), "555 123 4567");
        let text = "Call (555) 123-4567.";
        assert_eq!(snap_one(text, 11, 19, EntityLabel::Phone).unwrap(), "(555) 123-4567");
    }

    #[test]
    fn test_trims_punctuation() {
        assert_eq!(snap_one("said \"Acme\", then", 5, 11, EntityLabel::Org).unwrap(), "Acme");
        assert_eq!(snap_one("Acme Inc. agreed", 0, 9, EntityLabel::Org).unwrap(), "Acme Inc.");
        assert_eq!(snap_one("the deal. Later", 4, 9, EntityLabel::Org).unwrap(), "deal");
    }

    #[test]
    fn test_balanced_parentheses_kept() {
        let text = "Call (555) 123-4567.";
        assert_eq!(snap_one(text, 5, 19, EntityLabel::Phone).unwrap(), "(555) 123-4567");
        let text = "Acme (Europe) Ltd";
        assert_eq!(snap_one(text, 0, 13, EntityLabel::Org).unwrap(), "Acme (Europe)");
    }

    #[test]
    fn test_punctuation_only_span_dropped() {
        assert!(snap_one("a -- b", 2, 4, EntityLabel::Name).is_none());
    }

    #[test]
    fn test_money_and_percent_symbols() {
        assert_eq!(snap_one("pay $1,000.50 now", 4, 13, EntityLabel::Money).unwrap(), "$1,000.50");
        assert_eq!(snap_one("rate 15% fixed", 5, 8, EntityLabel::Percent).unwrap(), "15%");
    }
}
