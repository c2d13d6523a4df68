//! Regex pattern provider
//!
//! Rules run in registration order; every match becomes a `Rule` span.
//! Built-in rules cover structured identifiers only, names and organizations
//! are left to model providers.

use std::str::FromStr;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use marcut_config::ProviderConfig;
use marcut_core::{EntityLabel, Span, SpanSource};

use crate::error::{ProviderError, Result};
use crate::provider::SpanProvider;

const BUILTIN_RULES: [(&str, EntityLabel, &str, f64); 5] = [
    (
        "email",
        EntityLabel::Email,
        r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b",
        0.98,
    ),
    (
        "ssn",
        EntityLabel::Ssn,
        r"\b\d{3}[-\x{2013}\x{2014}\x{2212}]\d{2}[-\x{2013}\x{2014}\x{2212}]\d{4}\b",
        0.99,
    ),
    (
        "phone",
        EntityLabel::Phone,
        r"(?:\+\s?\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}",
        0.96,
    ),
    (
        "url",
        EntityLabel::Url,
        r#"(?i)\b(?:(?:https?|s?ftp)://|mailto:|www\.)[^\s<>()"]+"#,
        0.90,
    ),
    (
        "ipv4",
        EntityLabel::Ip,
        r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
        0.90,
    ),
];

/// Characters stripped from the end of URL matches
const URL_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''];

pub struct PatternRule {
    pub name: String,
    pub label: EntityLabel,
    pub regex: Regex,
    pub confidence: f64,
}

#[derive(Default)]
pub struct PatternProvider {
    rules: Vec<PatternRule>,
}

impl PatternProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with the built-in identifier rules
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(name, label, pattern, confidence)| PatternRule {
                name: name.to_string(),
                label: *label,
                regex: Regex::new(pattern).unwrap(),
                confidence: *confidence,
            })
            .collect();
        Self { rules }
    }

    /// Built-in rules (when enabled) followed by configured custom patterns
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let mut provider = if config.builtin_patterns {
            Self::builtin()
        } else {
            Self::new()
        };
        for custom in &config.custom_patterns {
            let label = EntityLabel::from_str(&custom.label)?;
            provider.add_rule(&custom.label, label, &custom.pattern, custom.confidence)?;
        }
        Ok(provider)
    }

    pub fn add_rule(
        &mut self,
        name: &str,
        label: EntityLabel,
        pattern: &str,
        confidence: f64,
    ) -> Result<()> {
        let regex = Regex::new(pattern).map_err(|source| ProviderError::InvalidPattern {
            label: name.to_string(),
            source,
        })?;
        self.rules.push(PatternRule {
            name: name.to_string(),
            label,
            regex,
            confidence: confidence.clamp(0.0, 1.0),
        });
        Ok(())
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// All rule matches over `text`
    pub fn find(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        for rule in &self.rules {
            let before = spans.len();
            for m in rule.regex.find_iter(text) {
                let (start, mut end) = (m.start(), m.end());
                match rule.label {
                    EntityLabel::Url => {
                        end = start + m.as_str().trim_end_matches(URL_TRAILING).len();
                    }
                    EntityLabel::Phone if !digit_bounded(text, start, end) => continue,
                    _ => {}
                }
                if let Some(span) =
                    Span::from_range(text, start, end, rule.label, rule.confidence, SpanSource::Rule)
                {
                    spans.push(span);
                }
            }
            debug!(rule = %rule.name, matches = spans.len() - before, "Applied pattern rule");
        }
        spans.sort_by_key(|s| (s.start, s.end));
        spans
    }
}

/// No digit directly before `start` or after `end`
fn digit_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

#[async_trait]
impl SpanProvider for PatternProvider {
    fn name(&self) -> &str {
        "patterns"
    }

    async fn spans(&self, text: &str, _context: Option<&str>) -> anyhow::Result<Vec<Span>> {
        Ok(self.find(text))
    }
}
