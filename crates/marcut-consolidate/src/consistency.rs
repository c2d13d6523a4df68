//! Consistency pass
//!
//! Every accepted name, organization, brand and identifier is searched for
//! across the whole text so a mention the providers missed is still redacted.
//! Terms are compiled into chunked alternations, longest first, and each
//! chunk is scanned once.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::{debug, warn};

use marcut_config::ConsolidateConfig;
use marcut_core::{EntityLabel, LabelClass, Span, SpanSource};

use crate::text::{match_key, strip_legal_suffix, word_tokens};

/// Confidence given to spans found by the rescan
pub const CONSISTENCY_CONFIDENCE: f64 = 0.95;

const CHUNK_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    /// Exact, case-sensitive text of identifiers, names and brands
    Literal,
    /// Organization tokens, any case, short punctuation runs between them
    Org,
    /// Organization tokens without the legal form, longer separators
    Fuzzy,
}

/// Compiled matchers for one category
struct Matcher {
    category: Category,
    chunks: Vec<Regex>,
    /// Lookup key of a match to the label it was built from
    labels: HashMap<String, EntityLabel>,
}

impl Matcher {
    fn build(category: Category, terms: HashMap<String, (String, EntityLabel)>) -> Option<Self> {
        if terms.is_empty() {
            return None;
        }
        let mut patterns: Vec<(usize, String)> = Vec::with_capacity(terms.len());
        let mut labels = HashMap::with_capacity(terms.len());
        for (key, (pattern, label)) in terms {
            patterns.push((key.len(), pattern));
            labels.insert(key, label);
        }
        patterns.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let prefix = if category == Category::Literal { "" } else { "(?i)" };
        let chunks = patterns
            .chunks(CHUNK_SIZE)
            .filter_map(|chunk| {
                let alternation = chunk
                    .iter()
                    .map(|(_, p)| p.as_str())
                    .collect::<Vec<_>>()
                    .join("|");
                match Regex::new(&format!("{prefix}(?:{alternation})")) {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!(?category, "Skipping consistency chunk: {}", e);
                        None
                    }
                }
            })
            .collect();

        Some(Self {
            category,
            chunks,
            labels,
        })
    }

    fn lookup(&self, matched: &str) -> Option<EntityLabel> {
        let key = match self.category {
            Category::Literal => matched.to_string(),
            Category::Org | Category::Fuzzy => match_key(matched),
        };
        self.labels.get(&key).copied()
    }
}

pub struct ConsistencyPass<'a> {
    config: &'a ConsolidateConfig,
}

impl<'a> ConsistencyPass<'a> {
    pub fn new(config: &'a ConsolidateConfig) -> Self {
        Self { config }
    }

    /// New spans for unlabeled mentions of accepted entities
    pub fn find(&self, text: &str, accepted: &[Span]) -> Vec<Span> {
        let matchers = self.build_matchers(accepted);
        if matchers.is_empty() {
            return Vec::new();
        }

        let known: Vec<(usize, usize, String)> = accepted
            .iter()
            .map(|s| (s.start, s.end, match_key(&s.text)))
            .collect();

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for matcher in &matchers {
            for regex in &matcher.chunks {
                for m in regex.find_iter(text) {
                    let Some(label) = matcher.lookup(m.as_str()) else {
                        continue;
                    };
                    let (start, end) = (m.start(), m.end());
                    let key = match_key(m.as_str());
                    let covered = known.iter().any(|(s, e, k)| {
                        (*s <= start && end <= *e) || (start < *e && *s < end && *k == key)
                    }) || found.iter().any(|s: &Span| s.contains_range(start, end));
                    if covered || !seen.insert((start, end)) {
                        continue;
                    }
                    if let Some(span) = Span::from_range(
                        text,
                        start,
                        end,
                        label,
                        CONSISTENCY_CONFIDENCE,
                        SpanSource::ConsistencyPass,
                    ) {
                        found.push(span);
                    }
                }
            }
        }

        debug!(
            matchers = matchers.len(),
            found = found.len(),
            "Consistency pass complete"
        );
        found
    }

    fn build_matchers(&self, accepted: &[Span]) -> Vec<Matcher> {
        let stop_words: HashSet<String> = self
            .config
            .stop_words
            .iter()
            .map(|w| w.to_lowercase())
            .collect();

        let mut literals = HashMap::new();
        let mut orgs = HashMap::new();
        let mut fuzzy = HashMap::new();

        for span in accepted {
            let term = span.text.trim();
            if term.len() < self.config.consistency_min_len
                || !term.chars().any(char::is_alphanumeric)
                || stop_words.contains(&term.to_lowercase())
            {
                continue;
            }

            match span.label {
                EntityLabel::Org => {
                    let tokens = word_tokens(term);
                    if !tokens.is_empty() {
                        let key = match_key(term);
                        let pattern = join_tokens(&word_tokens(&key), r"[^\w\n]{1,3}");
                        orgs.entry(key).or_insert((pattern, span.label));
                    }

                    let core = match_key(strip_legal_suffix(term));
                    let core_tokens = word_tokens(&core);
                    if core_tokens.len() >= 2 {
                        let separator = format!(r"[^\w]{{1,{}}}", self.config.fuzzy_gap.max(1));
                        let pattern = join_tokens(&core_tokens, &separator);
                        fuzzy.entry(core).or_insert((pattern, span.label));
                    }
                }
                EntityLabel::Name | EntityLabel::Brand => {
                    literals
                        .entry(term.to_string())
                        .or_insert((literal_pattern(term), span.label));
                }
                label if label.class() == LabelClass::Identifier => {
                    literals
                        .entry(term.to_string())
                        .or_insert((literal_pattern(term), span.label));
                }
                _ => {}
            }
        }

        [
            Matcher::build(Category::Literal, literals),
            Matcher::build(Category::Org, orgs),
            Matcher::build(Category::Fuzzy, fuzzy),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escaped literal, word-bounded on edges that are word characters
fn literal_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 8);
    if term.starts_with(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(term));
    if term.ends_with(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn join_tokens(tokens: &[&str], separator: &str) -> String {
    let body = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join(separator);
    format!(r"\b{body}\b")
}
