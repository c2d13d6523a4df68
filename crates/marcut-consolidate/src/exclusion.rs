//! Exclusion vocabulary
//!
//! Legal boilerplate that looks like an entity but names a role or a part of
//! the document ("the Company", "Section", "Purchasers"). Entries come from a
//! built-in list, configured words and an optional user file.
//!
//! File format: one entry per line, `#` starts a comment. Entries containing
//! regex metacharacters are case-insensitive patterns anchored at the start of
//! the candidate; everything else is an exact literal.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;
use tracing::{debug, warn};

use marcut_config::ExclusionConfig;

use crate::error::{ConsolidateError, Result};
use crate::text::{CONNECTORS, DETERMINERS, strip_possessive, word_tokens};

const BASE_TERMS: [&str; 37] = [
    "agreement",
    "section",
    "article",
    "recital",
    "exhibit",
    "schedule",
    "appendix",
    "annex",
    "notice",
    "resolution",
    "minutes",
    "consent",
    "meeting",
    "vote",
    "bylaws",
    "charter",
    "company",
    "corporation",
    "board",
    "board of directors",
    "stockholder",
    "stockholders",
    "member",
    "members",
    "party",
    "parties",
    "purchaser",
    "seller",
    "target",
    "counterparty",
    "dgcl",
    "act",
    "law",
    "statute",
    "code",
    "regulation",
    "borrower",
];

static REGEX_META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\^$.*+?{}()\[\]|]").unwrap());

#[derive(Debug, Default)]
pub struct ExclusionList {
    /// Built-in and configured literals, normalized
    literals: HashSet<String>,
    patterns: Vec<Regex>,
    /// Entries read from the watched file
    file_literals: HashSet<String>,
    file_patterns: Vec<Regex>,
    source: Option<PathBuf>,
    modified: Option<SystemTime>,
}

impl ExclusionList {
    /// The built-in legal boilerplate vocabulary
    pub fn builtin() -> Self {
        let mut list = Self::default();
        for term in BASE_TERMS {
            list.add_word(term);
        }
        list
    }

    /// Built-in vocabulary plus configured words and file
    pub fn from_config(config: &ExclusionConfig) -> Result<Self> {
        let mut list = Self::builtin();
        for word in &config.words {
            list.add_word(word);
        }
        if let Some(path) = &config.path {
            list.watch_file(path)?;
        }
        Ok(list)
    }

    pub fn add_word(&mut self, word: &str) {
        let key = normalize(word);
        if !key.is_empty() {
            self.literals.insert(key);
        }
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        self.patterns.push(compile_entry(pattern)?);
        Ok(())
    }

    /// Load entries from `path` and keep following it through `refresh`
    pub fn watch_file(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.source = Some(path.into());
        self.modified = None;
        self.refresh()?;
        Ok(())
    }

    /// Re-read the watched file when its modification time changed.
    /// Returns whether the entries changed.
    pub fn refresh(&mut self) -> Result<bool> {
        let Some(path) = self.source.clone() else {
            return Ok(false);
        };

        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Exclusion file not found");
                let had_entries = !self.file_literals.is_empty() || !self.file_patterns.is_empty();
                self.file_literals.clear();
                self.file_patterns.clear();
                self.modified = None;
                return Ok(had_entries);
            }
            Err(source) => return Err(ConsolidateError::ExclusionFile { path, source }),
        };
        if self.modified == Some(modified) {
            return Ok(false);
        }

        let content = read_file(&path)?;
        let (literals, patterns) = parse_entries(&content);
        debug!(
            path = %path.display(),
            literals = literals.len(),
            patterns = patterns.len(),
            "Loaded exclusion file"
        );
        self.file_literals = literals;
        self.file_patterns = patterns;
        self.modified = Some(modified);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.literals.len() + self.patterns.len() + self.file_literals.len() + self.file_patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the whole phrase is boilerplate
    pub fn is_excluded(&self, text: &str) -> bool {
        let key = normalize(text);
        if key.is_empty() {
            return false;
        }
        if self.contains_literal(&key) {
            return true;
        }
        let cleaned = strip_determiner(text.trim());
        self.patterns
            .iter()
            .chain(self.file_patterns.iter())
            .any(|p| p.is_match(cleaned))
    }

    /// Every token is a determiner, a connector or boilerplate
    pub fn is_generic_phrase(&self, text: &str) -> bool {
        let tokens = word_tokens(text);
        !tokens.is_empty() && tokens.iter().all(|t| self.is_generic_word(t))
    }

    /// "The Company", "Target Trust", "the Borrower LLC": everything before the
    /// final legal form is generic.
    pub fn is_generic_org(&self, text: &str) -> bool {
        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.len() < 2 {
            return false;
        }
        parts[..parts.len() - 1]
            .iter()
            .all(|word| self.is_generic_word(word.trim_end_matches(',')))
    }

    fn is_generic_word(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        DETERMINERS.contains(&lower.as_str())
            || CONNECTORS.contains(&lower.as_str())
            || self.is_excluded(word)
    }

    fn contains_literal(&self, key: &str) -> bool {
        let hit = |k: &str| self.literals.contains(k) || self.file_literals.contains(k);
        if hit(key) {
            return true;
        }
        // Plurals of listed terms
        if let Some(stem) = key.strip_suffix("ies") {
            if hit(&format!("{}y", stem)) {
                return true;
            }
        }
        key.strip_suffix("es").is_some_and(hit) || key.strip_suffix('s').is_some_and(hit)
    }
}

/// Lowercase, drop surrounding punctuation, a leading determiner and a
/// trailing possessive, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let trimmed = lowered.trim_matches(|c: char| !c.is_alphanumeric());
    let stripped = strip_possessive(trimmed);

    let mut words: Vec<&str> = stripped.split_whitespace().collect();
    while words.len() > 1 && DETERMINERS.contains(&words[0]) {
        words.remove(0);
    }
    words
        .join(" ")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

fn strip_determiner(text: &str) -> &str {
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) if DETERMINERS.contains(&first.to_lowercase().as_str()) => {
            rest.trim_start()
        }
        _ => text,
    }
}

fn compile_entry(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("(?i)^(?:{})", pattern)).map_err(|source| {
        ConsolidateError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ConsolidateError::ExclusionFile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_entries(content: &str) -> (HashSet<String>, Vec<Regex>) {
    let mut literals = HashSet::new();
    let mut patterns = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if REGEX_META.is_match(line) {
            match compile_entry(line) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => warn!("Skipping exclusion entry: {}", e),
            }
        } else {
            let key = normalize(line);
            if !key.is_empty() {
                literals.insert(key);
            }
        }
    }

    (literals, patterns)
}
