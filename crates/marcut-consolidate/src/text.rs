//! Text helpers shared by the consolidation stages

use std::sync::LazyLock;

use regex::Regex;

// Organization span ending in a legal form: "Acme, Inc." / "Beta L.L.C."
static LEGAL_SUFFIX_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s,])(?:incorporated|inc|corporation|corp|company|co|limited|ltd|l\.l\.c|llc|lc|l\.l\.p|llp|l\.p|lp|p\.l\.c|plc|gmbh|ag|s\.a|n\.a|b\.v|n\.v|p\.c|pc|p\.a|pa)\.?$",
    )
    .unwrap()
});

// Legal form directly after a span: ", Inc." / " LLC"
static ADJACENT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:,[ \t]*|[ \t]+)(?:Incorporated|Inc\.?|Corporation|Corp\.?|Co\.|Limited|Ltd\.?|L\.L\.C\.|LLC|L\.L\.P\.|LLP|L\.P\.|LP|PLC|GmbH|N\.A\.|S\.A\.)",
    )
    .unwrap()
});

// Dotted legal forms that must not read as sentence ends
static ENTITY_SUFFIX_PERIODS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"L\.L\.C\.|L\.L\.P\.|L\.P\.|G\.P\.|P\.C\.|P\.A\.|N\.A\.|S\.A\.S\.|S\.A\.|B\.V\.|N\.V\.|p\.l\.c\.")
        .unwrap()
});

static PERIOD_BEFORE_CAPITAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s+[A-Z]").unwrap());

/// Words whose trailing period does not end a sentence
const NON_TERMINAL: [&str; 12] = [
    "Mr", "Mrs", "Ms", "Dr", "St", "Jr", "Sr", "Inc", "Ltd", "Co", "Corp", "No",
];

/// Abbreviations whose final period belongs to the span
const ABBREVIATIONS: [&str; 16] = [
    "inc", "corp", "co", "ltd", "jr", "sr", "dr", "mr", "mrs", "ms", "st", "no", "bros", "assn",
    "intl", "mfg",
];

/// Leading words that never carry identity
pub(crate) const DETERMINERS: [&str; 18] = [
    "the", "a", "an", "this", "that", "such", "each", "any", "certain", "both", "all", "these",
    "those", "every", "either", "neither", "said", "our",
];

/// Words that join the name parts of a generic phrase
pub(crate) const CONNECTORS: [&str; 7] = ["and", "or", "of", "for", "de", "la", "&"];

pub(crate) fn ends_with_legal_suffix(text: &str) -> bool {
    LEGAL_SUFFIX_END.is_match(text.trim_end())
}

/// The text without its trailing legal form: "Acme Holdings, LLC" -> "Acme Holdings"
pub(crate) fn strip_legal_suffix(text: &str) -> &str {
    let trimmed = text.trim_end();
    match LEGAL_SUFFIX_END.find(trimmed) {
        Some(m) => trimmed[..m.start()].trim_end_matches(|c: char| c.is_whitespace() || c == ','),
        None => trimmed,
    }
}

/// Length of a legal form directly following `end`, if any
pub(crate) fn adjacent_suffix_len(text: &str, end: usize) -> Option<usize> {
    let rest = text.get(end..)?;
    let m = ADJACENT_SUFFIX.find(rest)?;
    let after = &rest[m.end()..];
    if after.starts_with(|c: char| c.is_alphanumeric()) {
        return None;
    }
    Some(m.end())
}

/// A period followed by a capitalized word, ignoring titles, initials and
/// dotted legal forms.
pub(crate) fn contains_sentence_boundary(text: &str) -> bool {
    let cleaned = ENTITY_SUFFIX_PERIODS.replace_all(text, "");
    PERIOD_BEFORE_CAPITAL.find_iter(&cleaned).any(|m| {
        let before = &cleaned[..m.start()];
        let word = before
            .rsplit(|c: char| !c.is_alphanumeric())
            .next()
            .unwrap_or_default();
        let initial = word.chars().count() == 1 && word.chars().all(char::is_uppercase);
        !(initial || NON_TERMINAL.contains(&word))
    })
}

/// Whether a span ending in `.` ends with an abbreviation (`Inc.`, `J.`, `L.L.C.`)
pub(crate) fn ends_with_abbreviation(text: &str) -> bool {
    let Some(stem) = text.strip_suffix('.') else {
        return false;
    };
    let token = stem
        .rsplit(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or_default();
    if token.is_empty() {
        return false;
    }
    let lower = token.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }
    // Initials and dotted forms: "J", "L.L.C", "N.A"
    token
        .split('.')
        .all(|part| part.chars().count() == 1 && part.chars().all(char::is_alphabetic))
}

/// Alphanumeric tokens of a phrase
pub(crate) fn word_tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn strip_possessive(text: &str) -> &str {
    text.strip_suffix("'s")
        .or_else(|| text.strip_suffix("\u{2019}s"))
        .unwrap_or(text)
}

/// Case-folded token key used to compare mentions of the same entity
pub(crate) fn match_key(text: &str) -> String {
    word_tokens(strip_possessive(text.trim()))
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamp a byte offset down to a char boundary
pub(crate) fn floor_boundary(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
