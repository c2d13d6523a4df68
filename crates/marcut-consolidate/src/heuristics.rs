//! Label-specific span heuristics
//!
//! Applied in a fixed order after snapping; each stage is idempotent.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use marcut_config::ConsolidateConfig;
use marcut_core::{EntityLabel, Span, SpanSource};

use crate::exclusion::ExclusionList;
use crate::text::{
    CONNECTORS, adjacent_suffix_len, contains_sentence_boundary, ends_with_legal_suffix,
    floor_boundary, word_tokens,
};

const US_STATES: &str = r"Alabama|Alaska|Arizona|Arkansas|California|Colorado|Connecticut|Delaware|Florida|Georgia|Hawaii|Idaho|Illinois|Indiana|Iowa|Kansas|Kentucky|Louisiana|Maine|Maryland|Massachusetts|Michigan|Minnesota|Mississippi|Missouri|Montana|Nebraska|Nevada|New\s+Hampshire|New\s+Jersey|New\s+Mexico|New\s+York|North\s+Carolina|North\s+Dakota|Ohio|Oklahoma|Oregon|Pennsylvania|Rhode\s+Island|South\s+Carolina|South\s+Dakota|Tennessee|Texas|Utah|Vermont|Virginia|Washington|West\s+Virginia|Wisconsin|Wyoming|District\s+of\s+Columbia";

const STATE_CODES: &str = r"A[LKSZRAEP]|C[AOT]|D[EC]|F[LM]|G[AU]|HI|I[ADLN]|K[SY]|LA|M[ADEHINOPST]|N[CDEHJMVY]|O[HKR]|P[ARW]|RI|S[CD]|T[NX]|UT|V[AIT]|W[AIVY]";

const STREET_SUFFIXES: &str = r"Street|St|Road|Rd|Avenue|Ave|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Place|Pl|Terrace|Ter|Way|Parkway|Pkwy|Circle|Cir|Loop|Crescent|Cres|Square|Sq|Alley|Aly|Plaza|Plz|Highway|Hwy|Freeway|Fwy|Expressway|Expy|Turnpike|Tpke|Causeway|Trail|Trl|Path|Walk|Row|Mews|Close|Gardens|Esplanade|Promenade|Quay|Wharf|Mall|Route|Rte|Crossing|Suite|Ste|Unit|Floor|Fl";

const NO_SUFFIX_STREETS: &str = r"Broadway|The\s+Strand|The\s+Bowery|Wall|Canal|Fleet|Piccadilly|Lombard|Hollywood|Sunset|Market|Mission|Valencia|Boardwalk|Beacon|Liberty|Union|Central|Victory|Heritage|King(?:'|\x{2019})s\s+Way|Queen(?:'|\x{2019})s\s+Walk";

const SECONDARY_UNITS: &str = r"Apt|Apartment|Suite|Ste|Unit|Floor|Fl|Bldg|Building|#";

// "(, a Delaware limited liability company)" at the end of an organization span
static JURISDICTION_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:,\s*)?\b(?:a|an)\s+(?:{US_STATES}|D\.C\.)\s+(?:limited\s+liability\s+company|limited\s+liability\s+partnership|limited\s+partnership|general\s+partnership|corporation|inc\.?|company|llc|l\.l\.c\.|l\.c\.|lc|llp|l\.l\.p\.|lp|l\.p\.|plc|p\.l\.c\.|statutory\s+trust|business\s+trust)\s*$"
    ))
    .unwrap()
});

// Quoted defined term following an entity: (the "Buyer"), ("Acme"), (hereinafter "Smith")
static DEFINED_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\(\s*(?:(?i:the|hereinafter(?:\s+referred\s+to\s+as)?(?:\s+the)?|collectively,?(?:\s+the)?)\s+)?["\x{201C}]([^"\x{201C}\x{201D}\n]{1,60})["\x{201D}]"#,
    )
    .unwrap()
});

static STREET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    let states = format!("(?:{STATE_CODES}|{US_STATES})");
    let secondary = format!(r"(?:(?:{SECONDARY_UNITS})\.?\s*\S+|\S+\s*(?:{SECONDARY_UNITS})\.?)");
    let tail = format!(r"(?:{secondary}\s*,?\s*)?(?:[A-Za-z\s]+,?\s+)?{states}\s+\d{{5}}(?:-\d{{4}})?");
    let standard = format!(r"\b\d+\s+[A-Z0-9][a-zA-Z0-9\s.]+\b(?:{STREET_SUFFIXES})\.?,?\s+{tail}");
    let no_suffix = format!(r"\b\d+\s+(?:{NO_SUFFIX_STREETS})\b,?\s+{tail}");
    let po_box = r"(?i:\bP\.?O\.?\s+Box\s+\d+(?:,\s*[A-Za-z\s]+)?\b)";
    Regex::new(&format!("{standard}|{no_suffix}|{po_box}")).unwrap()
});

static LABELED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Address|Residing at|Location):\s+([^\n,]+(?:,[^\n,]+)+)").unwrap()
});

static SUBDIVISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:the\s+)?(?:county|parish|borough)\s+of\s+(.+)$").unwrap()
});

/// Per-run counts of what the heuristics changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicReport {
    pub trimmed: usize,
    pub extended: usize,
    pub aliases: usize,
    pub reshaped: usize,
    pub dropped: usize,
}

pub struct Heuristics<'a> {
    config: &'a ConsolidateConfig,
    exclusions: &'a ExclusionList,
}

impl<'a> Heuristics<'a> {
    pub fn new(config: &'a ConsolidateConfig, exclusions: &'a ExclusionList) -> Self {
        Self { config, exclusions }
    }

    /// Run every heuristic in order
    pub fn apply(&self, text: &str, spans: Vec<Span>, report: &mut HeuristicReport) -> Vec<Span> {
        let spans = self.trim_org_clauses(text, spans, report);
        let spans = self.extend_org_suffix(text, spans, report);
        let spans = self.attach_aliases(text, spans, report);
        let spans = self.enforce_org_ceiling(spans, report);
        let spans = self.constrain_addresses(text, spans, report);
        self.drop_generic_subdivisions(spans, report)
    }

    /// 1. Cut trailing clauses that are boilerplate or a jurisdiction of
    ///    organization from ORG spans.
    pub fn trim_org_clauses(
        &self,
        text: &str,
        spans: Vec<Span>,
        report: &mut HeuristicReport,
    ) -> Vec<Span> {
        spans
            .into_iter()
            .filter_map(|mut span| {
                if span.label != EntityLabel::Org {
                    return Some(span);
                }
                let len = self.trimmed_org_len(&span.text);
                if len == span.text.len() {
                    return Some(span);
                }
                if len == 0 {
                    report.dropped += 1;
                    return None;
                }
                report.trimmed += 1;
                let start = span.start;
                span.reslice(text, start, start + len);
                Some(span)
            })
            .collect()
    }

    fn trimmed_org_len(&self, org: &str) -> usize {
        let mut len = org.len();
        loop {
            let current = &org[..len];
            if let Some(m) = JURISDICTION_TAIL.find(current) {
                len = clause_end(current, m.start());
                if len == 0 {
                    return 0;
                }
                continue;
            }
            if let Some(pos) = last_top_level_separator(current) {
                let fragment = current[pos + 1..].trim();
                if !fragment.is_empty() && self.exclusions.is_excluded(fragment) {
                    len = clause_end(current, pos);
                    continue;
                }
            }
            if let Some(open) = trailing_parenthetical(current) {
                let inner = &current[open + 1..current.len() - 1];
                if self.exclusions.is_excluded(inner) || JURISDICTION_TAIL.is_match(inner) {
                    len = clause_end(current, open);
                    continue;
                }
            }
            return len;
        }
    }

    /// 2. Pull an adjacent legal form (`, Inc.`) into ORG spans that lack one.
    pub fn extend_org_suffix(
        &self,
        text: &str,
        spans: Vec<Span>,
        report: &mut HeuristicReport,
    ) -> Vec<Span> {
        spans
            .into_iter()
            .map(|mut span| {
                if span.label == EntityLabel::Org && !ends_with_legal_suffix(&span.text) {
                    if let Some(extra) = adjacent_suffix_len(text, span.end) {
                        let (start, end) = (span.start, span.end + extra);
                        span.reslice(text, start, end);
                        report.extended += 1;
                    }
                }
                span
            })
            .collect()
    }

    /// 3. Add spans for quoted defined terms that name a NAME/ORG span.
    pub fn attach_aliases(
        &self,
        text: &str,
        mut spans: Vec<Span>,
        report: &mut HeuristicReport,
    ) -> Vec<Span> {
        let mut aliases = Vec::new();
        for span in &spans {
            if !matches!(span.label, EntityLabel::Name | EntityLabel::Org) {
                continue;
            }
            let window_end = floor_boundary(text, span.end + self.config.alias_window);
            let window = &text[span.end..window_end];
            let Some(caps) = DEFINED_TERM.captures(window) else {
                continue;
            };
            let (Some(whole), Some(group)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if window[..whole.start()].contains('\n') {
                continue;
            }

            let raw = group.as_str();
            let lead = raw.len() - raw.trim_start().len();
            let alias = raw.trim();
            if alias.is_empty() || self.exclusions.is_excluded(alias) {
                continue;
            }
            let names_entity = tokens_contained(alias, &span.text)
                || (span.label == EntityLabel::Org && is_acronym_of(alias, &span.text));
            if !names_entity {
                continue;
            }

            let start = span.end + group.start() + lead;
            let end = start + alias.len();
            let exists = spans
                .iter()
                .chain(aliases.iter())
                .any(|s: &Span| s.start == start && s.end == end);
            if exists {
                continue;
            }
            if let Some(new) = Span::from_range(
                text,
                start,
                end,
                span.label,
                span.confidence,
                SpanSource::DefinedTermAlias,
            ) {
                aliases.push(new);
            }
        }
        report.aliases += aliases.len();
        spans.extend(aliases);
        spans
    }

    /// 4. Drop ORG spans that read like running text.
    pub fn enforce_org_ceiling(&self, spans: Vec<Span>, report: &mut HeuristicReport) -> Vec<Span> {
        spans
            .into_iter()
            .filter(|span| {
                if span.label != EntityLabel::Org {
                    return true;
                }
                let len = span.text.len();
                let shaped = span.text.matches('\n').count() <= 1
                    && !contains_sentence_boundary(&span.text);
                let keep = shaped
                    && (len <= self.config.org_max_len
                        || (len <= self.config.org_relaxed_max_len
                            && ends_with_legal_suffix(&span.text)));
                if !keep {
                    report.dropped += 1;
                }
                keep
            })
            .collect()
    }

    /// 5. Fit LOC spans to the street address on their line: the whole line
    ///    when the address dominates it and no organization on the line lies
    ///    outside the address, the address alone otherwise.
    pub fn constrain_addresses(
        &self,
        text: &str,
        spans: Vec<Span>,
        report: &mut HeuristicReport,
    ) -> Vec<Span> {
        let orgs: Vec<(usize, usize)> = spans
            .iter()
            .filter(|s| s.label == EntityLabel::Org)
            .map(|s| (s.start, s.end))
            .collect();

        spans
            .into_iter()
            .map(|mut span| {
                if span.label != EntityLabel::Loc {
                    return span;
                }
                let line_start = text[..span.start].rfind('\n').map_or(0, |i| i + 1);
                let line_end = text[span.end..]
                    .find('\n')
                    .map_or(text.len(), |i| span.end + i);
                let line = &text[line_start..line_end];

                let Some((a, b)) = find_addresses(line)
                    .into_iter()
                    .map(|(a, b)| (line_start + a, line_start + b))
                    .find(|&(a, b)| a < span.end && span.start < b)
                else {
                    return span;
                };

                let (content_start, content_end) = line_content(text, line_start, line_end);
                let content_len = content_end.saturating_sub(content_start);
                let coverage = if content_len == 0 {
                    0.0
                } else {
                    (b - a) as f64 / content_len as f64
                };
                let org_outside = orgs.iter().any(|&(os, oe)| {
                    os < line_end && line_start < oe && (os < a || oe > b)
                });
                let (start, end) = if coverage >= self.config.address_dominance && !org_outside {
                    (content_start, content_end)
                } else {
                    (a, b)
                };
                if (start, end) != (span.start, span.end) {
                    span.reslice(text, start, end);
                    span.source = SpanSource::Heuristic;
                    report.reshaped += 1;
                }
                span
            })
            .collect()
    }

    /// 6. Drop `County of <generic>` style ORG/LOC spans.
    pub fn drop_generic_subdivisions(
        &self,
        spans: Vec<Span>,
        report: &mut HeuristicReport,
    ) -> Vec<Span> {
        spans
            .into_iter()
            .filter(|span| {
                if !matches!(span.label, EntityLabel::Org | EntityLabel::Loc) {
                    return true;
                }
                let Some(rest) = SUBDIVISION.captures(span.text.trim()).and_then(|c| c.get(1)) else {
                    return true;
                };
                let proper = word_tokens(rest.as_str()).iter().any(|t| {
                    t.starts_with(char::is_uppercase) && !self.exclusions.is_generic_phrase(t)
                });
                if !proper {
                    report.dropped += 1;
                }
                proper
            })
            .collect()
    }
}

/// End of the text kept when cutting at `pos`
fn clause_end(text: &str, pos: usize) -> usize {
    text[..pos]
        .trim_end_matches(|c: char| c.is_whitespace() || ",;:/".contains(c))
        .len()
}

fn last_top_level_separator(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut last = None;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | ';' | ':' | '/' if depth == 0 => last = Some(i),
            _ => {}
        }
    }
    last
}

/// Position of the `(` opening a parenthetical that ends the text
fn trailing_parenthetical(text: &str) -> Option<usize> {
    if !text.ends_with(')') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (i > 0).then_some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Every alias token appears among the entity tokens
fn tokens_contained(alias: &str, entity: &str) -> bool {
    let entity: Vec<String> = word_tokens(entity).iter().map(|t| t.to_lowercase()).collect();
    let alias = word_tokens(alias);
    !alias.is_empty()
        && alias
            .iter()
            .all(|t| entity.contains(&t.to_lowercase()))
}

/// "ABC" for "Alpha Beta Capital, LLC"
fn is_acronym_of(alias: &str, entity: &str) -> bool {
    let letters: String = alias.chars().filter(|c| c.is_alphanumeric()).collect();
    if letters.chars().count() < 2 || !letters.chars().all(char::is_uppercase) {
        return false;
    }
    let initials: String = word_tokens(entity)
        .iter()
        .filter(|t| t.starts_with(char::is_uppercase))
        .filter(|t| !CONNECTORS.contains(&t.to_lowercase().as_str()))
        .filter(|t| !ends_with_legal_suffix(t))
        .filter_map(|t| t.chars().next())
        .collect();
    initials == letters
}

/// Address ranges within one line
fn find_addresses(line: &str) -> Vec<(usize, usize)> {
    let mut found: Vec<(usize, usize)> = STREET_ADDRESS
        .find_iter(line)
        .map(|m| (m.start(), m.end()))
        .collect();
    found.extend(
        LABELED_ADDRESS
            .captures_iter(line)
            .filter_map(|c| c.get(1))
            .map(|g| (g.start(), g.end())),
    );
    found.sort_unstable();
    found
}

/// Line bounds without surrounding whitespace and trailing punctuation
fn line_content(text: &str, start: usize, end: usize) -> (usize, usize) {
    let line = &text[start..end];
    let lead = line.len() - line.trim_start().len();
    let kept = line.trim_end_matches(|c: char| c.is_whitespace() || ".,;".contains(c));
    (start + lead, (start + kept.len()).max(start + lead))
}
