//! Surface normalization and token-set similarity

use std::collections::BTreeSet;

use similar::TextDiff;

/// Legal forms that do not distinguish one organization from another
const LEGAL_SUFFIXES: [&str; 13] = [
    "inc", "llc", "corp", "co", "lp", "llp", "pllc", "gmbh", "sa", "ltd", "plc", "incorporated",
    "corporation",
];

/// Lowercase, `&` to `and`, punctuation to spaces, trailing legal forms
/// removed, whitespace collapsed.
///
/// `"Acme, Inc."` and `"ACME Inc"` both normalize to `"acme"`.
pub fn normalize(surface: &str) -> String {
    let lowered = surface.to_lowercase().replace('&', " and ").replace('.', "");
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| LEGAL_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Token-set similarity in `[0, 1]`.
///
/// Compares the shared tokens against each side's full token set, so word
/// order and a subset relation ("acme" vs "acme holdings") score high.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let join = |tokens: Vec<&str>| tokens.join(" ");
    let shared = join(left.intersection(&right).copied().collect());
    let only_left = join(left.difference(&right).copied().collect());
    let only_right = join(right.difference(&left).copied().collect());

    let combine = |rest: &str| match (shared.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => shared.clone(),
        (false, false) => format!("{shared} {rest}"),
    };
    let with_left = combine(&only_left);
    let with_right = combine(&only_right);

    let mut best = ratio(&with_left, &with_right);
    if !shared.is_empty() {
        best = best
            .max(ratio(&shared, &with_left))
            .max(ratio(&shared, &with_right));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Acme, Inc."), "acme");
        assert_eq!(normalize("ACME Inc"), "acme");
        assert_eq!(normalize("Smith & Wesson"), "smith and wesson");
        assert_eq!(normalize("Beta L.L.C."), "beta");
        assert_eq!(normalize("  Jordan   Lee "), "jordan lee");
        assert_eq!(normalize("Co"), "co");
    }

    #[test]
    fn test_token_set_ratio() {
        assert_eq!(token_set_ratio("jordan lee", "lee jordan"), 1.0);
        assert_eq!(token_set_ratio("acme", "acme holdings"), 1.0);
        assert!(token_set_ratio("acme holdings", "acme holding") > 0.82);
        assert!(token_set_ratio("jordan lee", "jordan leigh") < 0.82);
        assert!(token_set_ratio("acme", "globex") < 0.5);
        assert_eq!(token_set_ratio("", "acme"), 0.0);
    }
}
