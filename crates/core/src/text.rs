//! Diacritic-insensitive text normalization.
//!
//! Every comparison in the catalog (slug lookup, search, variety clustering)
//! goes through [`normalize`], so accented and unaccented spellings of the same
//! word compare equal:
//!
//! ```
//! use dram_core::text::{normalize, slugify};
//!
//! assert_eq!(normalize("Côtes du Rhône"), "cotes du rhone");
//! assert_eq!(slugify("Côtes du Rhône!"), "cotes-du-rhone");
//! ```

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lower-case `s`, decompose it (NFD), and drop combining marks.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
#[must_use]
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Build a URL-safe slug from arbitrary text.
///
/// The result only contains `[a-z0-9-]`, never starts or ends with a hyphen,
/// and never contains two hyphens in a row.
#[must_use]
pub fn slugify(s: &str) -> String {
    let normalized = normalize(s);
    let mut slug = String::with_capacity(normalized.len());
    let mut pending_hyphen = false;

    for c in normalized.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// Normalized, whitespace-separated words of `s`.
#[must_use]
pub fn words(s: &str) -> Vec<String> {
    normalize(s)
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Côtes du Rhône"), "cotes du rhone");
        assert_eq!(normalize("Grüner Veltliner"), "gruner veltliner");
        assert_eq!(normalize("Crémant d'Alsace"), "cremant d'alsace");
    }

    #[test]
    fn test_normalize_lowercases_ascii() {
        assert_eq!(normalize("JAMESON Black Barrel"), "jameson black barrel");
    }

    #[test]
    fn test_normalize_handles_dotted_capital_i() {
        // U+0130 lowercases to "i" followed by a combining dot
        assert_eq!(normalize("\u{130}stanbul"), "istanbul");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_slugify_example() {
        assert_eq!(slugify("Côtes du Rhône!"), "cotes-du-rhone");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Jack & Jill -- Reserve  "), "jack-jill-reserve");
        assert_eq!(slugify("Teeling 70cl (Small Batch)"), "teeling-70cl-small-batch");
    }

    #[test]
    fn test_slugify_only_symbols() {
        assert_eq!(slugify("!!! ---"), "");
    }

    #[test]
    fn test_words() {
        assert_eq!(words("  Château   Margaux "), vec!["chateau", "margaux"]);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "[a-zA-Z0-9À-ÖØ-öø-ÿĀ-ſА-яΑ-Ωα-ω ,.'!-]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_slugify_is_url_safe(s in "\\PC{0,40}") {
            let slug = slugify(&s);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
