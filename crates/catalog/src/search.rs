//! Tiered, diacritic-insensitive product search.
//!
//! Fields are split into two tiers:
//!
//! - **Primary**: name, slug, region, country, producer, grapes
//! - **Secondary**: description, taste profile, food pairing
//!
//! A single-word query must hit a primary field, so "malbec" does not match a
//! Chardonnay whose description merely suggests Malbec-marinated steak.
//! Multi-word queries are specific enough to accept a secondary hit too.
//!
//! The whole normalized query must appear as a substring of one field; the
//! word count only decides which tiers are eligible.

use std::borrow::Cow;

use dram_core::{CatalogItem, normalize};

/// Search strictness thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Queries with at least this many words may match secondary fields.
    pub multi_word_min: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self { multi_word_min: 2 }
    }
}

/// Which field tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Primary,
    Secondary,
}

/// A parsed, normalized search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    raw: String,
    normalized: String,
    word_count: usize,
}

impl SearchTerm {
    /// Parse a raw query. Blank input means "no search".
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if raw.is_empty() {
            return None;
        }

        let normalized = normalize(&raw);
        let word_count = normalized.split_whitespace().count();

        Some(Self {
            raw,
            normalized,
            word_count,
        })
    }

    /// The query as typed, with whitespace collapsed.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized query used for matching and cache keys.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    #[must_use]
    pub const fn word_count(&self) -> usize {
        self.word_count
    }

    /// Folded substrings for a coarse store-side filter.
    #[must_use]
    pub fn needles(&self) -> Vec<String> {
        vec![self.normalized.clone()]
    }
}

/// Decides whether a catalog item matches a search term.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchMatcher {
    policy: SearchPolicy,
}

impl SearchMatcher {
    #[must_use]
    pub const fn new(policy: SearchPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> SearchPolicy {
        self.policy
    }

    /// Whether `term` counts as a multi-word query under this policy.
    #[must_use]
    pub const fn is_multi_word(&self, term: &SearchTerm) -> bool {
        term.word_count >= self.policy.multi_word_min
    }

    /// The tier that produced a match, if any.
    #[must_use]
    pub fn match_tier(&self, term: &SearchTerm, item: &CatalogItem) -> Option<MatchTier> {
        let needle = term.normalized();

        if primary_fields(item).any(|field| normalize(&field).contains(needle)) {
            return Some(MatchTier::Primary);
        }

        if self.is_multi_word(term)
            && secondary_fields(item).any(|field| normalize(field).contains(needle))
        {
            return Some(MatchTier::Secondary);
        }

        None
    }

    /// Whether `item` matches `term`.
    #[must_use]
    pub fn matches(&self, term: &SearchTerm, item: &CatalogItem) -> bool {
        self.match_tier(term, item).is_some()
    }

    /// Whether `item` matches a raw query. A blank query matches everything.
    #[must_use]
    pub fn matches_query(&self, query: &str, item: &CatalogItem) -> bool {
        SearchTerm::parse(query).is_none_or(|term| self.matches(&term, item))
    }

    /// Keep the items matching `term`, preserving order.
    #[must_use]
    pub fn filter(&self, term: &SearchTerm, items: Vec<CatalogItem>) -> Vec<CatalogItem> {
        items
            .into_iter()
            .filter(|item| self.matches(term, item))
            .collect()
    }
}

/// Match a raw query against an item with the default policy.
#[must_use]
pub fn matches(query: &str, item: &CatalogItem) -> bool {
    SearchMatcher::default().matches_query(query, item)
}

fn primary_fields(item: &CatalogItem) -> impl Iterator<Item = Cow<'_, str>> {
    [
        Some(Cow::Borrowed(item.name.as_str())),
        Some(Cow::Borrowed(item.slug.as_str())),
        item.region.as_deref().map(Cow::Borrowed),
        Some(Cow::Borrowed(item.country.as_str())),
        item.producer.as_deref().map(Cow::Borrowed),
        (!item.grapes.is_empty()).then(|| Cow::Owned(item.grapes.join(" "))),
    ]
    .into_iter()
    .flatten()
}

fn secondary_fields(item: &CatalogItem) -> impl Iterator<Item = &str> {
    [
        Some(item.description.as_str()),
        item.taste_profile.as_deref(),
        item.food_pairing.as_deref(),
    ]
    .into_iter()
    .flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dram_core::Category;
    use rust_decimal::Decimal;

    use super::*;

    fn chardonnay() -> CatalogItem {
        let mut item = CatalogItem::new(
            "chardonnay-reserve",
            "Chardonnay Reserve",
            Category::Wine,
            Decimal::from(18),
        );
        item.description = "pairs well with malbec-marinated steak".to_string();
        item.country = "Chile".to_string();
        item
    }

    #[test]
    fn test_single_word_secondary_only_does_not_match() {
        assert!(!matches("malbec", &chardonnay()));
    }

    #[test]
    fn test_single_word_primary_matches() {
        let mut item = chardonnay();
        item.name = "Malbec Reserva".to_string();
        assert!(matches("malbec", &item));
    }

    #[test]
    fn test_multi_word_secondary_matches() {
        assert!(matches("marinated steak", &chardonnay()));
    }

    #[test]
    fn test_multi_word_requires_whole_phrase() {
        assert!(!matches("marinated lamb", &chardonnay()));
    }

    #[test]
    fn test_diacritic_insensitive_both_ways() {
        let mut item = CatalogItem::new(
            "cotes-du-rhone",
            "Côtes du Rhône Villages",
            Category::Wine,
            Decimal::from(15),
        );
        item.region = Some("Rhône".to_string());

        assert!(matches("cotes", &item));
        assert!(matches("RHÔNE", &item));
        assert!(matches("rhone", &item));
    }

    #[test]
    fn test_grapes_are_primary() {
        let mut item = chardonnay();
        item.grapes = vec!["Grenache".to_string(), "Syrah".to_string()];
        assert!(matches("syrah", &item));
        let term = SearchTerm::parse("syrah").unwrap();
        assert_eq!(
            SearchMatcher::default().match_tier(&term, &item),
            Some(MatchTier::Primary)
        );
    }

    #[test]
    fn test_taste_profile_and_food_pairing_are_secondary() {
        let mut item = chardonnay();
        item.taste_profile = Some("Buttery oak".to_string());
        item.food_pairing = Some("Roast chicken".to_string());

        assert!(!matches("buttery", &item));
        assert!(matches("buttery oak", &item));
        assert!(matches("roast chicken", &item));
    }

    #[test]
    fn test_blank_query_matches_everything() {
        assert!(matches("   ", &chardonnay()));
        assert!(SearchTerm::parse(" \t ").is_none());
    }

    #[test]
    fn test_policy_threshold_is_configurable() {
        let strict = SearchMatcher::new(SearchPolicy { multi_word_min: 3 });
        assert!(!strict.matches_query("marinated steak", &chardonnay()));
        assert!(!strict.matches_query("malbec-marinated steak", &chardonnay()));
        assert!(strict.matches_query("with malbec-marinated steak", &chardonnay()));
    }

    #[test]
    fn test_search_term_parsing() {
        let term = SearchTerm::parse("  Côtes   du Rhône ").unwrap();
        assert_eq!(term.raw(), "Côtes du Rhône");
        assert_eq!(term.normalized(), "cotes du rhone");
        assert_eq!(term.word_count(), 3);
        assert_eq!(term.needles(), vec!["cotes du rhone"]);

        let plain = SearchTerm::parse("Teeling").unwrap();
        assert_eq!(plain.needles(), vec!["teeling"]);
    }

    #[test]
    fn test_filter_preserves_order() {
        let a = CatalogItem::new("a", "Teeling 700ml", Category::Spirits, Decimal::from(40));
        let b = CatalogItem::new("b", "Jameson 700ml", Category::Spirits, Decimal::from(30));
        let c = CatalogItem::new("c", "Teeling 1L", Category::Spirits, Decimal::from(55));

        let term = SearchTerm::parse("teeling").unwrap();
        let found = SearchMatcher::default().filter(&term, vec![a, b, c]);
        let slugs: Vec<&str> = found.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "c"]);
    }
}
