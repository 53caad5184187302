//! Variety clustering: pack sizes and expressions of the same product.
//!
//! Three heuristics run as a cascade, each adding to one de-duplicated result:
//!
//! 1. **Volume** - names equal once volume tokens are stripped, with
//!    different volumes ("Jameson 700ml" / "Jameson 1L", but not
//!    "Jameson 70cl" / "Jameson 700 ml").
//! 2. **Description link** - the description lists siblings after
//!    "Also available:".
//! 3. **Name fallback** - names of three or more words sharing at least two
//!    words. Only consulted when the first two tiers found nothing, since
//!    short brand names over-cluster.
//!
//! Varieties are recomputed on demand from the current catalog snapshot and
//! never cached on their own.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use dram_core::{CatalogItem, normalize, words};

static VOLUME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*(ml|cl|l|ltr|litres?|liters?)\b").expect("Invalid regex")
});

static EMPTY_BRACKETS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(\[]\s*[)\]]").expect("Invalid regex"));

static ALSO_AVAILABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)also available\s*:?\s*(.+?)(?:\.(?:\s|$)|\n|$)").expect("Invalid regex")
});

const SEPARATORS: &[char] = &['-', '–', '—', ',', '/', '|', ':'];

const DEFAULT_STOPWORDS: [&str; 10] = [
    "the", "and", "or", "of", "in", "on", "at", "irish", "whiskey", "whisky",
];

/// Thresholds for the variety heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarietyPolicy {
    /// Minimum words in an item's name before the name fallback runs.
    pub name_fallback_min_words: usize,
    /// Words a candidate must share with the item's name in the name fallback.
    pub name_fallback_shared_words: usize,
    /// Meaningful words a candidate must share with a listed variety.
    pub link_shared_words: usize,
    /// Words this short or shorter are never meaningful.
    pub max_insignificant_len: usize,
    /// Words never counted as meaningful, normalized.
    pub stopwords: Vec<String>,
}

impl Default for VarietyPolicy {
    fn default() -> Self {
        Self {
            name_fallback_min_words: 3,
            name_fallback_shared_words: 2,
            link_shared_words: 2,
            max_insignificant_len: 2,
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| (*w).to_owned()).collect(),
        }
    }
}

/// The heuristic that linked a variety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarietyTier {
    Volume,
    DescriptionLink,
    NameFallback,
}

/// When a tier is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunWhen {
    Always,
    NothingFound,
}

const CASCADE: [(VarietyTier, RunWhen); 3] = [
    (VarietyTier::Volume, RunWhen::Always),
    (VarietyTier::DescriptionLink, RunWhen::Always),
    (VarietyTier::NameFallback, RunWhen::NothingFound),
];

/// A variety together with the tier that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarietyMatch<'a> {
    pub item: &'a CatalogItem,
    pub tier: VarietyTier,
}

/// Finds the varieties of a catalog item within a candidate set.
#[derive(Debug, Clone, Default)]
pub struct VarietyResolver {
    policy: VarietyPolicy,
}

impl VarietyResolver {
    #[must_use]
    pub const fn new(policy: VarietyPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &VarietyPolicy {
        &self.policy
    }

    /// Varieties of `item` in `all_items`, excluding `item` and de-duplicated by slug.
    #[must_use]
    pub fn find_varieties(&self, item: &CatalogItem, all_items: &[CatalogItem]) -> Vec<CatalogItem> {
        self.matches(item, all_items)
            .into_iter()
            .map(|m| m.item.clone())
            .collect()
    }

    /// Whether `item` has at least one variety in `all_items`.
    #[must_use]
    pub fn has_varieties(&self, item: &CatalogItem, all_items: &[CatalogItem]) -> bool {
        !self.matches(item, all_items).is_empty()
    }

    /// Run the cascade and report which tier linked each variety.
    #[must_use]
    pub fn matches<'a>(
        &self,
        item: &CatalogItem,
        all_items: &'a [CatalogItem],
    ) -> Vec<VarietyMatch<'a>> {
        let mut found: Vec<VarietyMatch<'a>> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([item.slug.as_str()]);

        for (tier, when) in CASCADE {
            if when == RunWhen::NothingFound && !found.is_empty() {
                continue;
            }

            let candidates = all_items.iter().filter(|c| c.slug != item.slug);
            for candidate in self.run_tier(tier, item, candidates) {
                if seen.insert(candidate.slug.as_str()) {
                    found.push(VarietyMatch {
                        item: candidate,
                        tier,
                    });
                }
            }
        }

        found
    }

    fn run_tier<'a>(
        &self,
        tier: VarietyTier,
        item: &CatalogItem,
        candidates: impl Iterator<Item = &'a CatalogItem>,
    ) -> Vec<&'a CatalogItem> {
        match tier {
            VarietyTier::Volume => volume_varieties(item, candidates),
            VarietyTier::DescriptionLink => self.linked_varieties(item, candidates),
            VarietyTier::NameFallback => self.name_varieties(item, candidates),
        }
    }

    fn linked_varieties<'a>(
        &self,
        item: &CatalogItem,
        candidates: impl Iterator<Item = &'a CatalogItem>,
    ) -> Vec<&'a CatalogItem> {
        let phrases = listed_varieties(&item.description);
        if phrases.is_empty() {
            return Vec::new();
        }

        let phrases: Vec<(String, HashSet<String>)> = phrases
            .iter()
            .map(|phrase| (normalize(phrase), self.meaningful_words(phrase)))
            .collect();

        candidates
            .filter(|c| c.category == item.category)
            .filter(|c| {
                let name = normalize(&c.name);
                let name_words: HashSet<&str> = name.split_whitespace().collect();
                phrases.iter().any(|(phrase, meaningful)| {
                    name.contains(phrase.as_str())
                        || meaningful
                            .iter()
                            .filter(|w| name_words.contains(w.as_str()))
                            .count()
                            >= self.policy.link_shared_words
                })
            })
            .collect()
    }

    fn name_varieties<'a>(
        &self,
        item: &CatalogItem,
        candidates: impl Iterator<Item = &'a CatalogItem>,
    ) -> Vec<&'a CatalogItem> {
        let name_words = words(&item.name);
        if name_words.len() < self.policy.name_fallback_min_words {
            return Vec::new();
        }
        let item_words: HashSet<String> = name_words.into_iter().collect();

        candidates
            .filter(|c| c.category == item.category)
            .filter(|c| {
                let shared = words(&c.name)
                    .into_iter()
                    .collect::<HashSet<_>>()
                    .intersection(&item_words)
                    .count();
                shared >= self.policy.name_fallback_shared_words
            })
            .collect()
    }

    fn meaningful_words(&self, phrase: &str) -> HashSet<String> {
        words(phrase)
            .into_iter()
            .filter(|w| w.chars().count() > self.policy.max_insignificant_len)
            .filter(|w| !self.policy.stopwords.contains(w))
            .collect()
    }
}

/// Varieties of `item` with the default policy.
#[must_use]
pub fn find_varieties(item: &CatalogItem, all_items: &[CatalogItem]) -> Vec<CatalogItem> {
    VarietyResolver::default().find_varieties(item, all_items)
}

/// Whether `item` has varieties under the default policy.
#[must_use]
pub fn has_varieties(item: &CatalogItem, all_items: &[CatalogItem]) -> bool {
    VarietyResolver::default().has_varieties(item, all_items)
}

/// Name with volume tokens and dangling separators removed, normalized.
#[must_use]
pub fn base_name(name: &str) -> String {
    let stripped = VOLUME_RE.replace_all(name, " ");
    let stripped = EMPTY_BRACKETS_RE.replace_all(&stripped, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c));
    normalize(trimmed)
}

fn volume_varieties<'a>(
    item: &CatalogItem,
    candidates: impl Iterator<Item = &'a CatalogItem>,
) -> Vec<&'a CatalogItem> {
    let base = base_name(&item.name);
    if base.is_empty() {
        return Vec::new();
    }
    let volumes = volumes_ml(&item.name);

    candidates
        .filter(|c| base_name(&c.name) == base && volumes_ml(&c.name) != volumes)
        .collect()
}

/// Volumes named in `name`, in millilitres, sorted and de-duplicated.
fn volumes_ml(name: &str) -> Vec<Decimal> {
    let mut volumes: Vec<Decimal> = VOLUME_RE
        .captures_iter(name)
        .filter_map(|caps| {
            let amount = Decimal::from_str(&caps.get(1)?.as_str().replace(',', ".")).ok()?;
            let scale = match caps.get(2)?.as_str().to_lowercase().as_str() {
                "ml" => 1,
                "cl" => 10,
                _ => 1000,
            };
            Some(amount * Decimal::from(scale))
        })
        .collect();
    volumes.sort();
    volumes.dedup();
    volumes
}

/// Variety names listed after "Also available:" in a description.
fn listed_varieties(description: &str) -> Vec<String> {
    let Some(list) = ALSO_AVAILABLE_RE
        .captures(description)
        .and_then(|caps| caps.get(1))
    else {
        return Vec::new();
    };

    list.as_str()
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.strip_prefix("and ")
                .or_else(|| part.strip_prefix("or "))
                .unwrap_or(part)
                .trim()
                .to_owned()
        })
        .filter(|part| !part.is_empty())
        .collect()
}
