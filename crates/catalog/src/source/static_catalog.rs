//! Static catalog source.
//!
//! The dataset is a JSON array of rows, either bundled into the binary at
//! build time or read from a file at startup. It is loaded once and never
//! reloaded; rows go through the same mapper as remote rows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use dram_core::{CatalogItem, normalize};

use crate::search::{SearchMatcher, SearchTerm};

use super::{CatalogSource, RawRow, SourceError, map_rows};

/// The dataset compiled into the binary.
pub const BUNDLED_DATASET: &str = include_str!("../../data/catalog.json");

/// Errors loading a static dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset is not a JSON array of rows: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Catalog source over an in-memory dataset.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    items: Arc<[CatalogItem]>,
    matcher: SearchMatcher,
}

impl StaticCatalog {
    /// Load the bundled dataset.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Parse` if the bundled file is not a JSON array.
    pub fn bundled(matcher: SearchMatcher) -> Result<Self, DatasetError> {
        Self::from_json(BUNDLED_DATASET, matcher)
    }

    /// Load a dataset file.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError` if the file cannot be read or parsed.
    #[instrument(skip(matcher))]
    pub async fn from_path(path: &Path, matcher: SearchMatcher) -> Result<Self, DatasetError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DatasetError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json(&json, matcher)
    }

    /// Parse a dataset. Malformed rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Parse` if `json` is not an array of objects.
    pub fn from_json(json: &str, matcher: SearchMatcher) -> Result<Self, DatasetError> {
        let rows: Vec<RawRow> = serde_json::from_str(json)?;
        let total = rows.len();
        let items = map_rows(rows);

        info!(items = items.len(), skipped = total - items.len(), "Loaded static catalog");

        Ok(Self::from_items(items, matcher))
    }

    /// Wrap already-mapped items.
    #[must_use]
    pub fn from_items(items: Vec<CatalogItem>, matcher: SearchMatcher) -> Self {
        Self {
            items: items.into(),
            matcher,
        }
    }

    /// Every item, in dataset order.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    fn search(&self, term: &SearchTerm) -> Vec<CatalogItem> {
        self.items
            .iter()
            .filter(|item| self.matcher.matches(term, item))
            .cloned()
            .collect()
    }

    fn find(&self, slug: &str) -> Option<CatalogItem> {
        if let Some(item) = self.items.iter().find(|item| item.slug == slug) {
            return Some(item.clone());
        }

        let wanted = normalize(slug);
        self.items
            .iter()
            .find(|item| normalize(&item.slug) == wanted)
            .cloned()
    }
}

impl CatalogSource for StaticCatalog {
    async fn get_all(&self, search: Option<&SearchTerm>) -> Result<Vec<CatalogItem>, SourceError> {
        Ok(match search {
            Some(term) => self.search(term),
            None => self.items.to_vec(),
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, SourceError> {
        Ok(self.find(slug))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_json(
            r#"[
                {"slug": "côtes-du-rhône", "name": "Côtes du Rhône", "category": "wine", "price": 14},
                {"slug": "jameson-700ml", "name": "Jameson 700ml", "category": "spirits", "price": 30},
                {"slug": "broken", "name": "Broken", "category": "wine"},
                {"slug": "jameson-1l", "name": "Jameson 1L", "category": "spirits", "price": "42.50"}
            ]"#,
            SearchMatcher::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_bundled_dataset_loads() {
        let catalog = StaticCatalog::bundled(SearchMatcher::default()).unwrap();
        assert!(!catalog.items().is_empty());
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let catalog = catalog();
        let slugs: Vec<&str> = catalog.items().iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["côtes-du-rhône", "jameson-700ml", "jameson-1l"]);
    }

    #[test]
    fn test_not_an_array() {
        let result = StaticCatalog::from_json(r#"{"slug": "x"}"#, SearchMatcher::default());
        assert!(matches!(result, Err(DatasetError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result =
            StaticCatalog::from_path(Path::new("/nonexistent/catalog.json"), SearchMatcher::default())
                .await;
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }

    #[tokio::test]
    async fn test_slug_lookup_tolerates_accents() {
        let catalog = catalog();
        let exact = catalog.get_by_slug("jameson-1l").await.unwrap();
        assert_eq!(exact.unwrap().name, "Jameson 1L");

        let drifted = catalog.get_by_slug("cotes-du-rhone").await.unwrap();
        assert_eq!(drifted.unwrap().slug, "côtes-du-rhône");

        assert!(catalog.get_by_slug("powers-700ml").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search() {
        let catalog = catalog();
        let term = SearchTerm::parse("rhone").unwrap();
        let found = catalog.get_all(Some(&term)).await.unwrap();
        assert_eq!(found.len(), 1);

        let all = catalog.get_all(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
