//! Remote catalog source.
//!
//! Search runs twice: a coarse folded substring filter pushed to the store and
//! the authoritative [`SearchMatcher`] pass over the returned rows.
//!
//! Errors are returned as-is. This source never falls back to static data.

use tracing::{debug, instrument};

use dram_core::{CatalogItem, normalize};

use crate::search::{SearchMatcher, SearchTerm};

use super::{CatalogSource, Column, Filter, RowQuery, RowStore, SourceError, map_rows, probe_fragment};

/// Catalog source backed by a [`RowStore`].
#[derive(Debug, Clone)]
pub struct RemoteCatalog<S> {
    store: S,
    matcher: SearchMatcher,
    result_limit: usize,
    slug_probe_limit: usize,
}

impl<S: RowStore> RemoteCatalog<S> {
    #[must_use]
    pub const fn new(
        store: S,
        matcher: SearchMatcher,
        result_limit: usize,
        slug_probe_limit: usize,
    ) -> Self {
        Self {
            store,
            matcher,
            result_limit,
            slug_probe_limit,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The query a listing or search issues.
    #[must_use]
    pub fn listing_query(&self, search: Option<&SearchTerm>) -> RowQuery {
        match search {
            None => RowQuery::new(Column::listing(), self.result_limit),
            Some(term) => RowQuery::new(Column::detail(), self.result_limit).with_filter(
                Filter::AnyContains {
                    columns: Column::searchable(),
                    needles: term.needles(),
                },
            ),
        }
    }

    async fn find_exact(&self, slug: &str) -> Result<Option<CatalogItem>, SourceError> {
        let query = RowQuery::new(Column::detail(), 1)
            .with_filter(Filter::Eq(Column::Slug, slug.to_owned()));
        let rows = self.store.fetch_rows(&query).await?;
        Ok(map_rows(rows).into_iter().next())
    }

    /// Probe for slugs that differ from `slug` only by case or accents.
    async fn find_normalized(&self, slug: &str) -> Result<Option<CatalogItem>, SourceError> {
        let Some(fragment) = probe_fragment(slug) else {
            return Ok(None);
        };

        let query = RowQuery::new(Column::detail(), self.slug_probe_limit).with_filter(
            Filter::Contains {
                column: Column::Slug,
                needles: vec![normalize(fragment)],
            },
        );
        let candidates = map_rows(self.store.fetch_rows(&query).await?);
        debug!(
            fragment,
            candidates = candidates.len(),
            "Probed slug candidates"
        );

        let wanted = normalize(slug);
        Ok(candidates
            .into_iter()
            .find(|candidate| normalize(&candidate.slug) == wanted))
    }
}

impl<S: RowStore> CatalogSource for RemoteCatalog<S> {
    #[instrument(skip(self, search), fields(search = search.map(SearchTerm::normalized)))]
    async fn get_all(&self, search: Option<&SearchTerm>) -> Result<Vec<CatalogItem>, SourceError> {
        let query = self.listing_query(search);
        let items = map_rows(self.store.fetch_rows(&query).await?);

        Ok(match search {
            Some(term) => self.matcher.filter(term, items),
            None => items,
        })
    }

    #[instrument(skip(self))]
    async fn get_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, SourceError> {
        if let Some(item) = self.find_exact(slug).await? {
            return Ok(Some(item));
        }

        self.find_normalized(slug).await
    }
}
