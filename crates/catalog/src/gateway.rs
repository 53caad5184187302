//! Source selection.
//!
//! The enablement flag is read once, when the gateway is built, and the
//! chosen source serves every read for the lifetime of the process. A failing
//! remote source is reported, never replaced by static data.

use tracing::{error, info};

use dram_core::CatalogItem;

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::search::{SearchMatcher, SearchTerm};
use crate::source::{CatalogSource, PgRowStore, RemoteCatalog, RowStore, SourceError, StaticCatalog};

/// The catalog source chosen at startup.
#[derive(Debug, Clone)]
pub enum CatalogGateway<S = PgRowStore> {
    Remote(RemoteCatalog<S>),
    Static(StaticCatalog),
}

impl CatalogGateway<PgRowStore> {
    /// Build the gateway described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SourceUnavailable` if the remote source is
    /// enabled but unreachable, or `CatalogError::Dataset` if the static
    /// dataset cannot be loaded.
    pub async fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let matcher = SearchMatcher::new(config.search);

        if let Some(remote) = &config.remote {
            let store = PgRowStore::connect(remote).await?;
            info!(table = %remote.table, "Catalog reads served from PostgreSQL");
            return Ok(Self::Remote(RemoteCatalog::new(
                store,
                matcher,
                config.result_limit,
                config.slug_probe_limit,
            )));
        }

        let catalog = match &config.static_data {
            Some(path) => StaticCatalog::from_path(path, matcher).await?,
            None => StaticCatalog::bundled(matcher)?,
        };
        info!(
            items = catalog.items().len(),
            "Catalog reads served from static dataset"
        );

        Ok(Self::Static(catalog))
    }
}

impl<S: RowStore> CatalogGateway<S> {
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Short label for logs.
    #[must_use]
    pub const fn source_name(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Static(_) => "static",
        }
    }
}

impl<S: RowStore> CatalogSource for CatalogGateway<S> {
    async fn get_all(&self, search: Option<&SearchTerm>) -> Result<Vec<CatalogItem>, SourceError> {
        let result = match self {
            Self::Remote(source) => source.get_all(search).await,
            Self::Static(source) => source.get_all(search).await,
        };

        if let Err(e) = &result {
            error!(source = self.source_name(), error = %e, "Catalog listing failed");
        }
        result
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, SourceError> {
        let result = match self {
            Self::Remote(source) => source.get_by_slug(slug).await,
            Self::Static(source) => source.get_by_slug(slug).await,
        };

        if let Err(e) = &result {
            error!(source = self.source_name(), slug, error = %e, "Catalog slug lookup failed");
        }
        result
    }
}
