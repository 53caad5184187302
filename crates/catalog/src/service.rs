//! Catalog service: the read facade used by page rendering.
//!
//! Every read goes through the cache first. On a miss the selected source is
//! queried under a deadline and only a successful result is cached, so a
//! timed-out or failed read leaves the cache untouched.
//!
//! The admin write path calls the `invalidate_*` methods after mutating the
//! products table.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use dram_core::{CatalogItem, normalize};

use crate::cache::{CacheKey, CacheValue, TtlCache};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::gateway::CatalogGateway;
use crate::search::SearchTerm;
use crate::source::{CatalogSource, PgRowStore, RowStore, SourceError};
use crate::varieties::VarietyResolver;

/// Cached, deadline-bounded catalog reads.
///
/// Cheap to clone; clones share the cache and the source.
pub struct CatalogService<S = PgRowStore> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    gateway: CatalogGateway<S>,
    cache: TtlCache<CacheKey, CacheValue>,
    varieties: VarietyResolver,
    read_timeout: Duration,
}

impl<S> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CatalogService<PgRowStore> {
    /// Build the service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the selected source cannot be set up.
    pub async fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let gateway = CatalogGateway::from_config(config).await?;
        let cache = TtlCache::new(config.cache_ttl, config.cache_sweep_threshold);

        Ok(Self::new(
            gateway,
            cache,
            VarietyResolver::new(config.varieties.clone()),
            config.read_timeout,
        ))
    }
}

impl<S: RowStore> CatalogService<S> {
    #[must_use]
    pub fn new(
        gateway: CatalogGateway<S>,
        cache: TtlCache<CacheKey, CacheValue>,
        varieties: VarietyResolver,
        read_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                cache,
                varieties,
                read_timeout,
            }),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &CatalogGateway<S> {
        &self.inner.gateway
    }

    #[must_use]
    pub fn cache(&self) -> &TtlCache<CacheKey, CacheValue> {
        &self.inner.cache
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.inner.read_timeout
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All products, narrowed by `search` when it is not blank.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SourceUnavailable` if the source fails or
    /// `CatalogError::Timeout` if it does not answer within the default deadline.
    pub async fn get_all_products(
        &self,
        search: Option<&str>,
    ) -> Result<Arc<[CatalogItem]>, CatalogError> {
        self.get_all_products_within(search, self.inner.read_timeout)
            .await
    }

    /// [`get_all_products`](Self::get_all_products) with an explicit deadline.
    ///
    /// # Errors
    ///
    /// See [`get_all_products`](Self::get_all_products).
    #[instrument(skip(self), fields(source = self.inner.gateway.source_name()))]
    pub async fn get_all_products_within(
        &self,
        search: Option<&str>,
        timeout: Duration,
    ) -> Result<Arc<[CatalogItem]>, CatalogError> {
        let term = search.and_then(SearchTerm::parse);
        let cache_key = CacheKey::Products {
            search: term.as_ref().map(|t| t.normalized().to_owned()),
        };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let items = within(timeout, self.inner.gateway.get_all(term.as_ref())).await?;
        let products: Arc<[CatalogItem]> = items.into();
        debug!(count = products.len(), "Fetched products");

        self.inner
            .cache
            .set(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// The product for `slug`, or `None` if there is no such product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SourceUnavailable` if the source fails or
    /// `CatalogError::Timeout` if it does not answer within the default deadline.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, CatalogError> {
        self.get_product_by_slug_within(slug, self.inner.read_timeout)
            .await
    }

    /// [`get_product_by_slug`](Self::get_product_by_slug) with an explicit deadline.
    ///
    /// # Errors
    ///
    /// See [`get_product_by_slug`](Self::get_product_by_slug).
    #[instrument(skip(self), fields(source = self.inner.gateway.source_name()))]
    pub async fn get_product_by_slug_within(
        &self,
        slug: &str,
        timeout: Duration,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        let cache_key = CacheKey::Product(slug.to_owned());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let product = within(timeout, self.inner.gateway.get_by_slug(slug)).await?;

        // Misses are not cached so a newly added product shows up immediately
        if let Some(product) = &product {
            self.inner
                .cache
                .set(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }

        Ok(product)
    }

    /// Varieties of `item` within the full catalog.
    ///
    /// Never fails: if the catalog cannot be read the product simply renders
    /// without varieties.
    pub async fn varieties_for(&self, item: &CatalogItem) -> Vec<CatalogItem> {
        match self.get_all_products(None).await {
            Ok(all) => self.inner.varieties.find_varieties(item, &all),
            Err(e) => {
                warn!(slug = %item.slug, error = %e, "Skipping varieties, catalog unavailable");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Drop cached lookups of one product, including accent-drifted slugs.
    pub async fn invalidate_product(&self, slug: &str) {
        let wanted = normalize(slug);
        self.inner
            .cache
            .invalidate_where(|key| matches!(key, CacheKey::Product(s) if normalize(s) == wanted))
            .await;
        debug!(slug, "Invalidated cached product");
    }

    /// Drop every cached listing and search result.
    pub async fn invalidate_listings(&self) {
        self.inner
            .cache
            .invalidate_where(|key| matches!(key, CacheKey::Products { .. }))
            .await;
        debug!("Invalidated cached listings");
    }

    /// Drop everything.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all().await;
        debug!("Invalidated catalog cache");
    }
}

/// Run a source read under a deadline.
async fn within<T>(
    timeout: Duration,
    read: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, CatalogError> {
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis(), "Catalog read timed out");
            Err(CatalogError::Timeout(timeout))
        }
    }
}
