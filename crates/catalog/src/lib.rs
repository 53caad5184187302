//! Dram catalog resolution engine.
//!
//! This crate resolves catalog reads for the storefront:
//!
//! - [`cache`] - TTL cache in front of every read
//! - [`source`] - Remote (`PostgreSQL`) and static (bundled dataset) sources
//! - [`gateway`] - Selects exactly one source for the lifetime of the process
//! - [`search`] - Tiered, diacritic-insensitive search matching
//! - [`varieties`] - Clusters pack sizes and expressions of the same product
//! - [`service`] - The facade handed to page rendering and the admin write path
//!
//! # Example
//!
//! ```rust,ignore
//! use dram_catalog::{CatalogConfig, CatalogService, find_varieties};
//!
//! let config = CatalogConfig::from_env()?;
//! let catalog = CatalogService::from_config(&config).await?;
//!
//! let product = catalog.get_product_by_slug("teeling-small-batch-700ml").await?;
//! let all = catalog.get_all_products(None).await?;
//! if let Some(product) = product {
//!     let varieties = find_varieties(&product, &all);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod search;
pub mod service;
pub mod source;
pub mod varieties;

pub use cache::{CacheKey, CacheValue, TtlCache};
pub use config::{CatalogConfig, ConfigError, RemoteConfig};
pub use error::CatalogError;
pub use gateway::CatalogGateway;
pub use search::{MatchTier, SearchMatcher, SearchPolicy, SearchTerm};
pub use service::CatalogService;
pub use source::{
    CatalogSource, Column, Filter, PgRowStore, RawRow, RemoteCatalog, RowQuery, RowStore,
    SourceError, StaticCatalog,
};
pub use varieties::{
    VarietyMatch, VarietyPolicy, VarietyResolver, VarietyTier, find_varieties, has_varieties,
};
