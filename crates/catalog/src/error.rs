//! Catalog error taxonomy.
//!
//! A missing product is not an error: slug lookups return `Ok(None)`.
//! Malformed rows are not errors either; they are skipped and logged during
//! row mapping (see [`crate::source::row`]).

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::source::SourceError;
use crate::source::static_catalog::DatasetError;

/// Errors surfaced by catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The enabled remote source failed. Never masked by static data.
    #[error("Catalog source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// The read did not finish within its deadline.
    #[error("Catalog read timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The static dataset could not be loaded.
    #[error("Static dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CatalogError {
    /// Whether the caller may degrade gracefully (e.g. render without varieties).
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
