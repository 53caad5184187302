//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (remote mode only)
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `CATALOG_REMOTE_ENABLED` - Serve reads from `PostgreSQL` instead of the static dataset (default: false)
//! - `CATALOG_TABLE` - Products table, optionally schema-qualified (default: catalog.products)
//! - `CATALOG_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `CATALOG_STATIC_DATA` - Path to a JSON dataset replacing the bundled one
//! - `CATALOG_CACHE_TTL_SECS` - Cache entry lifetime (default: 300)
//! - `CATALOG_CACHE_SWEEP_THRESHOLD` - Entry count that triggers an expiry sweep (default: 100)
//! - `CATALOG_RESULT_LIMIT` - Maximum rows per remote listing (default: 1000)
//! - `CATALOG_SLUG_PROBE_LIMIT` - Maximum candidates for fuzzy slug lookup (default: 20)
//! - `CATALOG_READ_TIMEOUT_SECS` - Default deadline for a catalog read (default: 10)
//! - `CATALOG_SEARCH_MULTI_WORD_MIN` - Words needed before description fields are searched (default: 2)
//! - `CATALOG_VARIETY_NAME_MIN_WORDS` - Words needed for name-based variety matching (default: 3)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::search::SearchPolicy;
use crate::varieties::VarietyPolicy;

const DEFAULT_TABLE: &str = "catalog.products";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Catalog engine configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Remote source settings. `Some` exactly when the remote source is enabled.
    pub remote: Option<RemoteConfig>,
    /// Dataset file replacing the bundled static dataset
    pub static_data: Option<PathBuf>,
    /// How long a cached read stays fresh
    pub cache_ttl: Duration,
    /// Entry count above which inserts first purge expired entries
    pub cache_sweep_threshold: u64,
    /// Result ceiling for remote listings
    pub result_limit: usize,
    /// Candidate ceiling for the normalized slug probe
    pub slug_probe_limit: usize,
    /// Default deadline for catalog reads
    pub read_timeout: Duration,
    /// Search strictness thresholds
    pub search: SearchPolicy,
    /// Variety clustering thresholds
    pub varieties: VarietyPolicy,
}

/// Remote (`PostgreSQL`) source configuration.
///
/// Implements `Debug` manually to redact the connection string.
#[derive(Clone)]
pub struct RemoteConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    /// Products table, e.g. `catalog.products`
    pub table: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("database_url", &"[REDACTED]")
            .field("table", &self.table)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            remote: None,
            static_data: None,
            cache_ttl: Duration::from_secs(300),
            cache_sweep_threshold: 100,
            result_limit: 1000,
            slug_probe_limit: 20,
            read_timeout: Duration::from_secs(10),
            search: SearchPolicy::default(),
            varieties: VarietyPolicy::default(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the remote source is enabled without a database
    /// URL, or if any variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`CatalogConfig::from_env`].
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let remote = if parse_bool(&get, "CATALOG_REMOTE_ENABLED", false)? {
            Some(RemoteConfig::from_vars(&get)?)
        } else {
            None
        };

        let cache_ttl = Duration::from_secs(parse_positive(
            &get,
            "CATALOG_CACHE_TTL_SECS",
            defaults.cache_ttl.as_secs(),
        )?);
        let read_timeout = Duration::from_secs(parse_positive(
            &get,
            "CATALOG_READ_TIMEOUT_SECS",
            defaults.read_timeout.as_secs(),
        )?);

        let search = SearchPolicy {
            multi_word_min: parse_positive(
                &get,
                "CATALOG_SEARCH_MULTI_WORD_MIN",
                defaults.search.multi_word_min,
            )?,
        };
        let varieties = VarietyPolicy {
            name_fallback_min_words: parse_positive(
                &get,
                "CATALOG_VARIETY_NAME_MIN_WORDS",
                defaults.varieties.name_fallback_min_words,
            )?,
            ..defaults.varieties
        };

        Ok(Self {
            remote,
            static_data: get("CATALOG_STATIC_DATA").map(PathBuf::from),
            cache_ttl,
            cache_sweep_threshold: parse_positive(
                &get,
                "CATALOG_CACHE_SWEEP_THRESHOLD",
                defaults.cache_sweep_threshold,
            )?,
            result_limit: parse_positive(&get, "CATALOG_RESULT_LIMIT", defaults.result_limit)?,
            slug_probe_limit: parse_positive(
                &get,
                "CATALOG_SLUG_PROBE_LIMIT",
                defaults.slug_probe_limit,
            )?,
            read_timeout,
            search,
            varieties,
        })
    }

    /// Whether reads go to the remote source.
    #[must_use]
    pub const fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }
}

impl RemoteConfig {
    fn from_vars(get: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("CATALOG_DATABASE_URL")
            // Generic name used by managed Postgres attachments
            .or_else(|| get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("CATALOG_DATABASE_URL".to_string()))?;

        let table = get("CATALOG_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table_name(&table)
            .map_err(|reason| ConfigError::InvalidEnvVar("CATALOG_TABLE".to_string(), reason))?;

        Ok(Self {
            database_url,
            table,
            max_connections: parse_positive(get, "CATALOG_DB_MAX_CONNECTIONS", 10)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a boolean flag, accepting the usual spellings.
fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse a strictly positive number, falling back to `default` when unset.
fn parse_positive<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };

    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if value <= T::default() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }

    Ok(value)
}

/// Table names are interpolated into SQL, so only plain identifiers are allowed.
fn validate_table_name(table: &str) -> Result<(), String> {
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("'{table}' has too many qualifiers"));
    }

    for part in parts {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_start || !valid_rest {
            return Err(format!("'{table}' is not a plain lowercase identifier"));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CatalogConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CatalogConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_use_static_mode() {
        let config = load(&[]).unwrap();
        assert!(!config.remote_enabled());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_sweep_threshold, 100);
        assert_eq!(config.result_limit, 1000);
        assert_eq!(config.slug_probe_limit, 20);
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.search.multi_word_min, 2);
        assert_eq!(config.varieties.name_fallback_min_words, 3);
    }

    #[test]
    fn test_remote_requires_database_url() {
        let result = load(&[("CATALOG_REMOTE_ENABLED", "true")]);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_remote_falls_back_to_database_url() {
        let config = load(&[
            ("CATALOG_REMOTE_ENABLED", "1"),
            ("DATABASE_URL", "postgres://localhost/dram"),
        ])
        .unwrap();

        let remote = config.remote.unwrap();
        assert_eq!(remote.database_url.expose_secret(), "postgres://localhost/dram");
        assert_eq!(remote.table, "catalog.products");
        assert_eq!(remote.max_connections, 10);
    }

    #[test]
    fn test_invalid_boolean() {
        let result = load(&[("CATALOG_REMOTE_ENABLED", "maybe")]);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = load(&[("CATALOG_CACHE_TTL_SECS", "0")]);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CATALOG_CACHE_TTL_SECS", "60"),
            ("CATALOG_RESULT_LIMIT", "250"),
            ("CATALOG_SEARCH_MULTI_WORD_MIN", "3"),
            ("CATALOG_VARIETY_NAME_MIN_WORDS", "4"),
            ("CATALOG_STATIC_DATA", "/srv/catalog.json"),
        ])
        .unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.result_limit, 250);
        assert_eq!(config.search.multi_word_min, 3);
        assert_eq!(config.varieties.name_fallback_min_words, 4);
        assert_eq!(config.static_data, Some(PathBuf::from("/srv/catalog.json")));
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("products").is_ok());
        assert!(validate_table_name("catalog.products_v2").is_ok());
        assert!(validate_table_name("catalog.products; drop table x").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("Products").is_err());
    }

    #[test]
    fn test_remote_config_debug_redacts_url() {
        let remote = RemoteConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/dram"),
            table: "catalog.products".to_string(),
            max_connections: 5,
        };

        let debug_output = format!("{remote:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("catalog.products"));
        assert!(!debug_output.contains("hunter2"));
    }
}
