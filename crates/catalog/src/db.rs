//! `PostgreSQL` connection pool for the remote catalog source.
//!
//! # Expected table
//!
//! The products table (default `catalog.products`) is owned by the admin
//! subsystem, which also owns its migrations. The catalog engine only reads
//! from it and expects these columns:
//!
//! - `slug`, `name`, `category`, `description`, `country` - text
//! - `wine_type`, `spirit_type`, `beer_style`, `region`, `producer`,
//!   `taste_profile`, `food_pairing`, `image` - text, nullable
//! - `grapes`, `images` - `text[]`
//! - `price`, `sale_price`, `abv` - numeric
//! - `on_sale`, `featured`, `is_new`, `christmas_gift` - boolean
//! - `stock`, `volume_ml` - integer
//! - `created_at` - timestamptz
//!
//! Columns may also hold stringified values (legacy imports); row mapping
//! coerces them.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::RemoteConfig;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &RemoteConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(config.database_url.expose_secret())
        .await
}
