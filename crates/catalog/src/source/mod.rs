//! Catalog sources.
//!
//! Two sources implement [`CatalogSource`]:
//!
//! - [`remote::RemoteCatalog`] reads from a [`RowStore`] (in production
//!   [`postgres::PgRowStore`]).
//! - [`static_catalog::StaticCatalog`] reads from a dataset loaded once at
//!   startup.
//!
//! Both hand their rows to [`row::map_rows`], so coercion rules are identical
//! regardless of where a row came from.

pub mod postgres;
pub mod remote;
pub mod row;
pub mod static_catalog;

use std::future::Future;

use thiserror::Error;

use dram_core::CatalogItem;

use crate::search::SearchTerm;

pub use postgres::PgRowStore;
pub use remote::RemoteCatalog;
pub use row::{RawRow, RowError, map_row, map_rows};
pub use static_catalog::{DatasetError, StaticCatalog};

/// Errors from a catalog source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something that is not a row object.
    #[error("Unexpected row shape: {0}")]
    Protocol(String),
}

/// A column of the products table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Slug,
    Name,
    Category,
    Description,
    Country,
    WineType,
    SpiritType,
    BeerStyle,
    Region,
    Producer,
    TasteProfile,
    FoodPairing,
    Grapes,
    Image,
    Images,
    Price,
    SalePrice,
    OnSale,
    Stock,
    Featured,
    IsNew,
    ChristmasGift,
    Abv,
    VolumeMl,
    CreatedAt,
}

impl Column {
    /// Every column, description included.
    pub const ALL: [Self; 25] = [
        Self::Slug,
        Self::Name,
        Self::Category,
        Self::Description,
        Self::Country,
        Self::WineType,
        Self::SpiritType,
        Self::BeerStyle,
        Self::Region,
        Self::Producer,
        Self::TasteProfile,
        Self::FoodPairing,
        Self::Grapes,
        Self::Image,
        Self::Images,
        Self::Price,
        Self::SalePrice,
        Self::OnSale,
        Self::Stock,
        Self::Featured,
        Self::IsNew,
        Self::ChristmasGift,
        Self::Abv,
        Self::VolumeMl,
        Self::CreatedAt,
    ];

    /// Column name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slug => "slug",
            Self::Name => "name",
            Self::Category => "category",
            Self::Description => "description",
            Self::Country => "country",
            Self::WineType => "wine_type",
            Self::SpiritType => "spirit_type",
            Self::BeerStyle => "beer_style",
            Self::Region => "region",
            Self::Producer => "producer",
            Self::TasteProfile => "taste_profile",
            Self::FoodPairing => "food_pairing",
            Self::Grapes => "grapes",
            Self::Image => "image",
            Self::Images => "images",
            Self::Price => "price",
            Self::SalePrice => "sale_price",
            Self::OnSale => "on_sale",
            Self::Stock => "stock",
            Self::Featured => "featured",
            Self::IsNew => "is_new",
            Self::ChristmasGift => "christmas_gift",
            Self::Abv => "abv",
            Self::VolumeMl => "volume_ml",
            Self::CreatedAt => "created_at",
        }
    }

    /// Whether the column holds a `text[]`.
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(self, Self::Grapes | Self::Images)
    }

    /// Columns for listings without a search: everything except the description.
    #[must_use]
    pub fn listing() -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|c| *c != Self::Description)
            .collect()
    }

    /// Columns for searches and single-product reads.
    #[must_use]
    pub fn detail() -> Vec<Self> {
        Self::ALL.to_vec()
    }

    /// Columns searched by the coarse remote filter (both search tiers).
    #[must_use]
    pub fn searchable() -> Vec<Self> {
        vec![
            Self::Name,
            Self::Slug,
            Self::Region,
            Self::Country,
            Self::Producer,
            Self::Grapes,
            Self::Description,
            Self::TasteProfile,
            Self::FoodPairing,
        ]
    }
}

/// Row filter understood by every [`RowStore`].
///
/// Substring filters compare folded text: the store lower-cases the column and
/// strips its accents, and needles arrive already folded with
/// [`dram_core::normalize`]. A filter with several needles matches when any one
/// of them does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Column equals the value exactly.
    Eq(Column, String),
    /// Column contains any of the needles.
    Contains { column: Column, needles: Vec<String> },
    /// Any of the columns contains any of the needles.
    AnyContains {
        columns: Vec<Column>,
        needles: Vec<String>,
    },
}

/// A read against the products table, always ordered newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub columns: Vec<Column>,
    pub filter: Option<Filter>,
    pub limit: usize,
}

impl RowQuery {
    #[must_use]
    pub const fn new(columns: Vec<Column>, limit: usize) -> Self {
        Self {
            columns,
            filter: None,
            limit,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether the projection includes `column`.
    #[must_use]
    pub fn selects(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }
}

/// Queryable row storage behind the remote source.
pub trait RowStore: Send + Sync + 'static {
    /// Fetch rows ordered by `created_at` descending.
    fn fetch_rows(
        &self,
        query: &RowQuery,
    ) -> impl Future<Output = Result<Vec<RawRow>, SourceError>> + Send;
}

/// A source of catalog items.
pub trait CatalogSource: Send + Sync {
    /// All items, narrowed by `search` when given.
    fn get_all(
        &self,
        search: Option<&SearchTerm>,
    ) -> impl Future<Output = Result<Vec<CatalogItem>, SourceError>> + Send;

    /// The item for `slug`, tolerating accent drift between stored and requested slugs.
    fn get_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<CatalogItem>, SourceError>> + Send;
}

/// The first hyphen-separated fragment of a slug long enough to probe with.
#[must_use]
pub fn probe_fragment(slug: &str) -> Option<&str> {
    slug.split('-').find(|fragment| fragment.chars().count() > 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_excludes_description() {
        let listing = Column::listing();
        assert!(!listing.contains(&Column::Description));
        assert_eq!(listing.len(), Column::ALL.len() - 1);
        assert!(Column::detail().contains(&Column::Description));
    }

    #[test]
    fn test_searchable_covers_both_tiers() {
        let searchable = Column::searchable();
        assert!(searchable.contains(&Column::Name));
        assert!(searchable.contains(&Column::Grapes));
        assert!(searchable.contains(&Column::FoodPairing));
        assert!(!searchable.contains(&Column::Price));
    }

    #[test]
    fn test_probe_fragment() {
        assert_eq!(probe_fragment("cotes-du-rhone"), Some("cotes"));
        assert_eq!(probe_fragment("a-du-rhône"), Some("rhône"));
        assert_eq!(probe_fragment("a-b"), None);
    }

    #[test]
    fn test_row_query_builder() {
        let query = RowQuery::new(Column::listing(), 10)
            .with_filter(Filter::Eq(Column::Slug, "teeling".to_string()));
        assert!(query.selects(Column::Slug));
        assert!(!query.selects(Column::Description));
        assert_eq!(query.limit, 10);
    }
}
