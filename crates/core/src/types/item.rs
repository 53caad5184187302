//! The canonical catalog record.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known [`Category`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(pub String);

/// Product category.
///
/// The set is closed: rows with any other category are rejected during
/// row mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Wine,
    Spirits,
    Beer,
    Cider,
    Gifts,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 5] = [
        Self::Wine,
        Self::Spirits,
        Self::Beer,
        Self::Cider,
        Self::Gifts,
    ];

    /// Stable lowercase name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wine => "wine",
            Self::Spirits => "spirits",
            Self::Beer => "beer",
            Self::Cider => "cider",
            Self::Gifts => "gifts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wine" | "wines" => Ok(Self::Wine),
            "spirit" | "spirits" => Ok(Self::Spirits),
            "beer" | "beers" => Ok(Self::Beer),
            "cider" | "ciders" => Ok(Self::Cider),
            "gift" | "gifts" => Ok(Self::Gifts),
            _ => Err(ParseCategoryError(s.to_owned())),
        }
    }
}

/// Category-specific sub-type.
///
/// Only one sub-type exists per item, and its variant always agrees with the
/// item's [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Style {
    /// e.g. "Red", "Sparkling".
    Wine(String),
    /// e.g. "Single Pot Still".
    Spirit(String),
    /// e.g. "Stout".
    Beer(String),
}

impl Style {
    /// The category this style belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Wine(_) => Category::Wine,
            Self::Spirit(_) => Category::Spirits,
            Self::Beer(_) => Category::Beer,
        }
    }

    /// The style label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wine(s) | Self::Spirit(s) | Self::Beer(s) => s,
        }
    }
}

/// One sellable product record (a specific name/size/price combination).
///
/// Items are immutable once read into a result set; updates belong to the
/// admin write path, which is responsible for invalidating cached reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Unique, URL-safe identifier. Never changes after creation.
    pub slug: String,
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,

    /// Regular price.
    pub price: Decimal,
    /// Sale price, only present when `on_sale` is set and it does not exceed `price`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub stock: u32,

    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub taste_profile: Option<String>,
    #[serde(default)]
    pub food_pairing: Option<String>,
    #[serde(default)]
    pub grapes: Vec<String>,

    /// Primary image URI.
    #[serde(default)]
    pub image: String,
    /// Additional images, in display order.
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub featured: bool,
    #[serde(default, rename = "new")]
    pub is_new: bool,
    #[serde(default)]
    pub christmas_gift: bool,

    /// Alcohol by volume, 0-100.
    #[serde(default)]
    pub abv: Option<Decimal>,
    #[serde(default)]
    pub volume_ml: Option<u32>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CatalogItem {
    /// Create an item with the required fields and every optional field empty.
    #[must_use]
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        price: Decimal,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            category,
            style: None,
            price,
            sale_price: None,
            on_sale: false,
            stock: 0,
            description: String::new(),
            country: String::new(),
            region: None,
            producer: None,
            taste_profile: None,
            food_pairing: None,
            grapes: Vec::new(),
            image: String::new(),
            images: Vec::new(),
            featured: false,
            is_new: false,
            christmas_gift: false,
            abv: None,
            volume_ml: None,
            created_at: None,
        }
    }

    /// The price a customer pays right now.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if self.on_sale => sale,
            _ => self.price,
        }
    }

    /// Whether the item is currently discounted.
    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.on_sale && self.sale_price.is_some()
    }

    /// Whether at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!("Wine".parse::<Category>().unwrap(), Category::Wine);
        assert_eq!(" spirit ".parse::<Category>().unwrap(), Category::Spirits);
        assert_eq!(
            "vodka".parse::<Category>(),
            Err(ParseCategoryError("vodka".to_owned()))
        );
    }

    #[test]
    fn test_category_display_roundtrip() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_style_category() {
        assert_eq!(Style::Wine("Red".into()).category(), Category::Wine);
        assert_eq!(Style::Spirit("Gin".into()).category(), Category::Spirits);
        assert_eq!(Style::Beer("Stout".into()).as_str(), "Stout");
    }

    #[test]
    fn test_effective_price() {
        let mut item = CatalogItem::new("a", "A", Category::Wine, Decimal::new(2000, 2));
        assert_eq!(item.effective_price(), Decimal::new(2000, 2));

        item.sale_price = Some(Decimal::new(1500, 2));
        assert_eq!(item.effective_price(), Decimal::new(2000, 2));
        assert!(!item.is_discounted());

        item.on_sale = true;
        assert_eq!(item.effective_price(), Decimal::new(1500, 2));
        assert!(item.is_discounted());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let mut item = CatalogItem::new("teeling-700ml", "Teeling 700ml", Category::Spirits, Decimal::from(40));
        item.is_new = true;
        item.volume_ml = Some(700);

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["new"], serde_json::Value::Bool(true));
        assert_eq!(json["volumeMl"], serde_json::json!(700));
        assert_eq!(json["category"], "spirits");
        assert!(json.get("style").is_none());
    }
}
