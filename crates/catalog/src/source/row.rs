//! Row-to-item mapping shared by every source.
//!
//! Rows are loosely typed: legacy imports stored booleans and numbers as
//! strings, and arrays arrive as JSON arrays, JSON-encoded strings or comma
//! separated lists. All of that is coerced here and nowhere else.
//!
//! Keys are looked up by column name (`sale_price`) first and by the item's
//! serialized name (`salePrice`) second, so exported catalog JSON loads as-is.
//!
//! Required fields are `slug`, `name`, `category` and `price`. A row that
//! fails to map is skipped by [`map_rows`] with a warning; it never aborts the
//! batch.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use dram_core::{CatalogItem, Category, Style};

use super::{Column, SourceError};

/// Error mapping a single row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl RowError {
    fn invalid(column: Column, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: column.as_str(),
            reason: reason.into(),
        }
    }
}

/// One untyped row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(Map<String, Value>);

impl RawRow {
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Whether the row carries `key`, even as `null`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Keep only the listed keys.
    #[must_use]
    pub fn project(mut self, keys: &[&str]) -> Self {
        self.0.retain(|key, _| keys.contains(&key.as_str()));
        self
    }

    /// The non-null value for `column`, by column name or serialized name.
    fn lookup(&self, column: Column) -> Option<&Value> {
        self.0
            .get(column.as_str())
            .or_else(|| self.0.get(serialized_name(column)))
            .filter(|value| !value.is_null())
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for RawRow {
    type Error = SourceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(SourceError::Protocol(format!(
                "expected a row object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Map rows to items, skipping and logging the ones that fail.
#[must_use]
pub fn map_rows(rows: Vec<RawRow>) -> Vec<CatalogItem> {
    rows.into_iter()
        .filter_map(|row| match map_row(&row) {
            Ok(item) => Some(item),
            Err(e) => {
                let slug = row
                    .lookup(Column::Slug)
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown>");
                warn!(slug = %slug, error = %e, "Skipping malformed catalog row");
                None
            }
        })
        .collect()
}

/// Map one row to an item.
///
/// # Errors
///
/// Returns `RowError` if a required field is missing or any present field
/// cannot be coerced to its type.
pub fn map_row(row: &RawRow) -> Result<CatalogItem, RowError> {
    let slug = required_text(row, Column::Slug)?;
    let name = required_text(row, Column::Name)?;
    let category_raw = required_text(row, Column::Category)?;
    let category = Category::from_str(&category_raw)
        .map_err(|e| RowError::invalid(Column::Category, e.to_string()))?;

    let price = decimal(row, Column::Price)?.ok_or(RowError::MissingField("price"))?;
    if price.is_sign_negative() {
        return Err(RowError::invalid(Column::Price, "must not be negative"));
    }

    let on_sale = boolean(row, Column::OnSale)?;
    let sale_price = match decimal(row, Column::SalePrice)? {
        Some(sale) if on_sale && !sale.is_sign_negative() && sale <= price => Some(sale),
        Some(sale) => {
            debug!(slug = %slug, %sale, %price, on_sale, "Ignoring inapplicable sale price");
            None
        }
        None => None,
    };

    let abv = decimal(row, Column::Abv)?.filter(|abv| {
        let valid = !abv.is_sign_negative() && *abv <= Decimal::ONE_HUNDRED;
        if !valid {
            debug!(slug = %slug, %abv, "Ignoring out-of-range abv");
        }
        valid
    });

    Ok(CatalogItem {
        style: style(row, category, &slug)?,
        price,
        sale_price,
        on_sale,
        stock: stock(row)?,
        description: text(row, Column::Description)?.unwrap_or_default(),
        country: text(row, Column::Country)?.unwrap_or_default(),
        region: text(row, Column::Region)?,
        producer: text(row, Column::Producer)?,
        taste_profile: text(row, Column::TasteProfile)?,
        food_pairing: text(row, Column::FoodPairing)?,
        grapes: string_list(row, Column::Grapes)?,
        image: text(row, Column::Image)?.unwrap_or_default(),
        images: string_list(row, Column::Images)?,
        featured: boolean(row, Column::Featured)?,
        is_new: boolean(row, Column::IsNew)?,
        christmas_gift: boolean(row, Column::ChristmasGift)?,
        abv,
        volume_ml: positive_u32(row, Column::VolumeMl)?,
        created_at: timestamp(row, Column::CreatedAt)?,
        ..CatalogItem::new(slug, name, category, price)
    })
}

// =============================================================================
// Coercion
// =============================================================================

fn required_text(row: &RawRow, column: Column) -> Result<String, RowError> {
    text(row, column)?.ok_or(RowError::MissingField(column.as_str()))
}

/// Trimmed text; blank strings count as absent.
fn text(row: &RawRow, column: Column) -> Result<Option<String>, RowError> {
    match row.lookup(column) {
        None => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_owned()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(RowError::invalid(
            column,
            format!("expected text, got {}", json_kind(other)),
        )),
    }
}

/// Booleans, also accepting stringified and numeric spellings. Absent is `false`.
fn boolean(row: &RawRow, column: Column) -> Result<bool, RowError> {
    match row.lookup(column) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(RowError::invalid(column, format!("expected 0 or 1, got {n}"))),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => Ok(true),
            "false" | "f" | "0" | "no" | "n" | "off" | "" => Ok(false),
            other => Err(RowError::invalid(
                column,
                format!("expected a boolean, got '{other}'"),
            )),
        },
        Some(other) => Err(RowError::invalid(
            column,
            format!("expected a boolean, got {}", json_kind(other)),
        )),
    }
}

fn decimal(row: &RawRow, column: Column) -> Result<Option<Decimal>, RowError> {
    let raw = match row.lookup(column) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(other) => {
            return Err(RowError::invalid(
                column,
                format!("expected a number, got {}", json_kind(other)),
            ));
        }
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map(Some)
        .map_err(|e| RowError::invalid(column, format!("'{raw}': {e}")))
}

fn integer(row: &RawRow, column: Column) -> Result<Option<i64>, RowError> {
    let Some(value) = decimal(row, column)? else {
        return Ok(None);
    };

    if !value.fract().is_zero() {
        return Err(RowError::invalid(column, format!("expected an integer, got {value}")));
    }

    value
        .to_i64()
        .map(Some)
        .ok_or_else(|| RowError::invalid(column, format!("{value} is out of range")))
}

/// Stock defaults to zero; negative stock (oversold) reads as zero.
fn stock(row: &RawRow) -> Result<u32, RowError> {
    let stock = integer(row, Column::Stock)?.unwrap_or_default().max(0);
    Ok(u32::try_from(stock).unwrap_or(u32::MAX))
}

/// Strictly positive integers; zero or negative reads as absent.
fn positive_u32(row: &RawRow, column: Column) -> Result<Option<u32>, RowError> {
    let Some(value) = integer(row, column)? else {
        return Ok(None);
    };

    if value <= 0 {
        return Ok(None);
    }

    u32::try_from(value)
        .map(Some)
        .map_err(|e| RowError::invalid(column, e.to_string()))
}

/// Ordered strings from a JSON array, a JSON-encoded array, or a comma list.
fn string_list(row: &RawRow, column: Column) -> Result<Vec<String>, RowError> {
    match row.lookup(column) {
        None => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => Ok(s.trim().to_owned()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(RowError::invalid(
                    column,
                    format!("expected text elements, got {}", json_kind(other)),
                )),
            })
            .filter(|s| !matches!(s, Ok(s) if s.is_empty()))
            .collect(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.starts_with('[') {
                let values: Vec<String> = serde_json::from_str(s)
                    .map_err(|e| RowError::invalid(column, format!("malformed JSON array: {e}")))?;
                Ok(values
                    .into_iter()
                    .map(|v| v.trim().to_owned())
                    .filter(|v| !v.is_empty())
                    .collect())
            } else {
                Ok(s.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_owned)
                    .collect())
            }
        }
        Some(other) => Err(RowError::invalid(
            column,
            format!("expected a list, got {}", json_kind(other)),
        )),
    }
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` read as UTC.
fn timestamp(row: &RawRow, column: Column) -> Result<Option<DateTime<Utc>>, RowError> {
    let Some(raw) = text(row, column)? else {
        return Ok(None);
    };

    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|dt| dt.and_utc())
        })
        .map(Some)
        .map_err(|e| RowError::invalid(column, format!("'{raw}': {e}")))
}

/// The sub-type for the item's category. Sub-types of other categories are dropped.
fn style(row: &RawRow, category: Category, slug: &str) -> Result<Option<Style>, RowError> {
    let wine = text(row, Column::WineType)?;
    let spirit = text(row, Column::SpiritType)?;
    let beer = text(row, Column::BeerStyle)?;

    let (style, stray) = match category {
        Category::Wine => (wine.map(Style::Wine), spirit.or(beer)),
        Category::Spirits => (spirit.map(Style::Spirit), wine.or(beer)),
        Category::Beer => (beer.map(Style::Beer), wine.or(spirit)),
        Category::Cider | Category::Gifts => (None, wine.or(spirit).or(beer)),
    };

    if let Some(stray) = stray {
        debug!(slug = %slug, %category, style = %stray, "Dropping sub-type of another category");
    }

    Ok(style)
}

const fn serialized_name(column: Column) -> &'static str {
    match column {
        Column::WineType => "wineType",
        Column::SpiritType => "spiritType",
        Column::BeerStyle => "beerStyle",
        Column::TasteProfile => "tasteProfile",
        Column::FoodPairing => "foodPairing",
        Column::SalePrice => "salePrice",
        Column::OnSale => "onSale",
        Column::IsNew => "new",
        Column::ChristmasGift => "christmasGift",
        Column::VolumeMl => "volumeMl",
        Column::CreatedAt => "createdAt",
        other => other.as_str(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> RawRow {
        RawRow::try_from(value).unwrap()
    }

    fn minimal() -> Value {
        json!({
            "slug": "jameson-700ml",
            "name": "Jameson 700ml",
            "category": "spirits",
            "price": "30.00"
        })
    }

    #[test]
    fn test_minimal_row_defaults() {
        let item = map_row(&row(minimal())).unwrap();
        assert_eq!(item.slug, "jameson-700ml");
        assert_eq!(item.category, Category::Spirits);
        assert_eq!(item.price, Decimal::new(3000, 2));
        assert_eq!(item.stock, 0);
        assert!(item.description.is_empty());
        assert!(item.grapes.is_empty());
        assert!(!item.featured);
        assert_eq!(item.created_at, None);
    }

    #[test]
    fn test_missing_required_field() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("name");
        assert_eq!(map_row(&row(value)), Err(RowError::MissingField("name")));

        let mut value = minimal();
        value["price"] = Value::Null;
        assert_eq!(map_row(&row(value)), Err(RowError::MissingField("price")));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut value = minimal();
        value["category"] = json!("tobacco");
        assert!(matches!(
            map_row(&row(value)),
            Err(RowError::InvalidField { field: "category", .. })
        ));
    }

    #[test]
    fn test_stringified_booleans_and_numbers() {
        let mut value = minimal();
        value["featured"] = json!("true");
        value["is_new"] = json!("0");
        value["christmas_gift"] = json!(1);
        value["stock"] = json!("12");
        value["abv"] = json!("40.0");
        value["volume_ml"] = json!(700.0);

        let item = map_row(&row(value)).unwrap();
        assert!(item.featured);
        assert!(!item.is_new);
        assert!(item.christmas_gift);
        assert_eq!(item.stock, 12);
        assert_eq!(item.abv, Some(Decimal::new(400, 1)));
        assert_eq!(item.volume_ml, Some(700));
    }

    #[test]
    fn test_invalid_boolean_rejected() {
        let mut value = minimal();
        value["on_sale"] = json!("sometimes");
        assert!(matches!(
            map_row(&row(value)),
            Err(RowError::InvalidField { field: "on_sale", .. })
        ));
    }

    #[test]
    fn test_array_shapes() {
        let mut value = minimal();
        value["category"] = json!("wine");
        value["grapes"] = json!("[\"Grenache\", \"Syrah\"]");
        value["images"] = json!("a.jpg, b.jpg ,");
        let item = map_row(&row(value)).unwrap();
        assert_eq!(item.grapes, vec!["Grenache", "Syrah"]);
        assert_eq!(item.images, vec!["a.jpg", "b.jpg"]);

        let mut value = minimal();
        value["grapes"] = json!(["Mourvèdre", null, ""]);
        let item = map_row(&row(value)).unwrap();
        assert_eq!(item.grapes, vec!["Mourvèdre"]);
    }

    #[test]
    fn test_sale_price_requires_on_sale_and_not_above_price() {
        let mut value = minimal();
        value["sale_price"] = json!(25);
        assert_eq!(map_row(&row(value.clone())).unwrap().sale_price, None);

        value["on_sale"] = json!("t");
        let item = map_row(&row(value.clone())).unwrap();
        assert_eq!(item.sale_price, Some(Decimal::from(25)));
        assert_eq!(item.effective_price(), Decimal::from(25));

        value["sale_price"] = json!(35);
        assert_eq!(map_row(&row(value)).unwrap().sale_price, None);
    }

    #[test]
    fn test_style_follows_category() {
        let mut value = minimal();
        value["spirit_type"] = json!("Blended");
        value["wine_type"] = json!("Red");
        let item = map_row(&row(value)).unwrap();
        assert_eq!(item.style, Some(Style::Spirit("Blended".to_string())));

        let mut value = minimal();
        value["category"] = json!("cider");
        value["beer_style"] = json!("Stout");
        assert_eq!(map_row(&row(value)).unwrap().style, None);
    }

    #[test]
    fn test_serialized_names_accepted() {
        let value = json!({
            "slug": "cotes-du-rhone",
            "name": "Côtes du Rhône",
            "category": "wine",
            "price": 14.5,
            "wineType": "Red",
            "onSale": true,
            "salePrice": "12.00",
            "new": true,
            "createdAt": "2024-11-02T09:30:00Z"
        });

        let item = map_row(&row(value)).unwrap();
        assert_eq!(item.style, Some(Style::Wine("Red".to_string())));
        assert_eq!(item.sale_price, Some(Decimal::new(1200, 2)));
        assert!(item.is_new);
        assert!(item.created_at.is_some());
    }

    #[test]
    fn test_out_of_range_values_dropped() {
        let mut value = minimal();
        value["abv"] = json!(400);
        value["volume_ml"] = json!(0);
        value["stock"] = json!(-3);
        let item = map_row(&row(value)).unwrap();
        assert_eq!(item.abv, None);
        assert_eq!(item.volume_ml, None);
        assert_eq!(item.stock, 0);
    }

    #[test]
    fn test_timestamps() {
        let mut value = minimal();
        value["created_at"] = json!("2024-01-15 10:30:00");
        assert!(map_row(&row(value.clone())).unwrap().created_at.is_some());

        value["created_at"] = json!("last tuesday");
        assert!(map_row(&row(value)).is_err());
    }

    #[test]
    fn test_map_rows_skips_malformed() {
        let mut bad = minimal();
        bad["price"] = json!("free");
        let mut other = minimal();
        other["slug"] = json!("jameson-1l");

        let items = map_rows(vec![row(minimal()), row(bad), row(other)]);
        let slugs: Vec<&str> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["jameson-700ml", "jameson-1l"]);
    }

    #[test]
    fn test_non_object_row_is_protocol_error() {
        assert!(matches!(
            RawRow::try_from(json!([1, 2])),
            Err(SourceError::Protocol(_))
        ));
    }
}
