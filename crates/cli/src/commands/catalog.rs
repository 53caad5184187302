//! Catalog inspection commands.
//!
//! # Usage
//!
//! ```bash
//! dram products --search malbec
//! dram product jameson-700ml --json
//! dram varieties teeling-small-batch-700ml
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_REMOTE_ENABLED` - Read from `PostgreSQL` instead of the bundled dataset
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (remote mode)

use serde::Serialize;
use thiserror::Error;

use dram_catalog::{CatalogError, CatalogService, VarietyPolicy, VarietyResolver, VarietyTier};
use dram_core::CatalogItem;

/// Errors that can occur during catalog commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No product has the requested slug.
    #[error("Product not found: {0}")]
    NotFound(String),

    /// The catalog read failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Output could not be encoded.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct VarietyOutput<'a> {
    tier: &'static str,
    #[serde(flatten)]
    item: &'a CatalogItem,
}

/// List products, newest first.
#[allow(clippy::print_stdout)]
pub async fn products(
    catalog: &CatalogService,
    search: Option<&str>,
    json: bool,
) -> Result<(), CommandError> {
    let products = catalog.get_all_products(search).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*products)?);
    } else {
        for item in products.iter() {
            println!("{}", format_row(item));
        }
    }

    tracing::info!(count = products.len(), "Listed products");
    Ok(())
}

/// Show one product.
#[allow(clippy::print_stdout)]
pub async fn product(catalog: &CatalogService, slug: &str, json: bool) -> Result<(), CommandError> {
    let item = catalog
        .get_product_by_slug(slug)
        .await?
        .ok_or_else(|| CommandError::NotFound(slug.to_owned()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{}", format_detail(&item));
    }
    Ok(())
}

/// List the varieties of a product with the tier that linked each one.
#[allow(clippy::print_stdout)]
pub async fn varieties(
    catalog: &CatalogService,
    slug: &str,
    policy: VarietyPolicy,
    json: bool,
) -> Result<(), CommandError> {
    let item = catalog
        .get_product_by_slug(slug)
        .await?
        .ok_or_else(|| CommandError::NotFound(slug.to_owned()))?;
    let all = catalog.get_all_products(None).await?;

    let resolver = VarietyResolver::new(policy);
    let matches = resolver.matches(&item, &all);

    if json {
        let output: Vec<VarietyOutput<'_>> = matches
            .iter()
            .map(|m| VarietyOutput {
                tier: tier_label(m.tier),
                item: m.item,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if matches.is_empty() {
        println!("{} has no varieties", item.name);
    } else {
        for m in &matches {
            println!("{:<12} {}", tier_label(m.tier), format_row(m.item));
        }
    }
    Ok(())
}

const fn tier_label(tier: VarietyTier) -> &'static str {
    match tier {
        VarietyTier::Volume => "volume",
        VarietyTier::DescriptionLink => "linked",
        VarietyTier::NameFallback => "name",
    }
}

fn format_row(item: &CatalogItem) -> String {
    let price = if item.is_discounted() {
        format!("{} (was {})", item.effective_price(), item.price)
    } else {
        item.price.to_string()
    };
    let stock = if item.in_stock() {
        String::new()
    } else {
        " [out of stock]".to_string()
    };

    format!(
        "{:<40} {:<36} {:<8} {price}{stock}",
        item.slug, item.name, item.category
    )
}

fn format_detail(item: &CatalogItem) -> String {
    let mut lines = vec![
        format!("{} ({})", item.name, item.slug),
        format!("Category: {}", item.category),
    ];

    if let Some(style) = &item.style {
        lines.push(format!("Style:    {}", style.as_str()));
    }
    lines.push(format!("Price:    {}", item.effective_price()));
    lines.push(format!("Stock:    {}", item.stock));
    if !item.country.is_empty() {
        let origin = item
            .region
            .as_ref()
            .map_or_else(|| item.country.clone(), |region| format!("{region}, {}", item.country));
        lines.push(format!("Origin:   {origin}"));
    }
    if !item.grapes.is_empty() {
        lines.push(format!("Grapes:   {}", item.grapes.join(", ")));
    }
    if !item.description.is_empty() {
        lines.push(String::new());
        lines.push(item.description.clone());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use dram_core::{Category, Style};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_format_row_marks_sale_and_stock() {
        let mut item = CatalogItem::new("jameson-700ml", "Jameson 700ml", Category::Spirits, Decimal::from(32));
        item.on_sale = true;
        item.sale_price = Some(Decimal::new(2750, 2));

        let row = format_row(&item);
        assert!(row.starts_with("jameson-700ml "));
        assert!(row.contains("27.50 (was 32)"));
        assert!(row.ends_with("[out of stock]"));
    }

    #[test]
    fn test_format_detail() {
        let mut item = CatalogItem::new("malbec", "Malbec Reserva", Category::Wine, Decimal::from(18));
        item.style = Some(Style::Wine("Red".to_string()));
        item.country = "Argentina".to_string();
        item.region = Some("Mendoza".to_string());
        item.grapes = vec!["Malbec".to_string()];

        let detail = format_detail(&item);
        assert!(detail.contains("Style:    Red"));
        assert!(detail.contains("Origin:   Mendoza, Argentina"));
        assert!(detail.contains("Grapes:   Malbec"));
    }

    #[test]
    fn test_variety_output_flattens_item() {
        let item = CatalogItem::new("jameson-1l", "Jameson 1L", Category::Spirits, Decimal::from(42));
        let output = VarietyOutput {
            tier: tier_label(VarietyTier::Volume),
            item: &item,
        };

        let json = serde_json::to_value(&output).ok();
        let json = json.as_ref();
        assert_eq!(json.and_then(|v| v.get("tier")), Some(&serde_json::json!("volume")));
        assert_eq!(json.and_then(|v| v.get("slug")), Some(&serde_json::json!("jameson-1l")));
    }
}
