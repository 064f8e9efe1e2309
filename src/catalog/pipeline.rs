//! Filter and sort pipeline for the product grid and the admin table.

use std::str::FromStr;

use serde::Deserialize;

use crate::domain::aggregates::Product;

/// Category selector value meaning "no category restriction".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    PriceLow,
    PriceHigh,
    #[default]
    Newest,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Newest => "newest",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "newest" => Ok(Self::Newest),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Listing parameters as they arrive from the grid controls.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub search: String,
    pub category: String,
    pub sort: String,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self { search: String::new(), category: ALL_CATEGORIES.to_string(), sort: SortKey::Newest.as_str().to_string() }
    }
}

impl ListingQuery {
    pub fn derive<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        derive(products, &self.search, &self.category, &self.sort)
    }
}

/// Filters `products` by free-text `query` (name or description,
/// case-insensitive) and exact `category`, then orders by `sort`.
///
/// Sorting is stable. An unrecognised sort key leaves the filtered products
/// in their input order.
pub fn derive<'a>(products: &'a [Product], query: &str, category: &str, sort: &str) -> Vec<&'a Product> {
    let needle = query.to_lowercase();
    let mut result: Vec<&Product> = products
        .iter()
        .filter(|p| matches_text(p, &needle) && (category == ALL_CATEGORIES || p.category == category))
        .collect();

    match sort.parse::<SortKey>() {
        Ok(SortKey::PriceLow) => result.sort_by(|a, b| a.price.cmp(&b.price)),
        Ok(SortKey::PriceHigh) => result.sort_by(|a, b| b.price.cmp(&a.price)),
        Ok(SortKey::Newest) => result.sort_by_key(|p| std::cmp::Reverse(p.created_at.ordering_key())),
        Err(_) => {}
    }
    result
}

fn matches_text(p: &Product, needle: &str) -> bool {
    needle.is_empty() || p.name.to_lowercase().contains(needle) || p.description.to_lowercase().contains(needle)
}

/// Admin table search: name or category contains `query`, case-insensitive.
/// Catalog order is kept.
pub fn admin_filter<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.to_lowercase();
    products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle) || p.category.to_lowercase().contains(&needle))
        .collect()
}
