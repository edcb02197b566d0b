//! In-memory product filtering for the storefront listing and the admin
//! product table.
//!
//! Products are fetched per locale and narrowed here; nothing is pushed
//! down to the table API.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::ProductDetail;

/// Quantities above this are "in stock"; 1 up to this value is "low".
pub const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockLevel {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockLevel {
    pub fn of(quantity: i32) -> Self {
        if quantity > LOW_STOCK_THRESHOLD {
            StockLevel::InStock
        } else if quantity >= 1 {
            StockLevel::LowStock
        } else {
            StockLevel::OutOfStock
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockFilter {
    #[default]
    All,
    InStock,
    LowStock,
    OutOfStock,
}

impl StockFilter {
    pub fn accepts(&self, quantity: i32) -> bool {
        match self {
            StockFilter::All => true,
            StockFilter::InStock => StockLevel::of(quantity) == StockLevel::InStock,
            StockFilter::LowStock => StockLevel::of(quantity) == StockLevel::LowStock,
            StockFilter::OutOfStock => StockLevel::of(quantity) == StockLevel::OutOfStock,
        }
    }
}

/// Fixed price bands. Every price falls in exactly one band.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
pub enum PriceRange {
    #[default]
    #[serde(rename = "all")]
    #[strum(serialize = "all")]
    All,
    #[serde(rename = "under_25")]
    #[strum(serialize = "under_25")]
    Under25,
    #[serde(rename = "25_to_50")]
    #[strum(serialize = "25_to_50")]
    From25To50,
    #[serde(rename = "50_to_100")]
    #[strum(serialize = "50_to_100")]
    From50To100,
    #[serde(rename = "over_100")]
    #[strum(serialize = "over_100")]
    Over100,
}

impl PriceRange {
    pub fn bands() -> [PriceRange; 4] {
        [
            PriceRange::Under25,
            PriceRange::From25To50,
            PriceRange::From50To100,
            PriceRange::Over100,
        ]
    }

    pub fn contains(&self, price: Decimal) -> bool {
        match self {
            PriceRange::All => true,
            PriceRange::Under25 => price < dec!(25),
            PriceRange::From25To50 => price >= dec!(25) && price <= dec!(50),
            PriceRange::From50To100 => price > dec!(50) && price <= dec!(100),
            PriceRange::Over100 => price > dec!(100),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    TitleAsc,
}

/// Query parameters accepted by product listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProductFilters {
    /// Case-insensitive match on title, description or SKU
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub stock: StockFilter,
    #[serde(default)]
    pub price: PriceRange,
    #[serde(default)]
    pub sort: Option<ProductSort>,
}

impl ProductFilters {
    pub fn matches(&self, item: &ProductDetail) -> bool {
        let product = &item.product;
        matches_search(item, self.search.as_deref())
            && self
                .category_id
                .map_or(true, |id| item.category_ids.contains(&id))
            && self.stock.accepts(product.stock_quantity)
            && self.price.contains(product.price)
    }
}

fn matches_search(item: &ProductDetail, search: Option<&str>) -> bool {
    let needle = match search.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return true,
    };
    let product = &item.product;
    let haystacks = [
        Some(product.title.as_str()),
        product.description.as_deref(),
        product.sku.as_deref(),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(&needle))
}

/// Returns the products that satisfy every filter, in their original order.
pub fn apply_product_filters(items: &[ProductDetail], filters: &ProductFilters) -> Vec<ProductDetail> {
    items.iter().filter(|item| filters.matches(item)).cloned().collect()
}

/// Stable sort; products without a creation time sort last for `Newest`.
pub fn sort_products(items: &mut [ProductDetail], sort: ProductSort) {
    match sort {
        ProductSort::Newest => items.sort_by(|a, b| match (a.product.created_at, b.product.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
        ProductSort::PriceAsc => items.sort_by(|a, b| a.product.price.cmp(&b.product.price)),
        ProductSort::PriceDesc => items.sort_by(|a, b| b.product.price.cmp(&a.product.price)),
        ProductSort::TitleAsc => items.sort_by_key(|p| p.product.title.to_lowercase()),
    }
}
