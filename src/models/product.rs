use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{validate_non_negative, validate_not_blank, validate_slug};
use crate::locale::Locale;

/// A sellable item. English and Arabic listings are separate rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "59.99")]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Row of the `product_categories` join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductCategoryLink {
    pub product_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// Product joined with its category ids and ordered images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category_ids: Vec<Uuid>,
    pub images: Vec<ProductImage>,
}

impl ProductDetail {
    pub fn bare(product: Product) -> Self {
        Self {
            product,
            category_ids: Vec::new(),
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductImageInput {
    #[validate(url)]
    #[schema(example = "https://cdn.example.com/products/linen-shirt-1.jpg")]
    pub url: String,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub alt: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "locale": "en",
    "title": "Linen Shirt",
    "slug": "linen-shirt",
    "sku": "LS-001",
    "price": "49.99",
    "stock_quantity": 12,
    "is_featured": true,
    "category_ids": [],
    "images": [{"url": "https://cdn.example.com/products/linen-shirt-1.jpg", "alt": "Front"}]
}))]
pub struct CreateProductInput {
    #[serde(default)]
    pub locale: Option<Locale>,
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,
    /// Derived from the title when omitted
    #[serde(default)]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[serde(default)]
    pub images: Vec<ProductImageInput>,
}

/// Patch for a product. `category_ids` and `images`, when present, replace
/// the existing links wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub category_ids: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing)]
    pub images: Option<Vec<ProductImageInput>>,
}
