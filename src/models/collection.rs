use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{validate_not_blank, validate_slug};
use super::product::ProductDetail;
use crate::locale::Locale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Collection {
    pub id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Row of the `collection_products` join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CollectionProduct {
    pub collection_id: Uuid,
    pub product_id: Uuid,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub products: Vec<ProductDetail>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCollectionInput {
    #[serde(default)]
    pub locale: Option<Locale>,
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,
    #[serde(default)]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCollectionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Replaces the collection's product list; order of ids is the display order.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetCollectionProductsInput {
    #[validate(length(max = 500))]
    pub product_ids: Vec<Uuid>,
}
