use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{double_option, validate_not_blank, validate_slug};
use crate::locale::Locale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub locale: Locale,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A category with its nested children, ordered by position then name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::size).sum::<usize>()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "locale": "ar",
    "name": "أحذية",
    "slug": "أحذية",
    "parent_id": null,
    "position": 1
}))]
pub struct CreateCategoryInput {
    #[serde(default)]
    pub locale: Option<Locale>,
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    #[validate(url)]
    pub image_url: Option<String>,
}

/// `parent_id: null` moves the category to the root; omitting it keeps the
/// current parent.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Storefront category page: the category, its subtree and every product
/// in it or below it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryWithProducts {
    pub category: Category,
    pub children: Vec<CategoryNode>,
    pub products: Vec<super::product::ProductDetail>,
}
