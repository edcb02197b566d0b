//! Pages, sections and blocks: the three-level content tree.
//!
//! A page owns ordered sections, a section owns ordered blocks. Each level
//! carries its own `locale`; the English and Arabic versions of a page are
//! separate trees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{default_on_invalid, validate_hex_color, validate_not_blank, validate_slug};
use crate::locale::Locale;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CmsPage {
    pub id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CmsPage {
    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SectionLayout {
    Full,
    #[default]
    Contained,
    Split,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CmsSection {
    pub id: Uuid,
    pub page_id: Uuid,
    pub locale: Locale,
    #[serde(default, deserialize_with = "default_on_invalid")]
    pub position: i32,
    /// Unknown or missing layouts read as the default.
    #[serde(default, deserialize_with = "default_on_invalid")]
    pub layout: SectionLayout,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
}

/// One stored block. `block_type` is free text; unknown values are kept and
/// rendered as a placeholder. A `null` type reads as the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CmsBlock {
    pub id: Uuid,
    pub section_id: Uuid,
    pub locale: Locale,
    #[serde(default, deserialize_with = "default_on_invalid")]
    pub position: i32,
    #[serde(rename = "type", default, deserialize_with = "default_on_invalid")]
    pub block_type: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "locale": "en",
    "title": "Summer Sale",
    "slug": "summer-sale",
    "meta_title": "Summer Sale | Store"
}))]
pub struct CreatePageInput {
    #[serde(default)]
    pub locale: Option<Locale>,
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,
    #[serde(default)]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<PageStatus>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub meta_title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePageInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub meta_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateSectionInput {
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub layout: Option<SectionLayout>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub width: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_hex_color")]
    pub background_color: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSectionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<SectionLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32))]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_hex_color")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "type": "promo_banner",
    "data": {"title": "Up to 50% off", "link_url": "/collections/summer"}
}))]
pub struct CreateBlockInput {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub block_type: String,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBlockInput {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub block_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// New display order; positions are assigned from the index in `ids`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReorderInput {
    #[validate(length(min = 1, max = 500))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DuplicatePageInput {
    pub target_locale: Locale,
    /// Slug for the copy; defaults to the source slug
    #[serde(default)]
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
}
