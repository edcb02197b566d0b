use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{double_option, validate_not_blank};
use crate::locale::Locale;

/// A named placement on the storefront that shows at most one ad at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdZone {
    pub id: Uuid,
    pub locale: Locale,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ad {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ZoneWithAd {
    pub zone: AdZone,
    pub ad: Option<Ad>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"locale": "en", "name": "home-sidebar", "width": 300, "height": 600}))]
pub struct CreateAdZoneInput {
    #[serde(default)]
    pub locale: Option<Locale>,
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000))]
    pub width: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000))]
    pub height: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAdZoneInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 10000))]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 10000))]
    pub height: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "title": "Ramadan offers",
    "image_url": "https://cdn.example.com/ads/ramadan.jpg",
    "link_url": "https://shop.example.com/ar/collections/ramadan",
    "is_active": true,
    "start_date": "2025-03-01T00:00:00Z",
    "end_date": "2025-03-30T23:59:59Z",
    "priority": 10
}))]
pub struct CreateAdInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,
    #[validate(url)]
    pub image_url: String,
    #[serde(default)]
    #[validate(url)]
    pub link_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

/// `start_date`/`end_date` set to `null` open the window on that side.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAdInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub priority: Option<i32>,
}
