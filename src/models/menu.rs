use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{double_option, validate_not_blank};
use crate::locale::Locale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CmsMenu {
    pub id: Uuid,
    pub locale: Locale,
    pub name: String,
    /// Placement key such as `header` or `footer`
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CmsMenuItem {
    pub id: Uuid,
    pub menu_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub locale: Locale,
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub open_in_new_tab: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MenuNode {
    #[serde(flatten)]
    pub item: CmsMenuItem,
    #[schema(no_recursion)]
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MenuTree {
    pub menu: CmsMenu,
    pub items: Vec<MenuNode>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"locale": "en", "name": "Main navigation", "location": "header"}))]
pub struct CreateMenuInput {
    #[serde(default)]
    pub locale: Option<Locale>,
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemInput {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub label: String,
    /// Absolute URL or site path
    #[validate(length(min = 1, max = 2048), custom = "validate_not_blank")]
    pub url: String,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub open_in_new_tab: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemInput {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default)]
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub label: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 2048), custom = "validate_not_blank")]
    pub url: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub open_in_new_tab: Option<bool>,
}
