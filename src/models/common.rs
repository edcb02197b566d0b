use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::ValidationError;

lazy_static! {
    /// Lowercase letters (Latin or Arabic script), digits and single hyphens.
    static ref SLUG_RE: Regex =
        Regex::new(r"^[\p{Ll}\p{Lo}\p{Nd}]+(?:-[\p{Ll}\p{Lo}\p{Nd}]+)*$").unwrap();
    static ref HEX_COLOR_RE: Regex =
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap();
}

pub const MAX_SLUG_LENGTH: usize = 120;

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.chars().count() > MAX_SLUG_LENGTH || !SLUG_RE.is_match(slug) {
        let mut err = ValidationError::new("slug");
        err.message = Some("Slug may only contain lowercase letters, digits and single hyphens".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("hex_color"))
    }
}

/// Builds a slug from a title: lowercase, runs of anything that is not a
/// letter or digit collapse into one hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    slug.chars().take(MAX_SLUG_LENGTH).collect::<String>().trim_end_matches('-').to_string()
}

pub fn normalize_string(value: String) -> String {
    value.trim().to_string()
}

pub fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .and_then(|v| if v.is_empty() { None } else { Some(v) })
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in patch payloads. Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Falls back to `T::default()` when a stored column is `null` or holds a
/// value `T` does not accept. Use with `#[serde(default)]` on row types only;
/// input types stay strict.
pub fn default_on_invalid<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: DeserializeOwned + Default,
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}
