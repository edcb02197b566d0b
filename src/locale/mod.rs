//! Language and text-direction handling.
//!
//! Every content row in the backing store is partitioned by a `locale`
//! column. English and Arabic content are distinct rows, so the resolved
//! request locale is threaded through every query rather than used to pick
//! a translation of a shared row.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};
use utoipa::ToSchema;

use crate::AppState;

/// Header clients may use to pin a locale without a query parameter.
pub const LOCALE_HEADER: &str = "x-locale";

/// Supported content locales.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

/// Text direction used by the layout for a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unsupported locale: {0}")]
pub struct UnsupportedLocale(pub String);

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Locale::En => Direction::Ltr,
            Locale::Ar => Direction::Rtl,
        }
    }

    /// The other supported locale. Used when mirroring content between languages.
    pub fn counterpart(&self) -> Locale {
        match self {
            Locale::En => Locale::Ar,
            Locale::Ar => Locale::En,
        }
    }

    pub fn all() -> Vec<Locale> {
        Locale::iter().collect()
    }

    /// Picks the first supported language tag from an `Accept-Language` value,
    /// honouring `q` weights.
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        let mut candidates: Vec<(f32, usize, Locale)> = header
            .split(',')
            .enumerate()
            .filter_map(|(position, part)| {
                let mut pieces = part.trim().split(';');
                let tag = pieces.next()?.trim();
                let weight = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                let locale = tag.parse::<Locale>().ok()?;
                (weight > 0.0).then_some((weight, position, locale))
            })
            .collect();

        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        candidates.first().map(|(_, _, locale)| *locale)
    }
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let primary = value
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Locale::En),
            "ar" => Ok(Locale::Ar),
            _ => Err(UnsupportedLocale(value.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locale resolved for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LocaleContext {
    pub locale: Locale,
    pub direction: Direction,
}

impl LocaleContext {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            direction: locale.direction(),
        }
    }

    /// Resolution order: `?lang=` → `x-locale` header → `Accept-Language` → default.
    pub fn resolve(parts: &Parts, default: Locale) -> Self {
        let from_query = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "lang" || key == "locale")
                .and_then(|(_, value)| value.parse::<Locale>().ok())
        });

        let from_header = || {
            parts
                .headers
                .get(LOCALE_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<Locale>().ok())
        };

        let from_accept = || {
            parts
                .headers
                .get(ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .and_then(Locale::from_accept_language)
        };

        let locale = from_query
            .or_else(from_header)
            .or_else(from_accept)
            .unwrap_or(default);
        Self::new(locale)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for LocaleContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(LocaleContext::resolve(parts, state.config.default_locale))
    }
}
