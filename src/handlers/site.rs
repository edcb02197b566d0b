use axum::{extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::handlers::common::localized_response;
use crate::locale::{Direction, Locale, LocaleContext};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SupportedLocale {
    pub code: Locale,
    pub direction: Direction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HeroTiming {
    pub autoplay_interval_ms: u64,
    pub pause_after_interaction_ms: u64,
}

/// Site-wide settings a client needs before rendering any page.
#[derive(Debug, Serialize, ToSchema)]
pub struct SiteInfo {
    pub locale: Locale,
    pub direction: Direction,
    pub default_locale: Locale,
    pub supported_locales: Vec<SupportedLocale>,
    pub hero: HeroTiming,
}

/// Resolved locale, direction and storefront settings
#[utoipa::path(
    get,
    path = "/api/v1/site",
    params(("lang" = Option<String>, Query, description = "Locale override (en, ar)")),
    responses(
        (status = 200, description = "Site settings", body = crate::ApiResponse<SiteInfo>)
    ),
    tag = "Storefront"
)]
pub async fn site_info(State(state): State<AppState>, ctx: LocaleContext) -> impl IntoResponse {
    let config = &state.config;
    let info = SiteInfo {
        locale: ctx.locale,
        direction: ctx.direction,
        default_locale: config.default_locale,
        supported_locales: Locale::all()
            .into_iter()
            .map(|code| SupportedLocale {
                code,
                direction: code.direction(),
            })
            .collect(),
        hero: HeroTiming {
            autoplay_interval_ms: config.hero_autoplay_interval_ms,
            pause_after_interaction_ms: config.hero_pause_after_interaction_ms,
        },
    };
    localized_response(ctx, info)
}
