use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, localized_created_response, localized_response, map_service_error,
    no_content_response, success_response, validate_input,
};
use crate::locale::LocaleContext;
use crate::models::{Ad, AdZone, CreateAdInput, CreateAdZoneInput, UpdateAdInput, UpdateAdZoneInput};
use crate::AppState;

pub fn cms_ad_routes() -> Router<AppState> {
    Router::new()
        .route("/ad-zones", get(list_zones).post(create_zone))
        .route(
            "/ad-zones/:id",
            get(get_zone).put(update_zone).delete(delete_zone),
        )
        .route("/ad-zones/:id/ads", get(list_ads).post(create_ad))
        .route("/ads/:id", get(get_ad).put(update_ad).delete(delete_ad))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/ad-zones",
    responses(
        (status = 200, description = "Ad zones", body = crate::ApiResponse<Vec<AdZone>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn list_zones(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let zones = state
        .services
        .ads
        .list_zones(ctx.locale)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, zones))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/ad-zones",
    request_body = CreateAdZoneInput,
    responses(
        (status = 201, description = "Zone created", body = crate::ApiResponse<AdZone>),
        (status = 409, description = "Zone name already used in this locale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn create_zone(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    Json(payload): Json<CreateAdZoneInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let zone = state
        .services
        .ads
        .create_zone(ctx.locale, payload)
        .await
        .map_err(map_service_error)?;
    Ok(localized_created_response(ctx, zone))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/ad-zones/{id}",
    params(("id" = Uuid, Path, description = "Zone ID")),
    responses(
        (status = 200, description = "Zone", body = crate::ApiResponse<AdZone>),
        (status = 404, description = "Zone not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn get_zone(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let zone = state.services.ads.get_zone(id).await.map_err(map_service_error)?;
    Ok(success_response(zone))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/ad-zones/{id}",
    params(("id" = Uuid, Path, description = "Zone ID")),
    request_body = UpdateAdZoneInput,
    responses(
        (status = 200, description = "Zone updated", body = crate::ApiResponse<AdZone>),
        (status = 404, description = "Zone not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn update_zone(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdZoneInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let zone = state
        .services
        .ads
        .update_zone(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(zone))
}

/// Delete a zone and every ad scheduled into it
#[utoipa::path(
    delete,
    path = "/api/v1/cms/ad-zones/{id}",
    params(("id" = Uuid, Path, description = "Zone ID")),
    responses(
        (status = 204, description = "Zone deleted"),
        (status = 404, description = "Zone not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn delete_zone(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.ads.delete_zone(id).await.map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/ad-zones/{id}/ads",
    params(("id" = Uuid, Path, description = "Zone ID")),
    responses(
        (status = 200, description = "Ads in the zone", body = crate::ApiResponse<Vec<Ad>>)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn list_ads(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(zone_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ads = state
        .services
        .ads
        .list_ads(zone_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ads))
}

/// Schedule an ad into a zone
#[utoipa::path(
    post,
    path = "/api/v1/cms/ad-zones/{id}/ads",
    params(("id" = Uuid, Path, description = "Zone ID")),
    request_body = CreateAdInput,
    responses(
        (status = 201, description = "Ad created", body = crate::ApiResponse<Ad>),
        (status = 400, description = "Invalid payload or date window", body = crate::errors::ErrorResponse),
        (status = 404, description = "Zone not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn create_ad(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(zone_id): Path<Uuid>,
    Json(payload): Json<CreateAdInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let ad = state
        .services
        .ads
        .create_ad(zone_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(ad))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/ads/{id}",
    params(("id" = Uuid, Path, description = "Ad ID")),
    responses(
        (status = 200, description = "Ad", body = crate::ApiResponse<Ad>),
        (status = 404, description = "Ad not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn get_ad(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ad = state.services.ads.get_ad(id).await.map_err(map_service_error)?;
    Ok(success_response(ad))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/ads/{id}",
    params(("id" = Uuid, Path, description = "Ad ID")),
    request_body = UpdateAdInput,
    responses(
        (status = 200, description = "Ad updated", body = crate::ApiResponse<Ad>),
        (status = 400, description = "Invalid payload or date window", body = crate::errors::ErrorResponse),
        (status = 404, description = "Ad not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn update_ad(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let ad = state
        .services
        .ads
        .update_ad(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ad))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/ads/{id}",
    params(("id" = Uuid, Path, description = "Ad ID")),
    responses(
        (status = 204, description = "Ad deleted"),
        (status = 404, description = "Ad not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Ads"
)]
pub async fn delete_ad(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.ads.delete_ad(id).await.map_err(map_service_error)?;
    Ok(no_content_response())
}
