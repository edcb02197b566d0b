//! Public storefront reads. Every route resolves the request locale and
//! answers with content partitioned to that locale only.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::errors::{ApiError, ServiceError};
use crate::handlers::common::{localized_response, map_service_error, ApiQuery};
use crate::locale::LocaleContext;
use crate::models::{CategoryNode, Collection, MenuTree, ProductDetail};
use crate::services::catalog::DEFAULT_FEATURED_LIMIT;
use crate::services::product_filters::ProductFilters;
use crate::services::RenderedPage;
use crate::AppState;

/// Slug of the CMS page rendered on the home route.
pub const HOME_PAGE_SLUG: &str = "home";

pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/pages/:slug", get(get_page))
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
        .route("/categories", get(category_tree))
        .route("/categories/:slug", get(get_category))
        .route("/collections", get(list_collections))
        .route("/collections/:slug", get(get_collection))
        .route("/menus/:location", get(get_menu))
        .route("/ad-zones/:name", get(get_ad_zone))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeResponse {
    /// Rendered `home` page, absent when none is published
    pub page: Option<RenderedPage>,
    pub featured_products: Vec<ProductDetail>,
    pub categories: Vec<CategoryNode>,
    pub collections: Vec<Collection>,
}

/// Home page: the published `home` CMS page plus catalog highlights
#[utoipa::path(
    get,
    path = "/api/v1/storefront/home",
    params(("lang" = Option<String>, Query, description = "Locale override (en, ar)")),
    responses(
        (status = 200, description = "Home content", body = crate::ApiResponse<HomeResponse>),
        (status = 502, description = "Backend failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn home(
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let services = &state.services;
    let page = match services.renderer.render_page(ctx.locale, HOME_PAGE_SLUG).await {
        Ok(page) => Some(page),
        Err(ServiceError::NotFound(_)) => None,
        Err(err) => return Err(map_service_error(err)),
    };
    let (featured_products, categories, collections) = futures::try_join!(
        services
            .catalog
            .featured_products(ctx.locale, DEFAULT_FEATURED_LIMIT),
        services.categories.tree(ctx.locale),
        services.collections.list(ctx.locale, true),
    )
    .map_err(map_service_error)?;

    Ok(localized_response(
        ctx,
        HomeResponse {
            page,
            featured_products,
            categories,
            collections,
        },
    ))
}

/// Render a published CMS page
#[utoipa::path(
    get,
    path = "/api/v1/storefront/pages/{slug}",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Rendered page", body = crate::ApiResponse<RenderedPage>),
        (status = 404, description = "Page missing or not published", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_page(
    State(state): State<AppState>,
    ctx: LocaleContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .renderer
        .render_page(ctx.locale, &slug)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, page))
}

/// Active products, filtered and sorted in memory
#[utoipa::path(
    get,
    path = "/api/v1/storefront/products",
    params(ProductFilters),
    responses(
        (status = 200, description = "Products", body = crate::ApiResponse<Vec<ProductDetail>>),
        (status = 400, description = "Invalid filter value", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn list_products(
    State(state): State<AppState>,
    ctx: LocaleContext,
    ApiQuery(filters): ApiQuery<ProductFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .search_products(ctx.locale, &filters)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, products))
}

/// Product detail with images and category links
#[utoipa::path(
    get,
    path = "/api/v1/storefront/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product", body = crate::ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_product(
    State(state): State<AppState>,
    ctx: LocaleContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product_by_slug(ctx.locale, &slug)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, product))
}

/// Category tree for navigation
#[utoipa::path(
    get,
    path = "/api/v1/storefront/categories",
    responses(
        (status = 200, description = "Category tree", body = crate::ApiResponse<Vec<CategoryNode>>)
    ),
    tag = "Storefront"
)]
pub async fn category_tree(
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state
        .services
        .categories
        .tree(ctx.locale)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, tree))
}

/// Category with its subtree and the products below it
#[utoipa::path(
    get,
    path = "/api/v1/storefront/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category", body = crate::ApiResponse<crate::models::CategoryWithProducts>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_category(
    State(state): State<AppState>,
    ctx: LocaleContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_by_slug(ctx.locale, &slug)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, category))
}

/// Active collections
#[utoipa::path(
    get,
    path = "/api/v1/storefront/collections",
    responses(
        (status = 200, description = "Collections", body = crate::ApiResponse<Vec<Collection>>)
    ),
    tag = "Storefront"
)]
pub async fn list_collections(
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let collections = state
        .services
        .collections
        .list(ctx.locale, true)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, collections))
}

/// Collection with its products in display order
#[utoipa::path(
    get,
    path = "/api/v1/storefront/collections/{slug}",
    params(("slug" = String, Path, description = "Collection slug")),
    responses(
        (status = 200, description = "Collection", body = crate::ApiResponse<crate::models::CollectionDetail>),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    ctx: LocaleContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .services
        .collections
        .get_by_slug(ctx.locale, &slug)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, collection))
}

/// Menu tree for a site location (`header`, `footer`, ...).
/// `data` is null when no menu is assigned to the location.
#[utoipa::path(
    get,
    path = "/api/v1/storefront/menus/{location}",
    params(("location" = String, Path, description = "Menu location")),
    responses(
        (status = 200, description = "Menu tree or null", body = crate::ApiResponse<MenuTree>)
    ),
    tag = "Storefront"
)]
pub async fn get_menu(
    State(state): State<AppState>,
    ctx: LocaleContext,
    Path(location): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state
        .services
        .menus
        .menu_tree(ctx.locale, &location)
        .await
        .map_err(map_service_error)?;
    if tree.is_none() {
        warn!(locale = %ctx.locale, location = %location, "no menu for location");
    }
    Ok(localized_response(ctx, tree))
}

/// Ad zone with the ad currently scheduled into it
#[utoipa::path(
    get,
    path = "/api/v1/storefront/ad-zones/{name}",
    params(("name" = String, Path, description = "Zone name")),
    responses(
        (status = 200, description = "Zone and active ad", body = crate::ApiResponse<crate::models::ZoneWithAd>),
        (status = 404, description = "Zone not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_ad_zone(
    State(state): State<AppState>,
    ctx: LocaleContext,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let zone = state
        .services
        .ads
        .zone_with_ad(ctx.locale, &name, Utc::now())
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, zone))
}
