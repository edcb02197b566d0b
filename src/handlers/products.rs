use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    localized_created_response, localized_response, map_service_error, no_content_response,
    success_response, validate_input, ApiQuery,
};
use crate::locale::LocaleContext;
use crate::models::{CreateProductInput, ProductDetail, UpdateProductInput};
use crate::services::product_filters::ProductFilters;
use crate::AppState;

pub fn cms_product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// All products in the locale, including inactive ones
#[utoipa::path(
    get,
    path = "/api/v1/cms/products",
    params(ProductFilters),
    responses(
        (status = 200, description = "Products", body = crate::ApiResponse<Vec<ProductDetail>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Products"
)]
pub async fn list_products(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    ApiQuery(filters): ApiQuery<ProductFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .search_all_products(ctx.locale, &filters)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, products))
}

/// Create a product with its category links and images
#[utoipa::path(
    post,
    path = "/api/v1/cms/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductDetail>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already used in this locale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Products"
)]
pub async fn create_product(
    admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .create_product(ctx.locale, payload)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %product.product.id, admin = ?admin.id(), "product created");
    Ok(localized_created_response(ctx, product))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = crate::ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Products"
)]
pub async fn get_product(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

/// Update a product. `category_ids` and `images`, when present, replace
/// the existing links and images.
#[utoipa::path(
    put,
    path = "/api/v1/cms/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<ProductDetail>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Products"
)]
pub async fn update_product(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Products"
)]
pub async fn delete_product(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
