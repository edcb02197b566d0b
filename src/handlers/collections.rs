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
    localized_created_response, localized_response, map_service_error, no_content_response,
    success_response, validate_input,
};
use crate::locale::LocaleContext;
use crate::models::{
    Collection, CreateCollectionInput, ProductDetail, SetCollectionProductsInput,
    UpdateCollectionInput,
};
use crate::ApiResponse;
use crate::AppState;

pub fn cms_collection_routes() -> Router<AppState> {
    Router::new()
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/:id",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
        .route(
            "/collections/:id/products",
            get(collection_products).put(set_collection_products),
        )
}

/// Every collection in the locale, active or not
#[utoipa::path(
    get,
    path = "/api/v1/cms/collections",
    responses(
        (status = 200, description = "Collections", body = crate::ApiResponse<Vec<Collection>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn list_collections(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let collections = state
        .services
        .collections
        .list(ctx.locale, false)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, collections))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/collections",
    request_body = CreateCollectionInput,
    responses(
        (status = 201, description = "Collection created", body = crate::ApiResponse<Collection>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already used in this locale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn create_collection(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    Json(payload): Json<CreateCollectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let collection = state
        .services
        .collections
        .create(ctx.locale, payload)
        .await
        .map_err(map_service_error)?;
    Ok(localized_created_response(ctx, collection))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection", body = crate::ApiResponse<Collection>),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn get_collection(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .services
        .collections
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(collection))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = UpdateCollectionInput,
    responses(
        (status = 200, description = "Collection updated", body = crate::ApiResponse<Collection>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn update_collection(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCollectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let collection = state
        .services
        .collections
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(collection))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn delete_collection(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .collections
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Products in the collection, in display order
#[utoipa::path(
    get,
    path = "/api/v1/cms/collections/{id}/products",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Products", body = crate::ApiResponse<Vec<ProductDetail>>),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn collection_products(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let collections = &state.services.collections;
    let collection = collections.get(id).await.map_err(map_service_error)?;
    let products = collections.products(&collection).await.map_err(map_service_error)?;
    Ok(success_response(products))
}

/// Replace the collection's product list; returns the stored id order
#[utoipa::path(
    put,
    path = "/api/v1/cms/collections/{id}/products",
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = SetCollectionProductsInput,
    responses(
        (status = 200, description = "Membership replaced", body = crate::ApiResponse<Vec<Uuid>>),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Collections"
)]
pub async fn set_collection_products(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetCollectionProductsInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let ids = state
        .services
        .collections
        .set_products(id, &payload.product_ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ids))
}
