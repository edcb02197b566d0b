use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
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
use crate::models::{
    CmsMenu, CmsMenuItem, CreateMenuInput, CreateMenuItemInput, ReorderInput, UpdateMenuInput,
    UpdateMenuItemInput,
};
use crate::AppState;

pub fn cms_menu_routes() -> Router<AppState> {
    Router::new()
        .route("/menus", get(list_menus).post(create_menu))
        .route("/menus/:id", get(get_menu).put(update_menu).delete(delete_menu))
        .route("/menus/:id/items", get(list_items).post(create_item))
        .route("/menus/:id/items/reorder", put(reorder_items))
        .route(
            "/menu-items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/menus",
    responses(
        (status = 200, description = "Menus", body = crate::ApiResponse<Vec<CmsMenu>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn list_menus(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let menus = state
        .services
        .menus
        .list_menus(ctx.locale)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, menus))
}

/// Create a menu; each locale has at most one menu per location
#[utoipa::path(
    post,
    path = "/api/v1/cms/menus",
    request_body = CreateMenuInput,
    responses(
        (status = 201, description = "Menu created", body = crate::ApiResponse<CmsMenu>),
        (status = 409, description = "Location already has a menu", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn create_menu(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    Json(payload): Json<CreateMenuInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let menu = state
        .services
        .menus
        .create_menu(ctx.locale, payload)
        .await
        .map_err(map_service_error)?;
    Ok(localized_created_response(ctx, menu))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Menu", body = crate::ApiResponse<CmsMenu>),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn get_menu(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let menu = state.services.menus.get_menu(id).await.map_err(map_service_error)?;
    Ok(success_response(menu))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu ID")),
    request_body = UpdateMenuInput,
    responses(
        (status = 200, description = "Menu updated", body = crate::ApiResponse<CmsMenu>),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Location already has a menu", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn update_menu(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let menu = state
        .services
        .menus
        .update_menu(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(menu))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu ID")),
    responses(
        (status = 204, description = "Menu and its items deleted"),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn delete_menu(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.menus.delete_menu(id).await.map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Flat item list ordered by position
#[utoipa::path(
    get,
    path = "/api/v1/cms/menus/{id}/items",
    params(("id" = Uuid, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Items", body = crate::ApiResponse<Vec<CmsMenuItem>>)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn list_items(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .menus
        .list_items(menu_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/menus/{id}/items",
    params(("id" = Uuid, Path, description = "Menu ID")),
    request_body = CreateMenuItemInput,
    responses(
        (status = 201, description = "Item created", body = crate::ApiResponse<CmsMenuItem>),
        (status = 400, description = "Parent is not part of the menu", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn create_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
    Json(payload): Json<CreateMenuItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .menus
        .create_item(menu_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/menus/{id}/items/reorder",
    params(("id" = Uuid, Path, description = "Menu ID")),
    request_body = ReorderInput,
    responses(
        (status = 200, description = "Items reordered", body = crate::ApiResponse<Vec<CmsMenuItem>>),
        (status = 400, description = "Id list does not match the menu", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn reorder_items(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
    Json(payload): Json<ReorderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let items = state
        .services
        .menus
        .reorder_items(menu_id, &payload.ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/menu-items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Item", body = crate::ApiResponse<CmsMenuItem>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn get_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.services.menus.get_item(id).await.map_err(map_service_error)?;
    Ok(success_response(item))
}

/// Update an item. `parent_id: null` moves it to the top level.
#[utoipa::path(
    put,
    path = "/api/v1/cms/menu-items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemInput,
    responses(
        (status = 200, description = "Item updated", body = crate::ApiResponse<CmsMenuItem>),
        (status = 400, description = "Invalid parent", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn update_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .menus
        .update_item(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/menu-items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 204, description = "Item deleted; children move up"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Menus"
)]
pub async fn delete_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.menus.delete_item(id).await.map_err(map_service_error)?;
    Ok(no_content_response())
}
