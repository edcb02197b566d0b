//! Admin page builder: pages, their sections and the blocks inside them.

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, localized_created_response, localized_response, map_service_error,
    no_content_response, success_response, validate_input,
};
use crate::locale::LocaleContext;
use crate::models::{
    CmsBlock, CmsPage, CmsSection, CreateBlockInput, CreatePageInput, CreateSectionInput,
    DuplicatePageInput, ReorderInput, UpdateBlockInput, UpdatePageInput, UpdateSectionInput,
};
use crate::services::RenderedPage;
use crate::AppState;

pub fn cms_page_routes() -> Router<AppState> {
    Router::new()
        .route("/pages", get(list_pages).post(create_page))
        .route("/pages/:id", get(get_page).put(update_page).delete(delete_page))
        .route("/pages/:id/publish", post(publish_page))
        .route("/pages/:id/unpublish", post(unpublish_page))
        .route("/pages/:id/preview", get(preview_page))
        .route("/pages/:id/duplicate", post(duplicate_page))
        .route("/pages/:id/sections", get(list_sections).post(create_section))
        .route("/pages/:id/sections/reorder", put(reorder_sections))
        .route(
            "/sections/:id",
            get(get_section).put(update_section).delete(delete_section),
        )
        .route("/sections/:id/blocks", get(list_blocks).post(create_block))
        .route("/sections/:id/blocks/reorder", put(reorder_blocks))
        .route("/blocks/:id", get(get_block).put(update_block).delete(delete_block))
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/cms/pages",
    responses(
        (status = 200, description = "Pages in the locale, drafts included", body = crate::ApiResponse<Vec<CmsPage>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn list_pages(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let pages = state
        .services
        .pages
        .list(ctx.locale)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, pages))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/pages",
    request_body = CreatePageInput,
    responses(
        (status = 201, description = "Page created as draft", body = crate::ApiResponse<CmsPage>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already used in this locale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn create_page(
    admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    Json(payload): Json<CreatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let page = state
        .services
        .pages
        .create(ctx.locale, payload)
        .await
        .map_err(map_service_error)?;
    info!(page_id = %page.id, admin = ?admin.id(), "page created");
    Ok(localized_created_response(ctx, page))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page", body = crate::ApiResponse<CmsPage>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn get_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.pages.get(id).await.map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = UpdatePageInput,
    responses(
        (status = 200, description = "Page updated", body = crate::ApiResponse<CmsPage>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn update_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let page = state
        .services
        .pages
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Delete a page with all of its sections and blocks
#[utoipa::path(
    delete,
    path = "/api/v1/cms/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 204, description = "Page deleted"),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn delete_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.pages.delete(id).await.map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/pages/{id}/publish",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page published", body = crate::ApiResponse<CmsPage>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn publish_page(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.pages.publish(id).await.map_err(map_service_error)?;
    info!(page_id = %id, admin = ?admin.id(), "page published");
    Ok(success_response(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/pages/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page moved back to draft", body = crate::ApiResponse<CmsPage>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn unpublish_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .pages
        .unpublish(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Render a page as the storefront would, drafts included
#[utoipa::path(
    get,
    path = "/api/v1/cms/pages/{id}/preview",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Rendered page", body = crate::ApiResponse<RenderedPage>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn preview_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rendered = state
        .services
        .renderer
        .preview_page(id)
        .await
        .map_err(map_service_error)?;
    let ctx = LocaleContext::new(rendered.locale);
    Ok(localized_response(ctx, rendered))
}

/// Copy a page with its sections and blocks into another locale
#[utoipa::path(
    post,
    path = "/api/v1/cms/pages/{id}/duplicate",
    params(("id" = Uuid, Path, description = "Source page ID")),
    request_body = DuplicatePageInput,
    responses(
        (status = 201, description = "Draft copy created", body = crate::ApiResponse<CmsPage>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already used in the target locale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn duplicate_page(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DuplicatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let target = payload.target_locale;
    let copy = state
        .services
        .pages
        .duplicate_page_to_locale(id, target, payload.slug)
        .await
        .map_err(map_service_error)?;
    info!(source = %id, copy = %copy.id, locale = %target, admin = ?admin.id(), "page duplicated");
    Ok(localized_created_response(LocaleContext::new(target), copy))
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/cms/pages/{id}/sections",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Sections by position", body = crate::ApiResponse<Vec<CmsSection>>)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn list_sections(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sections = state
        .services
        .pages
        .list_sections(page_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sections))
}

/// Append a section; `position` defaults to the end of the page
#[utoipa::path(
    post,
    path = "/api/v1/cms/pages/{id}/sections",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = CreateSectionInput,
    responses(
        (status = 201, description = "Section created", body = crate::ApiResponse<CmsSection>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn create_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
    Json(payload): Json<CreateSectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let section = state
        .services
        .pages
        .create_section(page_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(section))
}

/// Set section order; `ids` must list exactly the page's sections
#[utoipa::path(
    put,
    path = "/api/v1/cms/pages/{id}/sections/reorder",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = ReorderInput,
    responses(
        (status = 200, description = "Sections reordered", body = crate::ApiResponse<Vec<CmsSection>>),
        (status = 400, description = "Id list does not match the page", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn reorder_sections(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
    Json(payload): Json<ReorderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let sections = state
        .services
        .pages
        .reorder_sections(page_id, &payload.ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sections))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section", body = crate::ApiResponse<CmsSection>),
        (status = 404, description = "Section not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn get_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let section = state
        .services
        .pages
        .get_section(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(section))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = UpdateSectionInput,
    responses(
        (status = 200, description = "Section updated", body = crate::ApiResponse<CmsSection>),
        (status = 404, description = "Section not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn update_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let section = state
        .services
        .pages
        .update_section(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(section))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section and its blocks deleted"),
        (status = 404, description = "Section not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn delete_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .pages
        .delete_section(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/cms/sections/{id}/blocks",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Blocks by position", body = crate::ApiResponse<Vec<CmsBlock>>)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn list_blocks(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let blocks = state
        .services
        .pages
        .list_blocks(section_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(blocks))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/sections/{id}/blocks",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = CreateBlockInput,
    responses(
        (status = 201, description = "Block created", body = crate::ApiResponse<CmsBlock>),
        (status = 404, description = "Section not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn create_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
    Json(payload): Json<CreateBlockInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let block = state
        .services
        .pages
        .create_block(section_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(block))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/sections/{id}/blocks/reorder",
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = ReorderInput,
    responses(
        (status = 200, description = "Blocks reordered", body = crate::ApiResponse<Vec<CmsBlock>>),
        (status = 400, description = "Id list does not match the section", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn reorder_blocks(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
    Json(payload): Json<ReorderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let blocks = state
        .services
        .pages
        .reorder_blocks(section_id, &payload.ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(blocks))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/blocks/{id}",
    params(("id" = Uuid, Path, description = "Block ID")),
    responses(
        (status = 200, description = "Block", body = crate::ApiResponse<CmsBlock>),
        (status = 404, description = "Block not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn get_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let block = state
        .services
        .pages
        .get_block(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(block))
}

#[utoipa::path(
    put,
    path = "/api/v1/cms/blocks/{id}",
    params(("id" = Uuid, Path, description = "Block ID")),
    request_body = UpdateBlockInput,
    responses(
        (status = 200, description = "Block updated", body = crate::ApiResponse<CmsBlock>),
        (status = 404, description = "Block not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn update_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlockInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let block = state
        .services
        .pages
        .update_block(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(block))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cms/blocks/{id}",
    params(("id" = Uuid, Path, description = "Block ID")),
    responses(
        (status = 204, description = "Block deleted"),
        (status = 404, description = "Block not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Pages"
)]
pub async fn delete_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .pages
        .delete_block(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
