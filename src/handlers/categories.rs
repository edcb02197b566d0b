use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{
    localized_created_response, localized_response, map_service_error, no_content_response,
    success_response, validate_input, ApiQuery,
};
use crate::locale::LocaleContext;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use crate::services::categories::CategoryTreeView;
use crate::services::TreeExpansion;
use crate::AppState;

pub fn cms_category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/tree", get(category_tree))
        .route("/categories/parent-options", get(parent_options))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TreeQuery {
    /// `all` opens every node with children
    pub expand: Option<String>,
    /// Comma-separated ids of open nodes
    pub expanded: Option<String>,
    /// Node to flip after applying `expand`/`expanded`
    pub toggle: Option<Uuid>,
}

impl TreeQuery {
    fn expansion(&self, tree: &[crate::models::CategoryNode]) -> Result<TreeExpansion, ApiError> {
        let mut expansion = match self.expanded.as_deref() {
            Some(raw) => {
                let ids = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<Uuid>().map_err(|_| ApiError::BadRequest {
                            message: format!("Invalid category id in expanded: {s}"),
                            error_code: Some("invalid_id".to_string()),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                TreeExpansion::from_ids(ids)
            }
            None => TreeExpansion::new(),
        };
        if self.expand.as_deref() == Some("all") {
            expansion.expand_all(tree);
        }
        if let Some(id) = self.toggle {
            expansion.toggle(id);
        }
        Ok(expansion)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParentOptionsQuery {
    /// Category being edited; it and its descendants are left out
    pub editing: Option<Uuid>,
}

/// Flat category list in display order
#[utoipa::path(
    get,
    path = "/api/v1/cms/categories",
    responses(
        (status = 200, description = "Categories", body = crate::ApiResponse<Vec<Category>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn list_categories(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list(ctx.locale)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, categories))
}

/// Category tree annotated with open/closed state
#[utoipa::path(
    get,
    path = "/api/v1/cms/categories/tree",
    params(TreeQuery),
    responses(
        (status = 200, description = "Tree view", body = crate::ApiResponse<Vec<CategoryTreeView>>),
        (status = 400, description = "Malformed id list", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn category_tree(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    ApiQuery(query): ApiQuery<TreeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state
        .services
        .categories
        .tree(ctx.locale)
        .await
        .map_err(map_service_error)?;
    let expansion = query.expansion(&tree)?;
    Ok(localized_response(ctx, expansion.view(&tree)))
}

/// Categories selectable as parent in the category form
#[utoipa::path(
    get,
    path = "/api/v1/cms/categories/parent-options",
    params(ParentOptionsQuery),
    responses(
        (status = 200, description = "Parent candidates", body = crate::ApiResponse<Vec<Category>>)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn parent_options(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    ApiQuery(query): ApiQuery<ParentOptionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let options = state
        .services
        .categories
        .parent_options(ctx.locale, query.editing)
        .await
        .map_err(map_service_error)?;
    Ok(localized_response(ctx, options))
}

#[utoipa::path(
    post,
    path = "/api/v1/cms/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = crate::ApiResponse<Category>),
        (status = 400, description = "Invalid payload or parent", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already used in this locale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn create_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    ctx: LocaleContext,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .categories
        .create(ctx.locale, payload)
        .await
        .map_err(map_service_error)?;
    Ok(localized_created_response(ctx, category))
}

#[utoipa::path(
    get,
    path = "/api/v1/cms/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = crate::ApiResponse<Category>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn get_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

/// Update a category. `parent_id: null` moves it to the root.
#[utoipa::path(
    put,
    path = "/api/v1/cms/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryInput,
    responses(
        (status = 200, description = "Category updated", body = crate::ApiResponse<Category>),
        (status = 400, description = "Invalid payload or parent", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn update_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .categories
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

/// Delete a category; its children move up to its parent
#[utoipa::path(
    delete,
    path = "/api/v1/cms/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "CMS Categories"
)]
pub async fn delete_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .categories
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
