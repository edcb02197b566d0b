//! Account endpoints forwarded to the hosted auth service.

use axum::{
    extract::{Json, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::auth::bearer_token;
use crate::backend::{AuthSession, AuthUserInfo, SignUpOutcome};
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::services::auth::{CredentialsRequest, RefreshRequest};
use crate::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
        .route("/user", get(current_user))
        .route("/refresh", post(refresh))
}

fn require_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    bearer_token(headers).ok_or(ApiError::Unauthorized)
}

/// Register an account. `session` is null until the email is confirmed.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = crate::ApiResponse<SignUpOutcome>),
        (status = 400, description = "Invalid email or password", body = crate::errors::ErrorResponse),
        (status = 503, description = "Auth not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let outcome = state
        .services
        .auth
        .sign_up(&payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(outcome))
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Session issued", body = crate::ApiResponse<AuthSession>),
        (status = 401, description = "Invalid login credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let session = state
        .services
        .auth
        .sign_in(&payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(session))
}

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_token(&headers)?;
    state
        .services
        .auth
        .sign_out(token)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/auth/user",
    responses(
        (status = 200, description = "Signed-in user", body = crate::ApiResponse<AuthUserInfo>),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_token(&headers)?;
    let user = state
        .services
        .auth
        .current_user(token)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(user))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session refreshed", body = crate::ApiResponse<AuthSession>),
        (status = 401, description = "Refresh token invalid or expired", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let session = state
        .services
        .auth
        .refresh(&payload.refresh_token)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(session))
}
