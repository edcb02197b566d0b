//! Admin access for the CMS routes.
//!
//! Admin handlers take an [`AdminUser`]. With `require_admin_auth` on, the
//! request must carry `Authorization: Bearer <access token>` and the token
//! is resolved through the auth backend. With it off (development), the
//! extractor yields an anonymous admin.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;
use uuid::Uuid;

use crate::backend::AuthUserInfo;
use crate::errors::ApiError;
use crate::AppState;

/// Token from an `Authorization: Bearer ...` header, if present and non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    user: Option<AuthUserInfo>,
}

impl AdminUser {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn authenticated(user: AuthUserInfo) -> Self {
        Self { user: Some(user) }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.email.as_deref())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.config.require_admin_auth {
            return Ok(AdminUser::anonymous());
        }
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let user = state.services.auth.current_user(token).await?;
        debug!(user_id = %user.id, "admin request authenticated");
        Ok(AdminUser::authenticated(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer   tok "));
        assert_eq!(bearer_token(&headers), Some("tok"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn anonymous_admin_has_no_identity() {
        let admin = AdminUser::anonymous();
        assert!(admin.is_anonymous());
        assert_eq!(admin.id(), None);
        assert_eq!(admin.email(), None);
    }
}
