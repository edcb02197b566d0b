use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::backend::{AuthBackend, AuthSession, AuthUserInfo, BackendError, SignUpOutcome};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"email": "editor@example.com", "password": "correct-horse-battery"}))]
pub struct CredentialsRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Account operations passed through to the hosted auth endpoint.
#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn AuthBackend>,
}

impl AuthService {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: &CredentialsRequest) -> Result<SignUpOutcome, ServiceError> {
        let outcome = self
            .backend
            .sign_up(request.email.trim(), &request.password)
            .await
            .map_err(auth_error)?;
        if outcome.session.is_none() {
            info!("Sign-up for {} awaits email confirmation", outcome.user.id);
        } else {
            info!("Signed up user {}", outcome.user.id);
        }
        Ok(outcome)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_in(&self, request: &CredentialsRequest) -> Result<AuthSession, ServiceError> {
        let session = self
            .backend
            .sign_in(request.email.trim(), &request.password)
            .await
            .map_err(|err| match err {
                BackendError::Api { status: 400 | 401, .. } => {
                    warn!("Rejected sign-in");
                    ServiceError::Unauthorized("Invalid login credentials".into())
                }
                other => auth_error(other),
            })?;
        info!("Signed in user {}", session.user.id);
        Ok(session)
    }

    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError> {
        self.backend.sign_out(access_token).await.map_err(auth_error)
    }

    #[instrument(skip_all)]
    pub async fn current_user(&self, access_token: &str) -> Result<AuthUserInfo, ServiceError> {
        self.backend.get_user(access_token).await.map_err(auth_error)
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, ServiceError> {
        self.backend
            .refresh_session(refresh_token)
            .await
            .map_err(|err| match err {
                BackendError::Api { status: 400 | 401, .. } => {
                    ServiceError::Unauthorized("Refresh token is invalid or expired".into())
                }
                other => auth_error(other),
            })
    }
}

/// Rejected tokens surface as 401; a missing auth endpoint as 503.
fn auth_error(err: BackendError) -> ServiceError {
    match err {
        BackendError::NotConfigured => {
            ServiceError::BackendUnavailable("authentication is not configured".into())
        }
        BackendError::Api { status: 401 | 403, message, .. } => ServiceError::Unauthorized(message),
        other => ServiceError::Backend(other),
    }
}
