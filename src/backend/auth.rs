//! Authentication passthrough to the hosted auth endpoint.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use super::BackendError;

/// Access lifetime handed out by [`MemoryAuth`], in seconds.
const MEMORY_SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AuthUserInfo {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUserInfo,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Sign-up result. `session` is absent when the account still needs email
/// confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SignUpOutcome {
    pub user: AuthUserInfo,
    pub session: Option<AuthSession>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Resolves the user behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<AuthUserInfo, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;
}

fn unauthorized(message: &str) -> BackendError {
    BackendError::Api {
        status: 401,
        code: Some("invalid_grant".into()),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Hosted auth
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_code: Option<String>,
}

#[derive(Clone)]
pub struct RestAuth {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl RestAuth {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let trimmed = base_url.trim();
        let base = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: Url::parse(&base)?,
            api_key: anon_key.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> Result<RequestBuilder, BackendError> {
        let url = self
            .base_url
            .join(&format!("auth/v1/{path}"))
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let token = bearer.unwrap_or(&self.api_key);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {token}")))
    }

    async fn call(&self, builder: RequestBuilder) -> Result<Value, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let parsed: AuthErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = parsed
                .error_description
                .or(parsed.msg)
                .or(parsed.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("auth error").to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                code: parsed.error_code.or(parsed.error),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Sign-up answers either with a session (`access_token` + `user`) or with
/// the bare user when confirmation is pending.
fn parse_sign_up(body: Value) -> Result<SignUpOutcome, BackendError> {
    if body.get("access_token").is_some() {
        let session: AuthSession = super::decode_row(body)?;
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }
    let user_value = body.get("user").cloned().unwrap_or(body);
    Ok(SignUpOutcome {
        user: super::decode_row(user_value)?,
        session: None,
    })
}

#[async_trait]
impl AuthBackend for RestAuth {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let builder = self
            .request(Method::POST, "signup", None)?
            .json(&json!({ "email": email, "password": password }));
        parse_sign_up(self.call(builder).await?)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let builder = self
            .request(Method::POST, "token", None)?
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        super::decode_row(self.call(builder).await?)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let builder = self.request(Method::POST, "logout", Some(access_token))?;
        self.call(builder).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<AuthUserInfo, BackendError> {
        let builder = self.request(Method::GET, "user", Some(access_token))?;
        super::decode_row(self.call(builder).await?)
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let builder = self
            .request(Method::POST, "token", None)?
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        super::decode_row(self.call(builder).await?)
    }
}

// ---------------------------------------------------------------------------
// Unconfigured
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuth;

#[async_trait]
impl AuthBackend for NullAuth {
    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignUpOutcome, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<AuthSession, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn get_user(&self, _access_token: &str) -> Result<AuthUserInfo, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<AuthSession, BackendError> {
        Err(BackendError::NotConfigured)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

struct StoredUser {
    info: AuthUserInfo,
    password_hash: String,
}

#[derive(Default)]
struct MemoryAuthState {
    users: HashMap<String, StoredUser>,
    /// access token -> user email
    access: HashMap<String, String>,
    /// refresh token -> user email
    refresh: HashMap<String, String>,
}

/// Users and opaque session tokens kept in process memory.
#[derive(Default)]
pub struct MemoryAuth {
    state: RwLock<MemoryAuthState>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_password(password: &str) -> Result<String, BackendError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| BackendError::Transport(format!("password hashing failed: {e}")))
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    fn issue_session(state: &mut MemoryAuthState, email: &str, user: AuthUserInfo) -> AuthSession {
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        state.access.insert(access_token.clone(), email.to_string());
        state.refresh.insert(refresh_token.clone(), email.to_string());
        AuthSession {
            access_token,
            refresh_token,
            token_type: default_token_type(),
            expires_in: Some(MEMORY_SESSION_TTL_SECS),
            user,
        }
    }
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let email = email.trim().to_lowercase();
        let password_hash = Self::hash_password(password)?;

        let mut state = self.state.write().await;
        if state.users.contains_key(&email) {
            return Err(BackendError::Api {
                status: 422,
                code: Some("user_already_exists".into()),
                message: "User already registered".into(),
            });
        }

        let info = AuthUserInfo {
            id: Uuid::new_v4(),
            email: Some(email.clone()),
            role: Some("authenticated".into()),
            user_metadata: json!({ "created_at": Utc::now().to_rfc3339() }),
        };
        state.users.insert(
            email.clone(),
            StoredUser {
                info: info.clone(),
                password_hash,
            },
        );
        let session = Self::issue_session(&mut state, &email, info.clone());
        info!(user_id = %info.id, "registered in-memory user");
        Ok(SignUpOutcome {
            user: info,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let email = email.trim().to_lowercase();
        let mut state = self.state.write().await;
        let info = match state.users.get(&email) {
            Some(user) if Self::verify_password(password, &user.password_hash) => user.info.clone(),
            _ => return Err(unauthorized("Invalid login credentials")),
        };
        debug!(user_id = %info.id, "in-memory sign in");
        Ok(Self::issue_session(&mut state, &email, info))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let Some(email) = state.access.remove(access_token) else {
            return Err(unauthorized("Invalid or expired token"));
        };
        state.refresh.retain(|_, owner| *owner != email);
        state.access.retain(|_, owner| *owner != email);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUserInfo, BackendError> {
        let state = self.state.read().await;
        state
            .access
            .get(access_token)
            .and_then(|email| state.users.get(email))
            .map(|user| user.info.clone())
            .ok_or_else(|| unauthorized("Invalid or expired token"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state.write().await;
        let email = state
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| unauthorized("Invalid refresh token"))?;
        let info = state
            .users
            .get(&email)
            .map(|user| user.info.clone())
            .ok_or_else(|| unauthorized("Invalid refresh token"))?;
        Ok(Self::issue_session(&mut state, &email, info))
    }
}
