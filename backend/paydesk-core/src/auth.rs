// src/auth.rs
//
// Single admin account with opaque bearer tokens held in memory.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::routes::AppState;

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_hours: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: i64::try_from(ttl_hours)
                .ok()
                .and_then(Duration::try_hours)
                .unwrap_or(Duration::MAX),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>, AppError> {
        self.sessions
            .lock()
            .map_err(|e| AppError::Lock(format!("Session store mutex poisoned: {}", e)))
    }

    /// Issues a new token. Expired sessions are dropped on the way.
    pub fn issue(&self, username: &str) -> Result<(String, DateTime<Utc>), AppError> {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        let token = hex::encode(bytes);
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.lock()?;
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at,
            },
        );
        Ok((token, expires_at))
    }

    /// Username behind a live token.
    pub fn validate(&self, token: &str) -> Result<String, AppError> {
        let mut sessions = self.lock()?;
        match sessions.get(token).cloned() {
            Some(session) if session.expires_at > Utc::now() => Ok(session.username),
            Some(_) => {
                sessions.remove(token);
                debug!("Rejected expired session token");
                Err(AppError::Unauthorized)
            }
            None => Err(AppError::Unauthorized),
        }
    }

    pub fn revoke(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.remove(token).is_some())
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Username of the authenticated admin, set by the middleware.
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: middleware::Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        debug!("Missing bearer token for {}", request.uri().path());
        AppError::Unauthorized
    })?;
    let username = state.sessions.validate(token)?;
    request.extensions_mut().insert(AdminUser(username));
    Ok(next.run(request).await)
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub username: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if body.username != state.config.admin_username || body.password != state.config.admin_password
    {
        warn!("Failed admin login for '{}'", body.username);
        return Err(AppError::InvalidCredentials);
    }
    let (token, expires_at) = state.sessions.issue(&body.username)?;
    info!("Admin '{}' logged in", body.username);
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_at,
        username: body.username,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    state.sessions.revoke(token)?;
    info!("Admin logged out");
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

pub async fn me(
    axum::Extension(AdminUser(username)): axum::Extension<AdminUser>,
) -> impl IntoResponse {
    Json(serde_json::json!({ "username": username, "role": "admin" }))
}
