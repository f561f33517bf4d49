//! Session and own-profile routes.
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /login | POST | none |
//! | /logout | POST | session |
//! | /me | GET, PATCH | session |

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bookstore_core::validation::validate_password;
use bookstore_core::{CoreError, ErrorKind, Gender, Session, User, UserChanges};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).patch(update_me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// POST /login
///
/// Unknown user and wrong password fail the same way.
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state.db.users().find(&req.username).await?;

    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!(username = %req.username, "Login rejected");
            return Err(CoreError::InvalidCredentials.into());
        }
    };

    let issued = state.jwt.issue(&user)?;

    state
        .db
        .sessions()
        .replace(&Session {
            token: issued.token.clone(),
            username: user.username.clone(),
            employee_id: user.employee_id.clone(),
            is_supervisor: user.is_supervisor,
            expires_at: issued.expires_at,
        })
        .await?;

    info!(username = %user.username, expires_at = %issued.expires_at, "User logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    }))
}

/// POST /logout
async fn logout(State(state): State<AppState>, current: CurrentUser) -> ApiResult<StatusCode> {
    state.db.sessions().delete(&current.token).await?;
    info!(username = %current.username, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /me
async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<User>> {
    let user = state.db.users().get(&current.username).await?;
    Ok(Json(user))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub true_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    /// Supervisors only
    pub employee_id: Option<String>,
    /// Supervisors only
    pub is_supervisor: Option<bool>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// PATCH /me
async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let user = state.db.users().get(&current.username).await?;

    if !user.is_supervisor {
        let changes_employee_id = req
            .employee_id
            .as_deref()
            .is_some_and(|id| id != user.employee_id);
        if changes_employee_id || req.is_supervisor == Some(true) {
            return Err(CoreError::PermissionDenied(
                "only supervisors can change employee id or supervisor status".to_string(),
            )
            .into());
        }
    }

    let password_hash = match &req.new_password {
        Some(new_password) => {
            let current_password = req.current_password.as_deref().ok_or_else(|| {
                ApiError::bad_request("current_password is required to change the password")
            })?;
            if !verify_password(current_password, &user.password_hash) {
                warn!(username = %user.username, "Password change with wrong current password");
                return Err(ApiError::new(
                    ErrorKind::Forbidden,
                    "current password is incorrect",
                ));
            }
            validate_password(new_password)?;
            Some(hash_password(new_password)?)
        }
        None => None,
    };

    let changes = UserChanges {
        employee_id: req.employee_id,
        true_name: req.true_name,
        gender: req.gender,
        age: req.age,
        is_supervisor: req.is_supervisor,
        password_hash,
    };

    let updated = state.db.users().update(&user.username, &changes).await?;
    Ok(Json(updated))
}
