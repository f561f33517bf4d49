//! Account management. Every route requires a supervisor.
//!
//! | Path | Method |
//! |------|--------|
//! | /users | POST, GET |
//! | /users/{username} | PATCH, DELETE |

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use bookstore_core::query::UserFilter;
use bookstore_core::validation::validate_password;
use bookstore_core::{Gender, NewUser, Page, User, UserChanges};
use serde::Deserialize;
use tracing::info;

use crate::auth::{hash_password, CurrentUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(register))
        .route("/users/{username}", patch(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub employee_id: String,
    pub true_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub is_supervisor: bool,
    pub password: String,
}

/// POST /users
async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    current.operator.require_supervisor()?;
    validate_password(&req.password)?;

    let user = state
        .db
        .users()
        .create(&NewUser {
            password_hash: hash_password(&req.password)?,
            username: req.username,
            employee_id: req.employee_id,
            true_name: req.true_name,
            gender: req.gender,
            age: req.age,
            is_supervisor: req.is_supervisor,
        })
        .await?;

    info!(by = %current.username, username = %user.username, "Account registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<Json<Page<User>>> {
    current.operator.require_supervisor()?;
    let page = state.db.users().list(&filter).await?;
    Ok(Json(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminUpdate {
    pub true_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    pub is_supervisor: Option<bool>,
    /// Sets the password back to the username.
    pub reset_password: bool,
}

/// PATCH /users/{username}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(username): ApiPath<String>,
    ApiJson(req): ApiJson<AdminUpdate>,
) -> ApiResult<Json<User>> {
    current.operator.require_supervisor()?;

    let password_hash = if req.reset_password {
        Some(hash_password(&username)?)
    } else {
        None
    };

    let changes = UserChanges {
        true_name: req.true_name,
        gender: req.gender,
        age: req.age,
        is_supervisor: req.is_supervisor,
        password_hash,
        ..Default::default()
    };

    let user = state.db.users().update(&username, &changes).await?;

    if req.reset_password {
        info!(by = %current.username, username = %username, "Password reset");
    }
    Ok(Json(user))
}

/// DELETE /users/{username}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<StatusCode> {
    current.operator.require_supervisor()?;
    state.db.users().delete(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}
