//! # Bookstore API
//!
//! JSON over HTTP for the bookstore backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Bookstore API Server                            │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  auth / users  │  │  books         │  │  purchase / sales / bills  ││
//! │  │                │  │                │  │                            ││
//! │  │ • login/logout │  │ • list/create  │  │ • create, pay, return,     ││
//! │  │ • me           │  │ • get/put/del  │  │   arrive                   ││
//! │  │ • accounts     │  │                │  │ • sell, amend, delete      ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │           │                  │                       │                  │
//! │           └──────── CurrentUser (JWT + session) ─────┘                  │
//! │                              │ Operator                                 │
//! │                              ▼                                          │
//! │                        bookstore-db                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `BOOKSTORE_HTTP_PORT` - listen port (default: 8000)
//! - `BOOKSTORE_DATABASE_PATH` - SQLite file (default: ./bookstore.db)
//! - `BOOKSTORE_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `BOOKSTORE_JWT_SECRET` - token signing secret
//! - `BOOKSTORE_SESSION_LIFETIME_SECS` - session lifetime (default: 28800)
//! - `BOOKSTORE_BOOTSTRAP_ADMIN` - create the first supervisor (default: true)
//! - `BOOKSTORE_ADMIN_USERNAME` / `_PASSWORD` / `_EMPLOYEE_ID`

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use bookstore_core::{Gender, NewUser};
use bookstore_db::Database;
use tracing::info;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_app;

use crate::auth::{hash_password, JwtManager};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState {
            db,
            jwt: Arc::new(JwtManager::new(
                &config.jwt_secret,
                config.session_lifetime_secs,
            )),
            config: Arc::new(config),
        }
    }
}

/// Creates the configured supervisor when bootstrapping is enabled and no
/// account exists yet. Returns whether an account was created.
pub async fn bootstrap_admin(state: &AppState) -> ApiResult<bool> {
    let config = &state.config;
    if !config.bootstrap_admin || state.db.users().count().await? > 0 {
        return Ok(false);
    }

    state
        .db
        .users()
        .create(&NewUser {
            username: config.admin_username.clone(),
            employee_id: config.admin_employee_id.clone(),
            true_name: "Administrator".to_string(),
            gender: Gender::Male,
            age: None,
            is_supervisor: true,
            password_hash: hash_password(&config.admin_password)?,
        })
        .await?;

    info!(username = %config.admin_username, "Bootstrap supervisor created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_db::DbConfig;

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, ApiConfig::default());

        assert!(bootstrap_admin(&state).await.unwrap());
        assert!(!bootstrap_admin(&state).await.unwrap());

        let admin = state.db.users().get("admin").await.unwrap();
        assert!(admin.is_supervisor);
        assert_eq!(admin.employee_id, "0001");
    }

    #[tokio::test]
    async fn test_bootstrap_can_be_disabled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig {
            bootstrap_admin: false,
            ..ApiConfig::default()
        };
        let state = AppState::new(db, config);

        assert!(!bootstrap_admin(&state).await.unwrap());
        assert_eq!(state.db.users().count().await.unwrap(), 0);
    }
}
