//! Public service routes.
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | / | GET | none |
//! | /health | GET | none |

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// ok | error
    status: &'static str,
    version: &'static str,
    database: bool,
    migrations_applied: usize,
    migrations_total: usize,
}

/// `503` when the database cannot answer a query.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let (migrations_total, migrations_applied) = match state.db.migration_status().await {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            (0, 0)
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "error" },
            version: env!("CARGO_PKG_VERSION"),
            database,
            migrations_applied,
            migrations_total,
        }),
    )
}
