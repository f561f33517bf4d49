//! HTTP routes.
//!
//! # Structure
//!
//! - [`health`] - service info and health check (public)
//! - [`auth`] - login, logout, own profile
//! - [`users`] - account management (supervisor)
//! - [`books`] - catalog
//! - [`purchase`] - purchase order lifecycle
//! - [`sales`] - sale orders
//! - [`bills`] - ledger

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod auth;
pub mod bills;
pub mod books;
pub mod health;
pub mod purchase;
pub mod sales;
pub mod users;

/// Every route, without middleware or state.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(books::router())
        .merge(purchase::router())
        .merge(sales::router())
        .merge(bills::router())
}

/// The application served over HTTP, middleware and state attached.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use axum::body::Body;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
    use axum::http::{Method, Request, StatusCode};
    use bookstore_db::{Database, DbConfig};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const ISBN: &str = "9780000000001";

    async fn app() -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, ApiConfig::default());
        crate::bootstrap_admin(&state).await.unwrap();
        build_app(state)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_public_routes() {
        let app = app().await;

        let (status, body) = call(&app, Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "bookstore-api");

        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
        assert_eq!(body["migrations_applied"], body["migrations_total"]);
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_session() {
        let app = app().await;

        let (status, body) = call(&app, Method::GET, "/books", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = call(&app, Method::GET, "/books", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let app = app().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let first = login(&app, "admin", "admin").await;
        let (status, me) = call(&app, Method::GET, "/me", Some(&first), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "admin");
        assert_eq!(me["is_supervisor"], true);
        assert!(me.get("password_hash").is_none());

        // A second login replaces the first session
        let second = login(&app, "admin", "admin").await;
        let (status, _) = call(&app, Method::GET, "/me", Some(&first), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, Method::POST, "/logout", Some(&second), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, "/me", Some(&second), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_purchase_and_sale_flow() {
        let app = app().await;
        let token = login(&app, "admin", "admin").await;
        let token = Some(token.as_str());

        let (status, order) = call(
            &app,
            Method::POST,
            "/purchase/orders",
            token,
            Some(json!({
                "isbn": ISBN,
                "quantity": 10,
                "purchase_price_cents": 500,
                "book": { "title": "The Rust Book" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        assert_eq!(order["status"], "unpaid");
        assert_eq!(order["total_amount_cents"], 5000);
        let id = order["id"].as_i64().unwrap();

        let (status, body) =
            call(&app, Method::PUT, &format!("/purchase/orders/{id}/arrive"), token, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_STATE");

        let (status, payment) =
            call(&app, Method::PUT, &format!("/purchase/orders/{id}/pay"), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payment["order"]["status"], "paid");
        assert_eq!(payment["order"]["settled_by"], "0001");
        assert_eq!(payment["bill"]["bill_type"], "purchase");
        assert_eq!(payment["bill"]["amount_cents"], 5000);

        let (status, body) =
            call(&app, Method::PUT, &format!("/purchase/orders/{id}/arrive"), token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, arrival) = call(
            &app,
            Method::PUT,
            &format!("/purchase/orders/{id}/arrive?retail_price_cents=2000"),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(arrival["order"]["status"], "arrived");
        assert_eq!(arrival["book"]["stock"], 10);
        assert_eq!(arrival["book"]["retail_price_cents"], 2000);

        let (status, sale) = call(
            &app,
            Method::POST,
            "/sales",
            token,
            Some(json!({ "items": [{ "isbn": ISBN, "quantity": 3 }], "payment_method": "cash" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{sale}");
        assert_eq!(sale["total_amount_cents"], 6000);
        assert_eq!(sale["items"][0]["title"], "The Rust Book");
        let sale_id = sale["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            "/sales",
            token,
            Some(json!({ "items": [{ "isbn": ISBN, "quantity": 8 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (_, book) = call(&app, Method::GET, &format!("/books/{ISBN}"), token, None).await;
        assert_eq!(book["stock"], 7);

        let (status, _) = call(&app, Method::DELETE, &format!("/sales/{sale_id}"), token, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/sales/{sale_id}"),
            token,
            Some(json!({ "remark": "gift wrap" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["remark"], "gift wrap");
        assert_eq!(updated["payment_method"], "cash");

        let (status, bills) = call(&app, Method::GET, "/bills?bill_type=sale", token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bills["total"], 1);
        assert_eq!(bills["items"][0]["amount_cents"], 6000);

        let (_, orders) = call(&app, Method::GET, "/purchase/orders?status=arrived", token, None).await;
        assert_eq!(orders["total"], 1);

        // Restocking a priced book needs no price
        let (_, order) = call(
            &app,
            Method::POST,
            "/purchase/orders",
            token,
            Some(json!({ "isbn": ISBN, "quantity": 4, "purchase_price_cents": 500 })),
        )
        .await;
        let id = order["id"].as_i64().unwrap();
        call(&app, Method::PUT, &format!("/purchase/orders/{id}/pay"), token, None).await;

        let (status, arrival) =
            call(&app, Method::PUT, &format!("/purchase/orders/{id}/arrive"), token, None).await;
        assert_eq!(status, StatusCode::OK, "{arrival}");
        assert_eq!(arrival["book"]["stock"], 11);
        assert_eq!(arrival["book"]["retail_price_cents"], 2000);
    }

    #[tokio::test]
    async fn test_account_management() {
        let app = app().await;
        let admin = login(&app, "admin", "admin").await;

        let (status, clerk) = call(
            &app,
            Method::POST,
            "/users",
            Some(&admin),
            Some(json!({
                "username": "clerk",
                "employee_id": "0002",
                "true_name": "Casey Clerk",
                "gender": "female",
                "password": "secret1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{clerk}");
        assert_eq!(clerk["is_supervisor"], false);

        let clerk = login(&app, "clerk", "secret1").await;

        let (status, body) = call(&app, Method::GET, "/users", Some(&clerk), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, _) = call(
            &app,
            Method::PATCH,
            "/me",
            Some(&clerk),
            Some(json!({ "is_supervisor": true })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &app,
            Method::PATCH,
            "/me",
            Some(&clerk),
            Some(json!({ "new_password": "secret2" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, me) = call(
            &app,
            Method::PATCH,
            "/me",
            Some(&clerk),
            Some(json!({ "current_password": "secret1", "new_password": "secret2", "age": 31 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["age"], 31);
        login(&app, "clerk", "secret2").await;

        let (status, _) = call(
            &app,
            Method::PATCH,
            "/users/clerk",
            Some(&admin),
            Some(json!({ "reset_password": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let clerk = login(&app, "clerk", "clerk").await;

        let (status, users) = call(&app, Method::GET, "/users?username=cl", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users["total"], 1);

        let (status, _) = call(&app, Method::DELETE, "/users/admin", Some(&admin), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, Method::DELETE, "/users/clerk", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, "/me", Some(&clerk), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_input() {
        let app = app().await;
        let token = login(&app, "admin", "admin").await;
        let token = Some(token.as_str());

        let (status, body) = call(&app, Method::GET, "/purchase/orders/abc", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, body) = call(&app, Method::GET, "/books?page_size=1000", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, body) = call(
            &app,
            Method::POST,
            "/books",
            token,
            Some(json!({ "isbn": "123", "title": "Short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, body) = call(&app, Method::GET, &format!("/books/{ISBN}"), token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
