//! Request extractors that reject with [`ApiError`] instead of axum's
//! plain-text responses, so malformed input gets the usual JSON error body.

use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::Json;

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string, deserialized into a filter struct.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
