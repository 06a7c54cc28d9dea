//! Caller identity taken from `Authorization: Bearer <username>[:<role>]`.
//!
//! Only the username is trusted; roles are always resolved from the
//! directory. Token verification is left to whatever sits in front of the
//! service.

use crate::model::ErrorResponse;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
}

pub fn username_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| token.split(':').next())
        .map(str::trim)
        .filter(|username| !username.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        username_from_headers(&parts.headers)
            .map(|username| Caller { username })
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "missing or invalid bearer token".to_string(),
                    }),
                )
            })
    }
}
