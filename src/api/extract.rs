//! Request extractors: JSON/query with API-shaped rejections, and the
//! bearer-token identities

use super::{error::ApiError, state::AppState};
use crate::auth::Claims;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::Utc;
use tracing::debug;

/// `Json<T>` whose rejection uses the standard error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` whose rejection uses the standard error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Caller authenticated by a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let claims = state.tokens.verify(token, Utc::now()).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ApiError::from(e)
        })?;

        Ok(AuthUser(claims))
    }
}

/// Authenticated caller holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        if !claims.role.is_admin() {
            return Err(ApiError::forbidden("Access denied. Admin role required."));
        }

        Ok(AdminUser(claims))
    }
}
