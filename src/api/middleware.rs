//! Rate limiting middleware

use super::{error::ApiError, extract::bearer_token, state::AppState};
use crate::rate_limit::{Decision, RateLimiter};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::net::SocketAddr;

const AUTH_LIMIT_MESSAGE: &str = "Too many login attempts, please try again later.";
const API_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Client address: the peer, else the first `X-Forwarded-For` hop
pub fn client_ip(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    forwarded_for(request.headers()).unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn enforce(limiter: &RateLimiter, key: &str, message: &'static str) -> Result<(), ApiError> {
    match limiter.check(key) {
        Decision::Allowed { .. } => Ok(()),
        Decision::Limited { retry_after } => Err(ApiError::TooManyRequests {
            message,
            retry_after,
        }),
    }
}

/// Per-IP limiter for the login and signup routes
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(&request);

    match enforce(&state.auth_limiter, &key, AUTH_LIMIT_MESSAGE) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// General limiter, keyed by user id for valid tokens and by IP otherwise
pub async fn api_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = bearer_token(request.headers())
        .and_then(|token| state.tokens.verify(token, Utc::now()).ok())
        .map(|claims| format!("user:{}", claims.id))
        .unwrap_or_else(|| format!("ip:{}", client_ip(&request)));

    match enforce(&state.api_limiter, &key, API_LIMIT_MESSAGE) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_ip_prefers_peer_address() {
        let mut request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4242))));

        assert_eq!(client_ip(&request), "10.0.0.2");
    }

    #[test]
    fn test_client_ip_falls_back_to_forwarded_for() {
        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.9");

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
