//! Signup and login

use crate::api::{error::ApiError, extract::ApiJson, state::AppState};
use crate::error::InsightError;
use crate::types::{NewUser, Role, UserProfile};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Valid email regex"));

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Accounts are keyed by trimmed, lowercased email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password length in UTF-16 code units, the unit browsers count in
pub fn password_length(password: &str) -> usize {
    password.encode_utf16().count()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `POST /api/auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let (Some(name), Some(email), Some(password)) = (
        required(req.name),
        required(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "Name, email, and password are required",
        ));
    };

    if password_length(&password) < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request(
            "Please provide a valid email address",
        ));
    }

    let role = match req.role.as_deref() {
        None => Role::User,
        Some(raw) => raw.parse::<Role>().map_err(|_| {
            ApiError::bad_request("Invalid role. Must be either \"user\" or \"admin\"")
        })?,
    };

    if state.storage.find_user_by_email(&email).await?.is_some() {
        return Err(InsightError::AlreadyExists(email).into());
    }

    let password_hash = state.passwords.hash(&password).await?;
    let user = state
        .storage
        .create_user(&NewUser {
            name: name.trim().to_string(),
            email,
            password_hash,
            role,
        })
        .await?;

    let token = state.tokens.issue(&user, Utc::now())?;
    info!("New {} account signed up: {}", user.role, user.id);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created successfully".to_string(),
            token,
            user: user.profile(),
        }),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        required(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let invalid = || ApiError::unauthorized("Invalid credentials");

    let Some(user) = state
        .storage
        .find_user_by_email(&normalize_email(&email))
        .await?
    else {
        warn!("Login attempt for unknown account");
        return Err(invalid());
    };

    if !state.passwords.verify(&password, &user.password_hash).await? {
        warn!("Failed login for account {}", user.id);
        return Err(invalid());
    }

    let token = state.tokens.issue(&user, Utc::now())?;
    info!("Account {} logged in", user.id);

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}
