//! Welcome, health and database self-test endpoints

use crate::api::state::AppState;
use crate::types::UserProfile;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// `GET /`
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to InsightFlow API".to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match state.storage.health_check().await {
        Ok(()) => ("ok", StatusCode::OK, "ok".to_string()),
        Err(e) => {
            error!("Health check failed: {}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminProbe {
    pub admin: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbTestResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AdminProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/test-db`: confirm the configured admin account is present
pub async fn test_db(State(state): State<AppState>) -> (StatusCode, Json<DbTestResponse>) {
    match state.storage.find_user_by_email(&state.admin_email).await {
        Ok(Some(admin)) => (
            StatusCode::OK,
            Json(DbTestResponse {
                success: true,
                message: "Database connection successful".to_string(),
                data: Some(AdminProbe {
                    admin: admin.profile(),
                }),
                error: None,
            }),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(DbTestResponse {
                success: false,
                message: "Admin user not found. Database might not be properly initialized."
                    .to_string(),
                data: None,
                error: None,
            }),
        ),
        Err(e) => {
            error!("Database test failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DbTestResponse {
                    success: false,
                    message: "Database connection error".to_string(),
                    data: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
