//! Common test utilities and helpers

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use insightflow_core::{
    api::{ApiServer, AppState},
    config::{
        AdminConfig, AppConfig, AuthConfig, DatabaseConfig, RateLimitConfig, RunEnvironment,
        ServerConfig,
    },
    LibsqlStorage,
};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const ADMIN_EMAIL: &str = "admin@insightflow.com";

/// Configuration for a throwaway database; bcrypt cost kept at the minimum
pub fn test_config(dir: &TempDir, auth_points: u32, api_points: u32) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            environment: RunEnvironment::Development,
        },
        database: DatabaseConfig {
            path: dir.path().join("insightflow_test.db"),
        },
        auth: AuthConfig {
            jwt_secret: SecretString::new(TEST_SECRET.into()),
            token_ttl_secs: 3600,
            bcrypt_cost: 4,
        },
        rate_limit: RateLimitConfig {
            auth_points,
            api_points,
            window_secs: 60,
        },
        admin: AdminConfig {
            email: ADMIN_EMAIL.to_string(),
        },
    }
}

/// Create a file-backed storage in a temp dir
///
/// libSQL's `:memory:` gives each connection its own database, so a file is
/// needed for migrations to be visible to later connections.
pub async fn create_test_storage() -> (LibsqlStorage, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = LibsqlStorage::open(dir.path().join("storage_test.db"))
        .await
        .expect("Failed to create test storage");
    (storage, dir)
}

/// Router plus the storage behind it
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<LibsqlStorage>,
    _dir: TempDir,
}

impl TestApp {
    /// Limits high enough that ordinary tests never hit them
    pub async fn new() -> Self {
        Self::with_limits(1_000, 1_000).await
    }

    pub async fn with_limits(auth_points: u32, api_points: u32) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&dir, auth_points, api_points);

        let storage = Arc::new(
            LibsqlStorage::open(&config.database.path)
                .await
                .expect("Failed to open test database"),
        );
        let state = AppState::from_config(&config, storage.clone());

        Self {
            router: ApiServer::build_router(state, config.is_development()),
            storage,
            _dir: dir,
        }
    }

    /// Send a request, returning status and JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None, Some(body)).await
    }

    /// Sign up and return the issued token
    pub async fn signup(&self, name: &str, email: &str, role: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/signup",
                serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": "secret123",
                    "role": role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
        body["token"]
            .as_str()
            .expect("signup returned no token")
            .to_string()
    }

    pub async fn submit(&self, message: &str, email: Option<&str>, category: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/feedback/submit",
                serde_json::json!({
                    "name": "Customer",
                    "email": email,
                    "message": message,
                    "category": category,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {}", body);
        body["feedback"].clone()
    }
}
