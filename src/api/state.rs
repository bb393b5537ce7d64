//! Shared handler state

use crate::auth::{PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::rate_limit::RateLimiter;
use crate::sentiment::{KeywordAnalyzer, SentimentAnalyzer};
use crate::storage::StorageBackend;
use std::sync::Arc;

/// Everything a request handler may need, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    pub analyzer: Arc<dyn SentimentAnalyzer>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
    pub auth_limiter: Arc<RateLimiter>,
    pub api_limiter: Arc<RateLimiter>,
    /// Account probed by `/api/test-db`
    pub admin_email: Arc<str>,
}

impl AppState {
    /// Wire up state from configuration and an opened storage backend
    pub fn from_config(config: &AppConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let window = config.rate_limit.window();

        Self {
            storage,
            analyzer: Arc::new(KeywordAnalyzer::default()),
            tokens: Arc::new(TokenService::new(
                &config.auth.jwt_secret,
                config.token_ttl(),
            )),
            passwords: PasswordHasher::new(config.auth.bcrypt_cost),
            auth_limiter: Arc::new(RateLimiter::new(
                "auth",
                config.rate_limit.auth_points,
                window,
            )),
            api_limiter: Arc::new(RateLimiter::new(
                "api",
                config.rate_limit.api_points,
                window,
            )),
            admin_email: Arc::from(config.admin.email.as_str()),
        }
    }
}
