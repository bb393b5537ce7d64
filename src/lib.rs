//! InsightFlow - customer feedback collection and analytics API
//!
//! Collects free-text feedback from anonymous or signed-in customers, tags
//! each submission with a keyword sentiment, and serves dashboards:
//! - Public feedback submission
//! - Email/password accounts with HS256 bearer tokens
//! - Per-user and admin feedback listings with filters and pagination
//! - Sentiment and category analytics for admins
//!
//! # Architecture
//!
//! - **Types**: Core records and query shapes (Feedback, User, FeedbackQuery)
//! - **Sentiment**: Keyword tagger behind the `SentimentAnalyzer` trait
//! - **Auth**: Password hashing and token signing
//! - **Storage**: libsql backend behind the `StorageBackend` trait
//! - **API**: axum router, extractors and rate limiting
//!
//! # Example
//!
//! ```ignore
//! use insightflow_core::{api::{ApiServer, ApiServerConfig, AppState}, AppConfig, LibsqlStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let storage = LibsqlStorage::open(&config.database.path).await?;
//!     let state = AppState::from_config(&config, Arc::new(storage));
//!
//!     ApiServer::new(ApiServerConfig::default(), state).serve().await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod sentiment;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use self::config::AppConfig;
pub use error::{InsightError, Result};
pub use sentiment::{KeywordAnalyzer, SentimentAnalyzer, SentimentResult};
pub use storage::{LibsqlStorage, StorageBackend};
pub use types::{
    Category, Feedback, FeedbackQuery, FeedbackScope, NewFeedback, NewUser, Role, Sentiment, User,
    UserProfile,
};
