//! Storage layer for InsightFlow
//!
//! Provides the persistence abstraction for accounts, feedback and sentiment
//! results, plus the aggregate queries behind the admin dashboard.

pub mod libsql;

use crate::error::Result;
use crate::types::{
    Feedback, FeedbackAnalytics, FeedbackQuery, FeedbackScope, NewFeedback, NewUser, Page,
    SentimentStats, TrendPoint, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use self::libsql::LibsqlStorage;

/// Storage backend trait defining all required operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a new account. Fails with `AlreadyExists` on a duplicate email.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Insert feedback together with its sentiment result
    async fn create_feedback(&self, feedback: &NewFeedback) -> Result<Feedback>;

    /// Filtered, newest-first page of feedback
    async fn list_feedback(
        &self,
        scope: &FeedbackScope,
        query: &FeedbackQuery,
    ) -> Result<Page<Feedback>>;

    /// Distributions, total and the per-day count for the last week
    async fn feedback_analytics(&self, now: DateTime<Utc>) -> Result<FeedbackAnalytics>;

    /// Sentiment totals, optionally only for feedback created since `since`
    async fn sentiment_stats(&self, since: Option<DateTime<Utc>>) -> Result<SentimentStats>;

    /// Per-day sentiment breakdown for feedback created since `since`
    async fn sentiment_trend(&self, since: DateTime<Utc>) -> Result<Vec<TrendPoint>>;

    /// Cheap round trip proving the database answers
    async fn health_check(&self) -> Result<()>;
}
