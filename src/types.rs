//! Core data types for the InsightFlow feedback service
//!
//! Defines feedback records, user accounts, the role/sentiment/category
//! vocabularies, listing queries with pagination, and the analytics shapes
//! returned to the dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InsightError;

/// Default page size for feedback listings
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular account, sees only its own feedback
    #[default]
    User,
    /// Sees all feedback and aggregate analytics
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(InsightError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Sentiment label assigned to a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(InsightError::Validation(format!(
                "Unknown sentiment: {}",
                other
            ))),
        }
    }
}

/// Feedback category chosen on the submission form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    General,
    Complaint,
    Praise,
    FeatureRequest,
    BugReport,
    Suggestion,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Complaint => "complaint",
            Category::Praise => "praise",
            Category::FeatureRequest => "feature_request",
            Category::BugReport => "bug_report",
            Category::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Category::General),
            "complaint" => Ok(Category::Complaint),
            "praise" => Ok(Category::Praise),
            "feature_request" => Ok(Category::FeatureRequest),
            "bug_report" => Ok(Category::BugReport),
            "suggestion" => Ok(Category::Suggestion),
            other => Err(InsightError::Validation(format!(
                "Unknown category: {}",
                other
            ))),
        }
    }
}

/// A stored feedback record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub category: Category,
    pub sentiment: Sentiment,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Feedback ready to be inserted (sentiment already assigned)
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub category: Category,
    pub sentiment: Sentiment,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// A stored user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public view of the account, without the password hash
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// User fields that are safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Account ready to be inserted (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Which feedback a listing may see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackScope {
    /// Every record; search also matches the submitter email
    All,
    /// Records submitted under one email address
    Email(String),
}

/// Filters and pagination for feedback listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<Category>,
    pub sentiment: Option<Sentiment>,
    pub search: Option<String>,
}

impl Default for FeedbackQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            category: None,
            sentiment: None,
            search: None,
        }
    }
}

impl FeedbackQuery {
    /// Build a query from raw dashboard parameters
    ///
    /// Unparseable page/limit values fall back to the defaults. `"all"` or an
    /// empty string disables the category and sentiment filters.
    pub fn from_params(
        page: Option<&str>,
        limit: Option<&str>,
        category: Option<&str>,
        sentiment: Option<&str>,
        search: Option<&str>,
    ) -> crate::Result<Self> {
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let category = match filter_value(category) {
            Some(c) => Some(c.parse::<Category>()?),
            None => None,
        };
        let sentiment = match filter_value(sentiment) {
            Some(s) => Some(s.parse::<Sentiment>()?),
            None => None,
        };
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            page,
            limit,
            category,
            sentiment,
            search,
        })
    }

    /// Row offset of the first record on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn filter_value(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty() && *v != "all")
}

/// Pagination metadata returned with every listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn new(query: &FeedbackQuery, total_items: u64) -> Self {
        Self {
            current_page: query.page,
            total_pages: total_items.div_ceil(u64::from(query.limit)),
            total_items,
            items_per_page: query.limit,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Feedback count per sentiment label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCount {
    pub sentiment: Sentiment,
    pub count: u64,
}

/// Feedback count per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

/// Feedback count for one calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

/// Admin dashboard overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnalytics {
    pub sentiment_distribution: Vec<SentimentCount>,
    pub category_distribution: Vec<CategoryCount>,
    pub total_feedback: u64,
    pub recent_trend: Vec<DailyCount>,
}

/// Sentiment totals with every label present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentStats {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl SentimentStats {
    pub fn add(&mut self, sentiment: Sentiment, count: u64) {
        match sentiment {
            Sentiment::Positive => self.positive += count,
            Sentiment::Negative => self.negative += count,
            Sentiment::Neutral => self.neutral += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.positive + self.negative + self.neutral
    }
}

/// Per-day sentiment breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}
