//! Sentiment statistics and per-day trend (admin only)

use crate::api::{
    error::ApiError,
    extract::{AdminUser, ApiQuery},
    state::AppState,
};
use crate::types::{SentimentStats, TrendPoint};
use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

pub const DEFAULT_TREND_DAYS: i64 = 7;
pub const MAX_DAYS: i64 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
    pub days: Option<String>,
}

/// Parse a `days` window; `None` when absent or blank
pub fn parse_days(raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<i64>() {
        Ok(days) if (1..=MAX_DAYS).contains(&days) => Ok(Some(days)),
        _ => Err(ApiError::bad_request(format!(
            "days must be a whole number between 1 and {}",
            MAX_DAYS
        ))),
    }
}

fn since(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// `GET /api/analytics/sentiment?days=N`
pub async fn sentiment_stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(params): ApiQuery<DaysParams>,
) -> Result<Json<SentimentStats>, ApiError> {
    let window = parse_days(params.days.as_deref())?.map(since);
    let stats = state.storage.sentiment_stats(window).await?;
    Ok(Json(stats))
}

/// `GET /api/analytics/trend?days=N` (default 7)
pub async fn sentiment_trend(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(params): ApiQuery<DaysParams>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    let days = parse_days(params.days.as_deref())?.unwrap_or(DEFAULT_TREND_DAYS);
    let points = state.storage.sentiment_trend(since(days)).await?;
    Ok(Json(points))
}
