//! Feedback submission, dashboard listings and the admin overview

use crate::api::{
    error::ApiError,
    extract::{AdminUser, ApiJson, ApiQuery, AuthUser},
    handlers::auth::normalize_email,
    state::AppState,
};
use crate::types::{
    Category, Feedback, FeedbackAnalytics, FeedbackQuery, FeedbackScope, NewFeedback, Page,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitFeedbackResponse {
    pub message: String,
    pub feedback: Feedback,
}

/// Raw dashboard query string
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub email: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    fn to_query(&self) -> Result<FeedbackQuery, ApiError> {
        Ok(FeedbackQuery::from_params(
            self.page.as_deref(),
            self.limit.as_deref(),
            self.category.as_deref(),
            self.sentiment.as_deref(),
            self.search.as_deref(),
        )?)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `POST /api/feedback/submit` (public)
pub async fn submit_feedback(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<SubmitFeedbackResponse>), ApiError> {
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required"))?;

    let category = match non_empty(req.category) {
        Some(raw) => raw.parse::<Category>()?,
        None => Category::General,
    };

    let analysis = state.analyzer.analyze(&message);

    let feedback = state
        .storage
        .create_feedback(&NewFeedback {
            name: non_empty(req.name),
            email: non_empty(req.email).map(|e| normalize_email(&e)),
            message,
            category,
            sentiment: analysis.sentiment,
            confidence_score: analysis.confidence,
            created_at: Utc::now(),
        })
        .await?;

    info!(
        "Feedback {} submitted ({}, {}, confidence {:.2})",
        feedback.id, feedback.category, feedback.sentiment, feedback.confidence_score
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            message: "Feedback submitted successfully".to_string(),
            feedback,
        }),
    ))
}

/// `GET /api/feedback/user`: the caller's own feedback
///
/// `email` defaults to the token's email; only admins may ask for another.
pub async fn user_feedback(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Page<Feedback>>, ApiError> {
    let email = match non_empty(params.email.clone()) {
        Some(requested) => {
            let requested = normalize_email(&requested);
            if requested != normalize_email(&claims.email) && !claims.role.is_admin() {
                warn!(
                    "Account {} asked for feedback of another email",
                    claims.id
                );
                return Err(ApiError::forbidden(
                    "Access denied. You can only view your own feedback.",
                ));
            }
            requested
        }
        None => normalize_email(&claims.email),
    };

    let query = params.to_query()?;
    debug!("Listing feedback for account {} ({:?})", claims.id, query);

    let page = state
        .storage
        .list_feedback(&FeedbackScope::Email(email), &query)
        .await?;
    Ok(Json(page))
}

/// `GET /api/feedback/admin`: every record
pub async fn admin_feedback(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Page<Feedback>>, ApiError> {
    let query = params.to_query()?;
    debug!("Admin {} listing feedback ({:?})", claims.id, query);

    let page = state.storage.list_feedback(&FeedbackScope::All, &query).await?;
    Ok(Json(page))
}

/// `GET /api/feedback/analytics`: dashboard overview
pub async fn feedback_analytics(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<FeedbackAnalytics>, ApiError> {
    let analytics = state.storage.feedback_analytics(Utc::now()).await?;
    Ok(Json(analytics))
}
