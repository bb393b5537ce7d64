//! REST API for feedback submission, dashboards and analytics
//!
//! Provides:
//! - Public feedback submission
//! - Signup/login issuing bearer tokens
//! - User and admin feedback listings with filters and pagination
//! - Admin analytics
//! - Per-IP and per-user rate limiting

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
