//! Route handlers, one module per resource

pub mod analytics;
pub mod auth;
pub mod feedback;
pub mod system;
