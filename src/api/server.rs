//! HTTP API server

use super::{
    error::{expose_error_detail, not_found},
    handlers::{analytics, auth, feedback, system},
    middleware::{api_rate_limit, auth_rate_limit},
    state::AppState,
};
use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Include internal error detail in 500 bodies
    pub expose_errors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 5000).into(),
            expose_errors: false,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create new API server
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build router
    pub fn build_router(state: AppState, expose_errors: bool) -> Router {
        let auth_routes = Router::new()
            .route("/signup", post(auth::signup))
            .route("/login", post(auth::login))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_rate_limit,
            ));

        let feedback_routes = Router::new()
            .route("/submit", post(feedback::submit_feedback))
            .route("/user", get(feedback::user_feedback))
            .route("/admin", get(feedback::admin_feedback))
            .route("/analytics", get(feedback::feedback_analytics));

        let analytics_routes = Router::new()
            .route("/sentiment", get(analytics::sentiment_stats))
            .route("/trend", get(analytics::sentiment_trend));

        // The general limiter covers everything registered before route_layer;
        // auth routes are nested afterwards so only their own limiter applies
        let api = Router::new()
            .nest("/feedback", feedback_routes)
            .nest("/analytics", analytics_routes)
            .route("/test-db", get(system::test_db))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                api_rate_limit,
            ))
            .nest("/auth", auth_routes);

        let router = Router::new()
            .route("/", get(system::welcome))
            .route("/health", get(system::health))
            .nest("/api", api)
            .fallback(not_found)
            .with_state(state);

        let router = if expose_errors {
            router.layer(middleware::from_fn(expose_error_detail))
        } else {
            router
        };

        router
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn serve(self) -> anyhow::Result<()> {
        for limiter in [&self.state.auth_limiter, &self.state.api_limiter] {
            info!(
                "Rate limit '{}': {} requests per {}s",
                limiter.name(),
                limiter.points(),
                limiter.window().as_secs()
            );
        }
        info!(
            "Tokens valid for {}h, bcrypt cost {}",
            self.state.tokens.ttl().num_hours(),
            self.state.passwords.cost()
        );

        let router = Self::build_router(self.state, self.config.expose_errors);

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", self.config.addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("API server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
