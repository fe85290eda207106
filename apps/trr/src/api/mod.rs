//! # TRR HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /trrs`, `POST /trrs` - List and create TRRs
//! - `GET|PATCH|DELETE /trrs/{id}` - Read, update, archive one TRR
//! - `POST /trrs/{id}/transition` - Lifecycle transition
//! - `POST /trrs/{id}/approvals` - SDW approval decision
//! - `POST /trrs/{id}/advance` - Advance the SDW stage
//! - `GET /trrs/{id}/dor` - Readiness, with assist opinion when configured
//! - `GET /trrs/{id}/sdw` - Approval progress
//! - `GET /trrs/{id}/risk` - Risk assessment as of now
//! - `GET /trrs/{id}/suggestions/{field}` - Field suggestion
//! - `POST /validation-stage` - Map (phase, status) to a validation stage
//! - `POST /metrics-view` - Playbook metrics view
//! - `POST /risk` - Score arbitrary risk inputs
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TRR_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TRR_RATE_LIMIT`: Requests per second (default: 100, 0 disables the limiter)
//! - `TRR_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use middleware::{
    DEFAULT_RATE_LIMIT, RATE_LIMIT_ENV, create_rate_limiter, get_rate_limit_from_env,
};
pub use types::{
    ApiError, CreateTrrRequest, ErrorResponse, HealthResponse, ListQuery, ListResponse,
    MetricsViewRequest, UpdateTrrRequest, ValidationStageRequest, ValidationStageResponse,
    VersionQuery,
};

use crate::assist::AssistClient;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use trr_core::{StorageBackend, TrrEngine, TrrError};

/// Maximum request body size (2 MB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// The engine shared by every request.
pub type SharedEngine = Arc<RwLock<TrrEngine<StorageBackend>>>;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    /// Optional suggestion service; `None` disables augmentation.
    pub assist: Option<AssistClient>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: TrrEngine<StorageBackend>) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            assist: None,
        }
    }

    #[must_use]
    pub fn with_assist(mut self, assist: Option<AssistClient>) -> Self {
        self.assist = assist;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build CORS layer from `TRR_CORS_ORIGINS`.
///
/// - `*`: allows all origins
/// - unset: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("TRR_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (TRR_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in TRR_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No TRR_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set {} to enable authentication.",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/trrs",
            get(handlers::list_handler).post(handlers::create_handler),
        )
        .route(
            "/trrs/{id}",
            get(handlers::get_handler)
                .patch(handlers::update_handler)
                .delete(handlers::delete_handler),
        )
        .route("/trrs/{id}/transition", post(handlers::transition_handler))
        .route("/trrs/{id}/approvals", post(handlers::approval_handler))
        .route("/trrs/{id}/advance", post(handlers::advance_handler))
        .route("/trrs/{id}/dor", get(handlers::dor_handler))
        .route("/trrs/{id}/sdw", get(handlers::sdw_handler))
        .route("/trrs/{id}/risk", get(handlers::trr_risk_handler))
        .route(
            "/trrs/{id}/suggestions/{field}",
            get(handlers::suggestion_handler),
        )
        .route(
            "/validation-stage",
            post(handlers::validation_stage_handler),
        )
        .route("/metrics-view", post(handlers::metrics_view_handler))
        .route("/risk", post(handlers::risk_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), TrrError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TrrError::Storage(format!("Bind failed: {}", e)))?;

    tracing::info!("TRR HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TrrError::Storage(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
