//! Zytra Web Server
//!
//! Axum-based JSON API behind the Zytra dashboard.
//!
//! Each browser session gets its own [`SessionContext`](zytra_core::SessionContext),
//! addressed by the `x-zytra-session` header. Event endpoints answer with the
//! notice and the re-rendered view; rejected events map to HTTP error statuses.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Upload size limits
//! - Security headers (CSP, nosniff, frame denial)
//! - Sanitized error responses

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use zytra_core::{Config, CredentialStore, InMemoryCredentialStore};

mod handlers;

pub use handlers::SessionManager;

/// Header carrying the session id
pub const SESSION_HEADER: &str = "x-zytra-session";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Upload limit per request in bytes
    pub max_upload_size: usize,
    /// Initial forecast horizon shown on the dashboard
    pub default_horizon: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_size: config.server.max_upload_mb * 1024 * 1024,
            default_horizon: config.forecast.default_horizon,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub sessions: SessionManager,
    pub config: ServerConfig,
}

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Read the session id header
pub fn get_session_id(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| AppError::unauthorized("Missing session header"))
}

/// Create the application router
pub fn create_router(
    store: Arc<dyn CredentialStore>,
    static_dir: Option<&Path>,
    config: ServerConfig,
) -> Router {
    let upload_limit = config.max_upload_size;
    let state = Arc::new(AppState {
        store,
        sessions: SessionManager::new(config.default_horizon),
        config,
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Sessions
        .route(
            "/session",
            post(handlers::create_session).delete(handlers::delete_session),
        )
        .route("/view", get(handlers::get_view))
        // Accounts
        .route("/auth/login", post(handlers::login))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/reset/request", post(handlers::request_reset))
        .route("/auth/reset/verify", post(handlers::verify_reset))
        .route("/auth/reset/submit", post(handlers::submit_reset))
        // Files
        .route(
            "/files",
            get(handlers::list_files)
                .post(handlers::upload_files)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/select", post(handlers::select_file))
        .route("/files/preview", get(handlers::preview_file))
        // Analytics
        .route("/chart", post(handlers::generate_chart))
        .route("/forecast", post(handlers::generate_forecast))
        .route("/report", get(handlers::download_report));

    // Restrictive default: only allow same-origin
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SESSION_HEADER)]);

    // CSP: restrict scripts to same-origin, allow inline styles, allow blob: for chart images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Build the credential store from config
pub fn build_store(config: &Config, seed_admin: bool) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let mut auth = config.auth.clone();
    auth.seed_admin = auth.seed_admin && seed_admin;
    if auth.seed_admin {
        warn!(
            email = %auth.admin_email,
            "Seeding default admin account - change its password before exposing the server"
        );
    }
    Ok(Arc::new(InMemoryCredentialStore::from_config(&auth)?))
}

/// Start the server
pub async fn serve(config: &Config, seed_admin: bool) -> anyhow::Result<()> {
    let store = build_store(config, seed_admin)?;
    let static_dir = config.server.static_dir.as_deref();
    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
    }

    let app = create_router(store, static_dir, ServerConfig::from_config(config));
    let addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            message: msg.to_string(),
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "unauthorized",
            message: msg.to_string(),
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: msg.to_string(),
        }
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            kind: "payload_too_large",
            message: msg.to_string(),
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: msg.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<zytra_core::Error> for AppError {
    fn from(err: zytra_core::Error) -> Self {
        use zytra_core::Error;

        let status = match &err {
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::DuplicateEmail | Error::DuplicateDisplayName => StatusCode::CONFLICT,
            Error::InvalidInput(_)
            | Error::Csv(_)
            | Error::Parse(_)
            | Error::InvalidDate(_)
            | Error::InvalidState(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ForecastFitting { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Io(_) | Error::Config(_) | Error::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            // Keep details in the log, not the response
            error!(error = %err, "Internal error");
            return Self {
                status,
                kind: err.kind(),
                message: "An internal error occurred".to_string(),
            };
        }

        Self {
            status,
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        }));

        (self.status, body).into_response()
    }
}
