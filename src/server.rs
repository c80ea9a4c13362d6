//! HTTP gateway
//!
//! Thin transport shell around [`ServiceControl`]:
//!
//! | method | path        | body                          |
//! |--------|-------------|-------------------------------|
//! | GET    | `/`         | static index page             |
//! | GET    | `/services` | `{"services": [unit, ...]}`   |
//! | GET    | `/logs`     | `{"logs": [line, ...]}`       |
//! | POST   | `/service`  | `{"result": status or text}`  |
//!
//! `OPTIONS` on any path answers an empty 200, and every response carries
//! permissive CORS headers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::control::{ActionError, ActionRequest, ServiceControl};
use crate::protocol::{ActionResponse, ErrorBody, LogsQuery, LogsResponse, ServicesResponse};
use crate::runner::CommandRunner;

/// Shared by all handlers. Holds no mutable state.
pub struct AppState<R> {
    pub control: ServiceControl<R>,
    pub index: PathBuf,
}

type Shared<R> = Arc<AppState<R>>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    CommandFailed(String),

    #[error("Endpoint not found")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::CommandFailed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::InvalidRequest(msg) => Self::BadRequest(msg),
            ActionError::CommandFailed { output, .. } => Self::CommandFailed(output),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the gateway router around a service controller
pub fn router<R: CommandRunner>(control: ServiceControl<R>, index: PathBuf) -> Router {
    let state: Shared<R> = Arc::new(AppState { control, index });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_page::<R>).fallback(not_found))
        .route("/services", get(list_services::<R>).fallback(not_found))
        .route("/logs", get(logs::<R>).fallback(not_found))
        .route("/service", post(service_action::<R>).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(access))
        .layer(cors)
}

/// Bind the configured address and serve until SIGINT/SIGTERM
pub async fn serve<R: CommandRunner>(config: &Config, control: ServiceControl<R>) -> std::io::Result<()> {
    let app = router(control, config.index.clone());
    let listener = TcpListener::bind(config.socket_addr()).await?;
    log::info!("sysweb listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("sysweb stopped");
    Ok(())
}

async fn shutdown_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate => {}
    }
    log::info!("Shutdown requested, draining connections");
}

/// Answers bare `OPTIONS` requests and logs every request
async fn access(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    log::info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn index_page<R: CommandRunner>(State(state): State<Shared<R>>) -> Result<Html<Vec<u8>>, ApiError> {
    let page = tokio::fs::read(&state.index)
        .await
        .map_err(|e| ApiError::Internal(format!("{}: {}", state.index.display(), e)))?;
    Ok(Html(page))
}

async fn list_services<R: CommandRunner>(
    State(state): State<Shared<R>>,
) -> Result<Json<ServicesResponse>, ApiError> {
    let services = state.control.list_units().await?;
    Ok(Json(ServicesResponse { services }))
}

async fn logs<R: CommandRunner>(
    State(state): State<Shared<R>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let logs = state.control.journal(query.service.as_deref()).await?;
    Ok(Json(LogsResponse { logs }))
}

async fn service_action<R: CommandRunner>(
    State(state): State<Shared<R>>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let request: ActionRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    let result = state.control.dispatch(&request).await?;
    Ok(Json(ActionResponse { result }))
}
