use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::bridge::endpoint::{self, EndpointSpec};
use crate::bridge::executor::{CliExecutor, OutcomeStatus};
use crate::config::Config;

type SharedState = Arc<AppState>;

#[derive(Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub executor: CliExecutor,
    endpoints: Vec<EndpointSpec>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_endpoints(config, endpoint::ENDPOINTS.to_vec())
    }

    /// Same state with a custom endpoint table. Tests use this to shrink
    /// the per-endpoint timeouts to something waitable.
    pub fn with_endpoints(config: Arc<Config>, endpoints: Vec<EndpointSpec>) -> Self {
        let executor = CliExecutor::new(config.cli_path.clone());
        Self {
            config,
            executor,
            endpoints,
        }
    }

    fn endpoint(&self, route: &str) -> Option<&EndpointSpec> {
        self.endpoints.iter().find(|spec| spec.route == route)
    }
}

// Health check
async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "version": crate::VERSION}))
}

/// The single handler behind every `POST /api/cli/{name}` route. Looks the
/// endpoint up in the descriptor table, validates the body into an argument
/// vector, runs the CLI once and shapes the envelope.
async fn cli_command(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let Some(spec) = state.endpoint(&name).copied() else {
        return failure(StatusCode::NOT_FOUND, format!("unknown command: {name}"));
    };

    // An absent body is the same as `{}` (the generate endpoint posts none).
    let body: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return failure(StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}"));
            }
        }
    };

    run_endpoint(&state, &spec, &body).await
}

async fn run_endpoint(state: &AppState, spec: &EndpointSpec, body: &Value) -> Response {
    let args = match endpoint::build_args(spec, body) {
        Ok(args) => args,
        Err(message) => {
            // Validation failures never reach the executor.
            return failure(StatusCode::BAD_REQUEST, message);
        }
    };

    let outcome = match state.executor.run(spec.subcommand, &args, spec.timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("failed to run {}: {:#}", spec.subcommand, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"));
        }
    };

    match outcome.status {
        OutcomeStatus::Success => match serde_json::from_str::<Value>(&outcome.stdout) {
            Ok(data) => Json(json!({
                "success": true,
                "output": outcome.stdout,
                "data": data,
            }))
            .into_response(),
            Err(e) => {
                error!("{} produced unparseable output: {}", spec.subcommand, e);
                failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("CLI output is not valid JSON: {e}"),
                )
            }
        },
        OutcomeStatus::Failed => {
            let message = if outcome.stderr.trim().is_empty() {
                match outcome.exit_code {
                    Some(code) => format!("{} exited with status {}", spec.subcommand, code),
                    None => format!("{} was terminated by a signal", spec.subcommand),
                }
            } else {
                outcome.stderr
            };
            error!("{} failed: {}", spec.subcommand, message.trim());
            failure(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        OutcomeStatus::Timeout => {
            error!(
                "{} timed out after {}s",
                spec.subcommand,
                spec.timeout.as_secs()
            );
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "{} timed out after {} seconds",
                    spec.subcommand,
                    spec.timeout.as_secs()
                ),
            )
        }
    }
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"success": false, "error": error.into()})),
    )
        .into_response()
}

pub fn create_router(state: SharedState) -> Router {
    // Anything that is not the API is the browser test suite: `/` resolves
    // to index.html, other paths to files under the static directory.
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/api/cli/{name}", post(cli_command))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: Config, port: u16) -> Result<()> {
    let cfg = Arc::new(config);
    let state = Arc::new(AppState::new(cfg.clone()));

    info!("CLI path: {}", cfg.cli_path.display());
    info!("test suite dir: {}", cfg.static_dir.display());
    for spec in endpoint::ENDPOINTS {
        info!("  POST /api/cli/{}", spec.route);
    }

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("bridge listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
