//! HTTP surface
//!
//! Serves the dashboard page. Every request builds a fresh matrix against
//! the CI server; nothing is cached between requests.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::concourse::ConcourseClient;
use crate::config::DashboardSettings;
use crate::error::BoardError;
use crate::matrix::{build_matrix, MatrixQuery};
use crate::output::{render_message, render_page, PageOptions};

pub const UNAUTHORIZED_MESSAGE: &str = "You are not authorized. Please log in first.";

/// Everything a request needs, shared read-only between handlers.
pub struct Dashboard {
    pub client: ConcourseClient,
    pub settings: DashboardSettings,
    /// Team, pipeline, resource and jobs served at `/`
    pub default_query: MatrixQuery,
}

type SharedDashboard = Arc<Dashboard>;

/// Create the router with all endpoints
pub fn create_router(dashboard: Dashboard) -> Router {
    Router::new()
        .route("/", get(index))
        .route(
            "/api/v1/teams/{team}/pipelines/{pipeline}/resources/{resource}/progress",
            get(progress),
        )
        .route("/health", get(health_check))
        .with_state(Arc::new(dashboard))
}

/// Serves the dashboard on an already bound listener until the process is
/// stopped.
pub async fn serve(listener: TcpListener, dashboard: Dashboard) -> std::io::Result<()> {
    axum::serve(listener, create_router(dashboard)).await
}

/// Launches the system browser on `url` without blocking the server.
pub fn open_browser(url: String) {
    tokio::spawn(async move {
        match tokio::process::Command::new("open").arg(&url).status().await {
            Ok(status) if status.success() => info!("Opened {url} in the browser"),
            Ok(status) => warn!("Browser launcher exited with {status}"),
            Err(e) => warn!("Failed to launch browser: {e}"),
        }
    });
}

#[derive(Debug, Deserialize)]
struct ProgressParams {
    jobs: Option<String>,
}

/// GET /
async fn index(State(dashboard): State<SharedDashboard>) -> Result<Html<String>, PageError> {
    let query = dashboard.default_query.clone();
    render_dashboard(&dashboard, query).await
}

/// GET /api/v1/teams/{team}/pipelines/{pipeline}/resources/{resource}/progress?jobs=a|b|c
async fn progress(
    State(dashboard): State<SharedDashboard>,
    Path((team, pipeline, resource)): Path<(String, String, String)>,
    Query(params): Query<ProgressParams>,
) -> Result<Html<String>, PageError> {
    let jobs = params
        .jobs
        .as_deref()
        .map(parse_job_list)
        .unwrap_or_else(|| dashboard.default_query.jobs.clone());

    let query = MatrixQuery {
        team,
        pipeline,
        resource,
        jobs,
        limit: dashboard.settings.limit,
    };
    render_dashboard(&dashboard, query).await
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn render_dashboard(
    dashboard: &Dashboard,
    query: MatrixQuery,
) -> Result<Html<String>, PageError> {
    let settings = &dashboard.settings;

    let matrix = tokio::time::timeout(
        settings.request_timeout,
        build_matrix(&dashboard.client, &query, settings.max_in_flight),
    )
    .await
    .map_err(|_| BoardError::Timeout(settings.request_timeout))??;

    Ok(Html(render_page(
        &matrix,
        &PageOptions {
            pipeline: &query.pipeline,
            refresh_seconds: settings.refresh_seconds,
            stylesheets: &settings.stylesheets,
        },
    )))
}

/// Splits a `a|b|c` job list, ignoring blank entries.
pub fn parse_job_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|job| !job.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Request failure rendered as an HTML page
#[derive(Debug)]
struct PageError(BoardError);

impl From<BoardError> for PageError {
    fn from(err: BoardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BoardError::Unauthorized => {
                warn!("CI server rejected the saved token");
                (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string())
            }
            BoardError::Api { status, message } => {
                error!("CI API error {status}: {message}");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("The CI server answered with HTTP {status}: {message}"),
                )
            }
            BoardError::Timeout(after) => {
                error!("Dashboard timed out after {after:?}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("The CI server did not answer within {after:?}."),
                )
            }
            err @ (BoardError::Network(_) | BoardError::MalformedResponse(_)) => {
                error!("Failed to query the CI server: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Could not query the CI server: {err}"),
                )
            }
            err => {
                error!("Internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Html(render_message(&message))).into_response()
    }
}
