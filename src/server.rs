use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::{ApiSummarizeRequest, ApiSummaryResponse};
use focus_monitor::client::{ClientError, MonitorClient};
use focus_monitor::config::MonitorConfig;
use focus_monitor::session::Session;
use focus_monitor::Summarizer;

#[derive(Clone)]
struct AppState {
    client: MonitorClient,
    summarizer: Arc<Summarizer>,
}

pub fn router(client: MonitorClient, summarizer: Summarizer) -> Router {
    let state = AppState {
        client,
        summarizer: Arc::new(summarizer),
    };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/summarize", post(summarize_handler))
        .route("/api/students/:student_id/summary", get(student_summary_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &MonitorConfig, host: Option<String>, port: Option<u16>) -> Result<(), String> {
    let client = MonitorClient::from_config(&config.api).map_err(|err| err.to_string())?;
    let upstream = client.base_url().to_string();
    let app = router(client, Summarizer::new(config.summary.clone()));

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| format!("failed to bind server: {}", err))?;
    tracing::info!(%addr, %upstream, "serving engagement summaries");

    axum::serve(listener, app)
        .await
        .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn summarize_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiSummarizeRequest>,
) -> Json<ApiSummaryResponse> {
    let record_count = request.records.len();
    let result = state.summarizer.summarize(&request.records);
    Json(ApiSummaryResponse::from_result(result, request.student_id, record_count))
}

async fn student_summary_handler(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiSummaryResponse>, (StatusCode, String)> {
    let session = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(Session::from_authorization)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "missing bearer token".to_string(),
            )
        })?;

    let records = state
        .client
        .history_for_student(&session, &student_id)
        .await
        .map_err(upstream_error)?;

    let record_count = records.len();
    let result = state.summarizer.summarize(&records);
    Ok(Json(ApiSummaryResponse::from_result(
        result,
        Some(student_id),
        record_count,
    )))
}

fn upstream_error(err: ClientError) -> (StatusCode, String) {
    let status = match err.status() {
        Some(401) => StatusCode::UNAUTHORIZED,
        Some(404) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!(error = %err, "upstream history fetch failed");
    (status, err.to_string())
}
