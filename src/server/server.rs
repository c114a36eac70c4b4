use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::error;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metrics::{metrics_handler, record_trigger_execution};
use super::{log_requests, state::*, ServerConfig};
use crate::background::TriggerOutcome;
use crate::jobs::Pipeline;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct TriggerBody {
    pub token: String,
    pub chain_id: Option<Uuid>,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

fn outcome_label(outcome: TriggerOutcome) -> &'static str {
    match outcome {
        TriggerOutcome::Unauthorized => "unauthorized",
        TriggerOutcome::Busy => "busy",
        TriggerOutcome::Cancelled => "cancelled",
        TriggerOutcome::Paused => "paused",
        TriggerOutcome::Empty => "empty",
        TriggerOutcome::Handled => "handled",
    }
}

/// Inbound trigger delivery. Replies with a bare acknowledgment for every
/// resolved outcome so callers cannot probe process state; only a bad token
/// is distinguishable.
async fn post_trigger(
    State(registry): State<GuardedRegistry>,
    Path(process_id): Path<String>,
    Json(body): Json<TriggerBody>,
) -> Response {
    let Some(process) = registry.get(&process_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match process.maybe_handle(&body.token, body.chain_id).await {
        Ok(TriggerOutcome::Unauthorized) => {
            record_trigger_execution(&process_id, "unauthorized");
            StatusCode::UNAUTHORIZED.into_response()
        }
        Ok(outcome) => {
            record_trigger_execution(&process_id, outcome_label(outcome));
            StatusCode::OK.into_response()
        }
        Err(err) => {
            error!("Trigger for {} failed: {:#}", process_id, err);
            record_trigger_execution(&process_id, "error");
            StatusCode::OK.into_response()
        }
    }
}

async fn run_import(State(pipeline): State<GuardedPipeline>) -> Response {
    match pipeline.run_import().await {
        Ok(()) => (StatusCode::OK, "Import started successfully!").into_response(),
        Err(err) => {
            error!("Failed to start import: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn reset_data(State(pipeline): State<GuardedPipeline>) -> Response {
    match pipeline.reset_data().await {
        Ok(()) => (StatusCode::OK, "Reset process has started!").into_response(),
        Err(err) => {
            error!("Failed to start reset: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_import_status(State(pipeline): State<GuardedPipeline>) -> Response {
    match pipeline.get_status() {
        Ok(status) => Json(status).into_response(),
        Err(err) => {
            error!("Failed to read import status: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn clear_import_status(State(pipeline): State<GuardedPipeline>) -> Response {
    match pipeline.clear_status() {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            error!("Failed to clear import status: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn make_app(config: ServerConfig, pipeline: Arc<Pipeline>, hash: String) -> Router {
    let registry = pipeline.registry();
    let state = ServerState {
        config,
        start_time: Instant::now(),
        pipeline,
        registry,
        hash,
    };

    let import_routes: Router = Router::new()
        .route("/run", post(run_import))
        .route("/reset", post(reset_data))
        .route("/status", get(get_import_status))
        .route("/status", delete(clear_import_status))
        .with_state(state.clone());

    let trigger_routes: Router = Router::new()
        .route("/{process_id}", post(post_trigger))
        .with_state(state.clone());

    let app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1/import", import_routes)
        .nest("/v1/trigger", trigger_routes);

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    pipeline: Arc<Pipeline>,
    config: ServerConfig,
    hash: String,
) -> Result<()> {
    let app = make_app(config.clone(), pipeline, hash);

    let metrics_app: Router = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.metrics_port)).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;

    Ok(axum::serve(listener, app).await?)
}
