// Copyright 2026 Inscriptor Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST shim over the subscription engine.
//!
//! A thin request/response adapter: every endpoint maps 1:1 to an engine
//! operation on the shared [`Orchestrator`]. Validation failures are 400,
//! unknown tasks 404, accepted submissions 202 with the task id to poll.

use crate::error::EngineError;
use crate::task::{Orchestrator, SubscribeRequest};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the axum router with all REST endpoints.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/sites", get(sites))
        .route("/subscribe", post(subscribe))
        .route("/subscribe/:task_id", get(task_status))
        .layer(cors)
        .with_state(orchestrator)
}

/// Start serving on the given port until the process exits.
pub async fn start(port: u16, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let app = router(orchestrator);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Newsletter subscription engine is running"
    }))
}

async fn sites(State(orchestrator): State<Arc<Orchestrator>>) -> Json<Value> {
    let registry = orchestrator.registry();
    let details: Value = registry
        .site_details()
        .into_iter()
        .map(|(name, patterns)| (name.to_string(), json!(patterns)))
        .collect::<serde_json::Map<String, Value>>()
        .into();
    Json(json!({
        "supported_sites": registry.supported_sites(),
        "site_details": details,
    }))
}

async fn subscribe(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<SubscribeRequest>,
) -> (StatusCode, Json<Value>) {
    let total = request.emails.len();
    let url = request.url.clone();
    match orchestrator.submit(request).await {
        Ok(task_id) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "task_id": task_id,
                "message": format!("Subscription task created for {total} email(s)"),
                "status": "queued",
                "url": url,
                "total_emails": total,
            })),
        ),
        Err(e) => (error_status(&e), Json(json!({ "error": e.to_string() }))),
    }
}

async fn task_status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(task_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match orchestrator.query(&task_id).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(serde_json::to_value(&snapshot).unwrap_or_else(|_| json!({}))),
        ),
        Err(e) => (error_status(&e), Json(json!({ "error": e.to_string() }))),
    }
}

fn error_status(error: &EngineError) -> StatusCode {
    match error {
        EngineError::Validation(_) | EngineError::UnsupportedSite(_) => StatusCode::BAD_REQUEST,
        EngineError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
