use std::future::Future;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ErrorResponse, ServiceError, messages};
use crate::service::CatalogService;

const PREFIX: &str = "/podcasts";

#[derive(Clone)]
pub struct AppState {
    pub service: CatalogService,
    /// Deadline for a whole request, upstream and database calls included.
    pub request_timeout: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/podcasts", get(list_podcasts).fallback(method_fallback))
        .route(
            "/podcasts/sync",
            post(sync_podcasts).get(get_podcast_named_sync).fallback(method_fallback),
        )
        .route("/podcasts/{id}", get(get_podcast).fallback(method_fallback))
        .route("/podcasts/{id}/sync", post(sync_podcast_episodes).fallback(method_fallback))
        .fallback(route_fallback)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_podcasts(State(state): State<AppState>) -> Response {
    debug!("GET /podcasts");
    respond(state.request_timeout, state.service.get_podcasts()).await
}

async fn get_podcast(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    debug!(id = %id, "GET /podcasts/{{id}}");
    respond(state.request_timeout, state.service.get_podcast_by_id(&id)).await
}

/// `GET /podcasts/sync` is the `GET /podcasts/{id}` shape with id `sync`.
async fn get_podcast_named_sync(State(state): State<AppState>) -> Response {
    debug!(id = "sync", "GET /podcasts/{{id}}");
    respond(state.request_timeout, state.service.get_podcast_by_id("sync")).await
}

async fn sync_podcasts(State(state): State<AppState>) -> Response {
    debug!("POST /podcasts/sync");
    respond(state.request_timeout, state.service.sync_podcasts()).await
}

async fn sync_podcast_episodes(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    debug!(id = %id, "POST /podcasts/{{id}}/sync");
    respond(state.request_timeout, state.service.sync_podcast_episodes(&id)).await
}

/// Known path, unsupported method. GET and POST fall through to 404 because
/// the path shape belongs to the other verb.
async fn method_fallback(method: Method) -> Response {
    if method == Method::GET || method == Method::POST {
        not_found()
    } else {
        method_not_allowed()
    }
}

async fn route_fallback(method: Method, uri: Uri) -> Response {
    let under_prefix = uri.path() == PREFIX || uri.path().starts_with("/podcasts/");
    if under_prefix && method != Method::GET && method != Method::POST {
        method_not_allowed()
    } else {
        not_found()
    }
}

fn not_found() -> Response {
    envelope(StatusCode::NOT_FOUND, ErrorResponse::new(messages::ROUTE_NOT_FOUND, ""))
}

fn method_not_allowed() -> Response {
    envelope(StatusCode::METHOD_NOT_ALLOWED, ErrorResponse::new(messages::METHOD_NOT_ALLOWED, ""))
}

fn envelope(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Run a service call under the request deadline. Dropping the future on
/// expiry cancels any in-flight upstream or database call.
async fn respond<T, F>(deadline: Duration, call: F) -> Response
where
    T: Serialize,
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "request failed");
            // Every service failure, validation included, is a 500.
            envelope(StatusCode::INTERNAL_SERVER_ERROR, e.to_response())
        }
        Err(_) => {
            warn!(timeout = ?deadline, "request deadline exceeded");
            envelope(StatusCode::INTERNAL_SERVER_ERROR, ServiceError::Timeout(deadline).to_response())
        }
    }
}
