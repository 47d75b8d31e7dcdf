//! HTTP transport for a remote host.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /methods`: the advertised method table.
//! - `POST /:method`: call a method. Body = JSON arguments (may be empty).
//!   `async` methods answer with a JSON body; `readable` methods stream
//!   newline-delimited JSON, one item per line.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kvmodel::{remote, AttachExt, MemoryStore};
//!
//! let users = Arc::new(MemoryStore::new()).attach::<User>()?;
//! let host = Arc::new(remote::RemoteHost::new(users));
//!
//! // Get the router to compose with other axum routes
//! let app = remote::router(host.clone());
//!
//! // Or serve directly
//! remote::serve(host, "0.0.0.0:3000").await?;
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_stream::StreamExt;

use super::error::RemoteError;
use super::host::{RemoteHost, RemoteRequest, RemoteResponse};
use crate::methods::MethodKind;
use crate::model::Model;
use crate::store::{EntryStream, KvStore};

/// Build an axum `Router` serving the host's methods.
pub fn router<M, S>(host: Arc<RemoteHost<M, S>>) -> Router
where
    M: Model,
    S: KvStore + ?Sized + 'static,
{
    Router::new()
        .route("/methods", get(methods_handler::<M, S>))
        .route("/:method", post(method_handler::<M, S>))
        .with_state(host)
}

/// Serve the host over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve<M, S>(host: Arc<RemoteHost<M, S>>, addr: &str) -> Result<(), std::io::Error>
where
    M: Model,
    S: KvStore + ?Sized + 'static,
{
    let app = router(host);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!(addr, model = M::MODEL_NAME, "serving remote host over http");
    axum::serve(listener, app).await
}

/// `GET /methods`: returns `{ "get": { "type": "async" }, ... }`.
async fn methods_handler<M, S>(State(host): State<Arc<RemoteHost<M, S>>>) -> impl IntoResponse
where
    M: Model,
    S: KvStore + ?Sized + 'static,
{
    Json(host.methods().clone())
}

/// `POST /:method`: dispatch by the method's advertised kind.
async fn method_handler<M, S>(
    State(host): State<Arc<RemoteHost<M, S>>>,
    Path(method): Path<String>,
    body: Bytes,
) -> Response
where
    M: Model,
    S: KvStore + ?Sized + 'static,
{
    let args = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(args) => args,
            Err(e) => return error_response(&RemoteError::from(e)),
        }
    };
    let request = RemoteRequest::new(method, args);

    if host.methods().kind(&request.method) == Some(MethodKind::Readable) {
        return match host.open(request) {
            Ok(items) => ndjson(items),
            Err(e) => error_response(&e),
        };
    }

    let response = host.respond(request).await;
    into_response(response)
}

fn ndjson(items: EntryStream) -> Response {
    let lines = items.map(|item| {
        let line = item
            .map_err(RemoteError::from)
            .and_then(|item| serde_json::to_value(&item).map_err(RemoteError::from))
            .unwrap_or_else(|e| json!({ "error": e.to_string(), "code": e.code() }));
        Ok::<_, Infallible>(format!("{}\n", line))
    });
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

fn error_response(err: &RemoteError) -> Response {
    into_response(RemoteResponse::error(err))
}

fn into_response(response: RemoteResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
