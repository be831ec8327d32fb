//! # Query Routes
//!
//! The HTTP surface: one streaming query endpoint plus health and
//! status. Pre-flight failures (parse, validation, missing encoder,
//! duplicate admission) are reported with proper status codes; once
//! the response stream is open, a failure truncates the body.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use crate::admission::{AdmissionRegistry, QueryStats};
use crate::datastore::Datastore;
use crate::exec::{self, ExecPolicy};
use crate::observability::{Logger, MetricsRegistry};
use crate::output::{stream_entities, Compression, FormatRegistry, OutputError};
use crate::query;

use super::errors::{ApiError, ApiResult};

/// Shared state for the query endpoint.
#[derive(Clone)]
pub struct AppState {
    pub admission: AdmissionRegistry,
    pub datastore: Arc<dyn Datastore>,
    pub formats: Arc<dyn FormatRegistry>,
    pub policy: ExecPolicy,
    pub metrics: Arc<MetricsRegistry>,
}

/// Builds the service router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/0.6/:query", get(query_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.metrics.snapshot();
    Json(json!({
        "metrics": snapshot,
        "active_queries": state.admission.active_count(),
    }))
}

/// Bridges the blocking pipeline into the async response body.
///
/// A send failure means the client went away; the resulting broken-pipe
/// error aborts the pipeline, which then releases the entity stream.
struct ChannelWriter {
    tx: mpsc::Sender<Result<Vec<u8>, io::Error>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response stream closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn query_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(path): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Response> {
    // `map?bbox=...` arrives split across path and query string
    let query_text = match raw_query {
        Some(raw) => format!("{path}?{raw}"),
        None => path,
    };
    let origin = addr.ip().to_string();

    state.metrics.increment_queries_received();
    let mut stats = QueryStats::begin();
    stats.received_query(&query_text, &origin);
    let request_id = stats.request_id().to_string();
    Logger::info(
        "QUERY_RECEIVED",
        &[
            ("origin", origin.as_str()),
            ("query", query_text.as_str()),
            ("request_id", request_id.as_str()),
        ],
    );

    let descriptor = query::parse(&query_text).map_err(|err| {
        state.metrics.increment_parse_failures();
        Logger::warn(
            "QUERY_PARSE_FAILED",
            &[
                ("origin", origin.as_str()),
                ("query", query_text.as_str()),
                ("reason", &err.to_string()),
            ],
        );
        ApiError::from(err)
    })?;

    let format = descriptor.output_format();
    if !state.formats.has_encoder(format) {
        let err = ApiError::Output(OutputError::NoEncoder(format));
        stats.error(err.to_string());
        state.metrics.increment_queries_failed();
        Logger::warn(
            "QUERY_FORMAT_UNSUPPORTED",
            &[
                ("origin", origin.as_str()),
                ("query", query_text.as_str()),
                ("format", format.as_str()),
            ],
        );
        return Err(err);
    }

    exec::validate(&descriptor, &state.policy)?;

    // Admission comes after validation so a rejected query never
    // occupies the duplicate slot.
    let ticket = state.admission.admit(&query_text, &origin).map_err(|err| {
        state.metrics.increment_duplicates_rejected();
        Logger::warn(
            "QUERY_DUPLICATE_REJECTED",
            &[("origin", origin.as_str()), ("query", query_text.as_str())],
        );
        ApiError::from(err)
    })?;
    state.metrics.increment_queries_admitted();

    let compression = Compression::negotiate(
        headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|value| value.to_str().ok()),
    );
    let content_type = format.content_type();

    let (body_tx, body_rx) = mpsc::channel::<Result<Vec<u8>, io::Error>>(16);
    let (open_tx, open_rx) = oneshot::channel::<Result<(), ApiError>>();

    let datastore = Arc::clone(&state.datastore);
    let formats = Arc::clone(&state.formats);
    let metrics = Arc::clone(&state.metrics);

    tokio::task::spawn_blocking(move || {
        // The ticket lives for the whole pipeline; dropping it at any
        // exit releases the duplicate slot.
        let _ticket = ticket;

        stats.start_db_query();
        let entity_stream = match exec::open_stream(&descriptor, datastore.as_ref()) {
            Ok(entity_stream) => {
                let _ = open_tx.send(Ok(()));
                entity_stream
            }
            Err(err) => {
                metrics.increment_queries_failed();
                stats.error(err.to_string());
                let _ = open_tx.send(Err(ApiError::from(err)));
                return;
            }
        };

        stats.start_serialization();
        let writer = ChannelWriter { tx: body_tx };
        match stream_entities(entity_stream, format, formats.as_ref(), writer, compression) {
            Ok(count) => {
                stats.entities_serialized(count);
                stats.complete();
                metrics.increment_queries_completed();
                metrics.add_entities_streamed(count);
                Logger::info(
                    "QUERY_COMPLETED",
                    &[
                        ("db_ms", &stats.db_millis().unwrap_or(0).to_string()),
                        ("entities", &count.to_string()),
                        ("request_id", &stats.request_id().to_string()),
                        (
                            "serialize_ms",
                            &stats.serialization_millis().unwrap_or(0).to_string(),
                        ),
                    ],
                );
            }
            Err(err) => {
                stats.error(err.to_string());
                metrics.increment_queries_failed();
                Logger::error(
                    "QUERY_STREAM_FAILED",
                    &[
                        ("reason", &err.to_string()),
                        ("request_id", &stats.request_id().to_string()),
                    ],
                );
            }
        }
    });

    match open_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(err),
        Err(_) => {
            return Err(ApiError::Internal(
                "query worker exited before opening the stream".to_string(),
            ))
        }
    }

    let body = Body::from_stream(stream::unfold(body_rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(encoding) = compression.content_encoding() {
        response = response.header(header::CONTENT_ENCODING, encoding);
    }
    response
        .body(body)
        .map_err(|err| ApiError::Internal(err.to_string()))
}
