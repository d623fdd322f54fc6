use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies at or above this size are never buffered for logging.
const MAX_LOGGED_BODY: u64 = 1024;

/// Tag each request with a trace id (taken from `x-trace-id` when it is a
/// UUID) and log method, path, small JSON bodies, status and latency inside
/// an `http_request` span. The id is echoed back on the response.
pub async fn trace_middleware(req: Request, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (mut parts, body) = req.into_parts();
        let response = match log_body("request", &parts.headers, body).await {
            Ok(body) => {
                if let Some(value) = &trace_header {
                    parts.headers.insert(X_TRACE_ID, value.clone());
                }
                next.run(Request::from_parts(parts, body)).await
            }
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                ServerError::BadRequest("Failed to read request body".into()).into_response()
            }
        };

        let (parts, body) = response.into_parts();
        let (mut parts, body) = match log_body("response", &parts.headers, body).await {
            Ok(body) => (parts, body),
            Err(e) => ServerError::Internal(format!("failed to read response body: {e}"))
                .into_response()
                .into_parts(),
        };
        if let Some(value) = trace_header {
            parts.headers.insert(X_TRACE_ID, value);
        }

        info!(
            status = parts.status.as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        Response::from_parts(parts, body)
    }
    .instrument(span)
    .await
}

/// Log a small JSON body verbatim and pass everything else through untouched
/// so large image uploads are never copied. Fails only when a small JSON body
/// cannot be read.
async fn log_body(direction: &str, headers: &HeaderMap, body: Body) -> Result<Body, axum::Error> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let is_json = content_type.contains("application/json");

    match body.size_hint().exact() {
        Some(0) => Ok(body),
        Some(len) if is_json && len < MAX_LOGGED_BODY => {
            let bytes = body.collect().await?.to_bytes();
            if let Ok(text) = std::str::from_utf8(&bytes) {
                info!("{direction} body: {text}");
            }
            Ok(Body::from(bytes))
        }
        size => {
            info!("{direction} body: [skipped: type={content_type}, size={size:?}]");
            Ok(body)
        }
    }
}
