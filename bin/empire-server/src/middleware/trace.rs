use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Attach a trace id to every request and log its latency and status.
///
/// The id is taken from the client's `x-trace-id` header when it parses as a
/// UUID, generated otherwise, and echoed back on the response.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        let mut req = req;
        req.headers_mut()
            .insert(X_TRACE_ID, trace_id.to_string().parse().unwrap());

        let mut response = next.run(req).await;

        response
            .headers_mut()
            .insert(X_TRACE_ID, trace_id.to_string().parse().unwrap());

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "request finished"
        );

        response
    }
    .instrument(span)
    .await
}
