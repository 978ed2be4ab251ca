use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

use super::request_id::REQUEST_ID_HEADER;

/// Emit one `metrics` event per request with its status and latency.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(req).await;

    info!(
        target: "metrics",
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        request_id = %request_id,
        "request_completed"
    );

    response
}
