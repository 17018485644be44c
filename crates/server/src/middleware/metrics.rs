//! Prometheus metrics collection middleware
//!
//! Records `http_requests_total` (counter) and `http_request_duration_seconds`
//! (histogram) for every request, labelled by method, route and status.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Every path the router serves. Anything else is labelled `unmatched`.
const KNOWN_ROUTES: [&str; 5] = [
    "/api/diagnosis",
    "/api/diagnosis/status",
    "/api/diagnosis/result",
    "/health",
    "/metrics",
];

/// Route label for a request path, bounded to the known routes
fn route_label(path: &str) -> &'static str {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };
    KNOWN_ROUTES
        .iter()
        .find(|route| **route == path)
        .copied()
        .unwrap_or("unmatched")
}

/// Middleware that records request count and duration metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_label(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => route,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    // Result requests include the poll wait
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => route
    )
    .record(duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_routes_keep_their_label() {
        assert_eq!(route_label("/api/diagnosis/result"), "/api/diagnosis/result");
        assert_eq!(route_label("/api/diagnosis/"), "/api/diagnosis");
        assert_eq!(route_label("/health"), "/health");
    }

    #[test]
    fn unknown_paths_share_one_label() {
        assert_eq!(route_label("/api/diagnosis/6f1c2d4e-8a9b-4c3d-9e8f-0123456789ab"), "unmatched");
        assert_eq!(route_label("/wp-admin"), "unmatched");
        assert_eq!(route_label("/"), "unmatched");
    }
}
