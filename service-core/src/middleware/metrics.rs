use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = route_label(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();

    let labels = [("method", method), ("path", path), ("status", status)];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    response
}

/// SPA paths are unbounded, so everything outside `/api` shares one label.
fn route_label(path: &str) -> String {
    if path.starts_with("/api/") {
        path.to_string()
    } else {
        "static".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::route_label;

    #[test]
    fn static_paths_collapse_into_one_label() {
        assert_eq!(route_label("/about/team"), "static");
        assert_eq!(route_label("/api/health"), "/api/health");
    }
}
