//! HTTP server exposing `/probe`, `/metrics` and the landing page.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::probe::Prober;
use crate::registry::{ExporterMetrics, OPENMETRICS_CONTENT_TYPE, ProbeOutcome};
use crate::request::ProbeRequest;

const INDEX_HTML: &str = r#"<html>
<head><title>Json Exporter</title></head>
<body>
<h1>Json Exporter</h1>
<p><a href="/probe">Run a probe</a></p>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    prober: Arc<Prober>,
    metrics: Arc<ExporterMetrics>,
}

impl AppState {
    pub fn new(prober: Prober, metrics: Arc<ExporterMetrics>) -> Self {
        Self {
            prober: Arc::new(prober),
            metrics,
        }
    }
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/probe", get(probe_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn text_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, format!("{}\n", message)).into_response()
}

fn metrics_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response()
}

/// Handler for `/probe?target=<url>&jsonpath=<expr>[&jsonpath=...]`.
///
/// Exactly one response is written. Path failures keep the 200 status and
/// show up as `probe_success 0`; only request-level failures change it.
async fn probe_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let _in_flight = state.metrics.start_probe();

    let request = match ProbeRequest::from_query(&params) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected probe request");
            state.metrics.record(ProbeOutcome::InvalidRequest, None);
            return text_response(e.status_code(), e);
        }
    };

    let report = match state.prober.probe(&request).await {
        Ok(report) => report,
        Err(e) => {
            let outcome = if e.is_invalid_request() {
                ProbeOutcome::InvalidRequest
            } else {
                ProbeOutcome::BodyReadFailure
            };
            state.metrics.record(outcome, None);
            return text_response(e.status_code(), e);
        }
    };

    let (status, outcome) = match &report.fetch_error {
        Some(e) => (e.status_code(), ProbeOutcome::FetchFailure),
        None if report.success() => (StatusCode::OK, ProbeOutcome::Success),
        None => (StatusCode::OK, ProbeOutcome::PathFailure),
    };
    state.metrics.record(outcome, Some(report.duration));

    match report.metrics.render() {
        Ok(body) => metrics_response(status, body),
        Err(e) => {
            error!(error = %e, "Failed to render probe metrics");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics")
        }
    }
}

/// Handler for the exporter's own `/metrics`.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => metrics_response(StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to render exporter metrics");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics")
        }
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    state: AppState,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(state: AppState, listen_addr: SocketAddr) -> Self {
        Self { state, listen_addr }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.state);
        let addr = listener.local_addr()?;

        info!(addr = %addr, "HTTP server listening");

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::fetch::TargetFetcher;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn make_state() -> AppState {
        let fetcher = TargetFetcher::new(&ProbeConfig::default()).unwrap();
        AppState::new(Prober::new(fetcher), Arc::new(ExporterMetrics::new()))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let router = create_router(make_state());

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<h1>Json Exporter</h1>"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = create_router(make_state());

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_probe_missing_target() {
        let router = create_router(make_state());

        let response = router
            .oneshot(
                Request::get("/probe?jsonpath=a.b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Target parameter is missing\n");
    }

    #[tokio::test]
    async fn test_probe_missing_jsonpath() {
        let router = create_router(make_state());

        let response = router
            .oneshot(
                Request::get("/probe?target=http%3A%2F%2Flocalhost%2Fx")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "The JsonPath to lookup\n");
    }

    #[tokio::test]
    async fn test_probe_duplicate_metric_name() {
        let router = create_router(make_state());

        let response = router
            .oneshot(
                Request::get("/probe?target=http://localhost/x&jsonpath=a.v&jsonpath=b.v")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Duplicate metric name 'v'"));
    }

    #[tokio::test]
    async fn test_probe_unreachable_target() {
        let state = make_state();
        let metrics = state.metrics.clone();
        let router = create_router(state);

        // Nothing listens on port 1
        let response = router
            .oneshot(
                Request::get("/probe?target=http://127.0.0.1:1/&jsonpath=a.b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_text(response).await;
        assert!(body.contains("probe_success 0"));
        assert!(body.contains("# TYPE b gauge"));
        assert_eq!(metrics.probe_count(ProbeOutcome::FetchFailure), 1);
    }

    #[tokio::test]
    async fn test_invalid_requests_are_counted() {
        let state = make_state();
        let metrics = state.metrics.clone();
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(Request::get("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("openmetrics-text"));

        let body = body_text(response).await;
        assert!(body.contains("json_exporter_probes_total{outcome=\"invalid_request\"} 1"));
        assert_eq!(metrics.in_flight(), 0);
    }
}
