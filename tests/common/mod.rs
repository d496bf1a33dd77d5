//! Common test utilities

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

use botfleet::coordinator::{AppState, CoordinatorConfig, CoordinatorServer};

/// Server with the dispatcher off so tests can drain the queue themselves
pub fn test_server(queue_capacity: usize) -> CoordinatorServer {
    let config = CoordinatorConfig::builder()
        .queue_capacity(queue_capacity)
        .enable_dispatch(false)
        .enable_request_logging(false)
        .build()
        .expect("valid test config");

    CoordinatorServer::new(config).expect("server should build")
}

/// Router and the state behind it
#[allow(dead_code)]
pub fn test_router(queue_capacity: usize) -> (Router, AppState) {
    let server = test_server(queue_capacity);
    (server.build_router(), server.state())
}

/// Send one request through the router
pub async fn send(router: &Router, method: Method, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request");

    router.clone().oneshot(request).await.expect("router is infallible")
}

/// Collect a response body as text
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
