//! HTTP route tests driven through the router without a socket.
//!
//! WebSocket behaviour is covered by the workspace integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use vaultdrop_signal::{ServerConfig, SignalServer};

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_http_session_and_health() {
    let server = SignalServer::new(ServerConfig::default()).unwrap();
    let app = server.router();

    let response = app
        .clone()
        .oneshot(Request::post("/api/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = json_body(response).await;
    assert_eq!(created["sessionId"].as_str().unwrap().len(), 32);

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health = json_body(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["server"], "vaultdrop-signal");
    assert_eq!(health["sessions"], 1);
    assert_eq!(server.registry().session_count(), 1);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = SignalServer::new(ServerConfig::default()).unwrap();
    let response = server
        .router()
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
