//! # Passthrough Integration Tests
//!
//! Unmatched requests are forwarded to a live backend, served here by `wiremock`.

use http::Method;
use mock_backend::{HttpPassthrough, MockError, MockRequest, Passthrough, Record, RouterBuilder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_unmatched_request_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("results", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"user": {"gender": "female"}}]
        })))
        .mount(&server)
        .await;

    let passthrough = HttpPassthrough::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let router = RouterBuilder::new()
        .passthrough(Arc::new(passthrough))
        .fixture("users", Vec::<Record>::new())
        .unwrap()
        .build()
        .unwrap();

    let response = router
        .dispatch_parts(Method::GET, "/api?results=1", None)
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body["results"][0]["user"]["gender"], "female");

    // Emulated routes are still served locally.
    let users = router.dispatch_parts(Method::GET, "/users", None).await.unwrap();
    assert_eq!(users.body, json!({"items": []}));
}

#[tokio::test]
async fn test_body_and_status_pass_through_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events"))
        .and(body_string(r#"{"kind":"click"}"#))
        .respond_with(ResponseTemplate::new(418).set_body_string("short and stout"))
        .mount(&server)
        .await;

    let passthrough = HttpPassthrough::new(&format!("{}/v1", server.uri()), Duration::from_secs(5)).unwrap();
    let request = MockRequest::new(Method::POST, "/events").with_body(r#"{"kind":"click"}"#);

    let response = passthrough.forward(&request).await.unwrap();

    assert_eq!(response.status_code, 418);
    assert_eq!(response.status_text, "I'm a teapot");
    assert_eq!(response.body, json!("short and stout"));
}

#[tokio::test]
async fn test_unreachable_backend_is_passthrough_error() {
    let passthrough = HttpPassthrough::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let router = RouterBuilder::new()
        .passthrough(Arc::new(passthrough))
        .build()
        .unwrap();

    let err = router
        .dispatch_parts(Method::GET, "/anything", None)
        .await
        .unwrap_err();

    assert!(matches!(err, MockError::Passthrough { .. }));
    assert_eq!(err.into_response().status_code, 502);
}
