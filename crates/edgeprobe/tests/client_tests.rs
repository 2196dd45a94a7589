//! Edge client tests against a mock edge proxy

use std::time::Duration;

use edgeprobe::{EdgeClient, ProbeRequest, Region, PROTOCOL_VERSION};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_probe_posts_request_and_parses_response() {
    let _ = tracing_subscriber::fmt::try_init();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/probe"))
        .and(header("authorization", "Bearer edge-token"))
        .and(header("x-edgeprobe-protocol", PROTOCOL_VERSION))
        .and(body_partial_json(serde_json::json!({
            "targetUrl": "https://example.com",
            "region": "ap-northeast"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 204,
            "duration": 42,
            "colo": "NRT"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = EdgeClient::new(&format!("{}/probe", server.uri()), Duration::from_secs(5))
        .unwrap()
        .with_token("edge-token");

    let response = client
        .probe(&ProbeRequest::head("https://example.com", Region::ApNortheast, 5000))
        .await
        .unwrap();

    assert_eq!(response.status, Some(204));
    assert_eq!(response.duration, 42);
    assert_eq!(response.served_from(), Some(Region::ApNortheast));
}

#[tokio::test]
async fn test_probe_fails_on_proxy_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = EdgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let result = client.probe(&ProbeRequest::head("https://example.com", Region::UsEast, 5000)).await;

    let error = result.unwrap_err().to_string();
    assert!(error.contains("503"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_probe_rejects_invalid_request_without_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = EdgeClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let result = client.probe(&ProbeRequest::head("not a url", Region::UsEast, 5000)).await;

    assert!(result.is_err());
}

#[test]
fn test_client_rejects_bad_endpoint() {
    assert!(EdgeClient::new("::not-a-url", Duration::from_secs(1)).is_err());
}
