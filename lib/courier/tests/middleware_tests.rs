//! Integration tests for the retry, redirect and logging layers.

use std::time::{Duration, Instant};

use courier::{ClientConfig, Error, HyperClient, Method, Request};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string, header, method, path},
};

fn url(server: &MockServer, path: &str) -> url::Url {
    url::Url::parse(&format!("{}{path}", server.uri())).expect("url")
}

fn client(retry_count: u32, retry_pause: Duration) -> HyperClient {
    HyperClient::new(
        ClientConfig::builder()
            .retry_count(retry_count)
            .retry_pause(retry_pause)
            .build(),
    )
}

// ============================================================================
// Retry Tests
// ============================================================================

/// No retries happen for 4xx errors.
#[tokio::test]
async fn test_no_retry_on_client_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/not-found"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(3, Duration::ZERO);
    let request = Request::builder(Method::Get, url(&mock_server, "/not-found")).build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 404);
}

/// 429 is a client error: not retried.
#[tokio::test]
async fn test_no_retry_on_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rate-limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(2, Duration::ZERO);
    let request = Request::builder(Method::Get, url(&mock_server, "/rate-limited")).build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 429);
}

/// Server errors are retried until the budget is spent, then returned as is.
#[tokio::test]
async fn test_retry_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client(2, Duration::from_millis(10));
    let request = Request::builder(Method::Get, url(&mock_server, "/error")).build();

    let start = Instant::now();
    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 503);
    assert!(start.elapsed() >= Duration::from_millis(20));
}

/// A retry that succeeds hands back the successful response.
#[tokio::test]
async fn test_retry_recovers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/flaky"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = client(1, Duration::from_millis(10));
    let request = Request::builder(Method::Post, url(&mock_server, "/flaky"))
        .body(bytes::Bytes::from_static(b"payload"))
        .build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 200);
}

/// Connection failures are retried, then surface as transport errors.
#[tokio::test]
async fn test_retry_on_connection_refused() {
    let client = client(1, Duration::from_millis(50));
    let url = url::Url::parse("http://127.0.0.1:1/").expect("url");
    let request = Request::builder(Method::Get, url).build();

    let start = Instant::now();
    let err = client.execute(request).await.expect_err("nothing listens");

    assert!(err.is_transport(), "got {err:?}");
    assert!(!err.is_service_unavailable());
    assert!(start.elapsed() >= Duration::from_millis(50));
}

/// Each attempt gets its own timeout.
#[tokio::test]
async fn test_retry_after_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new(
        ClientConfig::builder()
            .timeout(Duration::from_millis(100))
            .retry_count(1)
            .retry_pause(Duration::ZERO)
            .build(),
    );
    let request = Request::builder(Method::Get, url(&mock_server, "/slow")).build();

    let response = client.execute(request).await.expect("second attempt succeeds");

    assert_eq!(response.status(), 200);
}

// ============================================================================
// Logging Tests
// ============================================================================

/// Debug logging does not change the exchange.
#[tokio::test]
async fn test_debug_logging() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/debug"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HyperClient::builder().debug_logging().build();
    let request = Request::builder(Method::Get, url(&mock_server, "/debug"))
        .basic_auth("user", "pass")
        .build();

    let response = client.execute(request).await.expect("response");

    assert!(response.is_success());
}

// ============================================================================
// Follow Redirect Tests
// ============================================================================

#[tokio::test]
async fn test_follow_redirect_302() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "redirected"})),
        )
        .mount(&mock_server)
        .await;

    let client = HyperClient::default();
    let request = Request::builder(Method::Get, url(&mock_server, "/old")).build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_redirects_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new(ClientConfig::builder().follow_redirects(false).build());
    let request = Request::builder(Method::Get, url(&mock_server, "/old")).build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 301);
    assert_eq!(response.header("location"), Some("/new"));
}

#[tokio::test]
async fn test_follow_redirect_max_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop1"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop2"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/loop2"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop1"))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new(ClientConfig::builder().max_redirects(3).build());
    let request = Request::builder(Method::Get, url(&mock_server, "/loop1")).build();

    let err = client.execute(request).await.expect_err("should fail");

    assert!(matches!(err, Error::TooManyRedirects { count: 3, max: 3 }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_redirect_without_location() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nowhere"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&mock_server)
        .await;

    let client = HyperClient::default();
    let request = Request::builder(Method::Get, url(&mock_server, "/nowhere")).build();

    let response = client.execute(request).await.expect("returned as is");

    assert_eq!(response.status(), 302);
}

/// The attempt timeout covers every redirect hop, not each hop alone.
#[tokio::test]
async fn test_timeout_spans_redirect_hops() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hop1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/hop2")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hop2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::builder().retry_count(0);

    let client = HyperClient::new(config.clone().timeout(Duration::from_millis(500)).build());
    let request = Request::builder(Method::Get, url(&mock_server, "/hop1")).build();
    let err = client.execute(request).await.expect_err("two hops exceed one budget");
    assert!(err.is_timeout(), "got {err:?}");

    let client = HyperClient::new(config.timeout(Duration::from_secs(2)).build());
    let request = Request::builder(Method::Get, url(&mock_server, "/hop1")).build();
    let response = client.execute(request).await.expect("both hops fit");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_follow_redirect_307_preserves_method() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/old-post"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/new-post"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/new-post"))
        .and(body_string("test body"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HyperClient::default();
    let request = Request::builder(Method::Post, url(&mock_server, "/old-post"))
        .body(bytes::Bytes::from("test body"))
        .build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_follow_redirect_303_changes_post_to_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", "/result"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/result"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HyperClient::default();
    let request = Request::builder(Method::Post, url(&mock_server, "/submit"))
        .body(bytes::Bytes::from("form data"))
        .build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 200);
}

/// `Authorization` is dropped on a cross-host redirect when it is not kept.
#[tokio::test]
async fn test_cross_host_redirect_drops_authorization() {
    let origin = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/landing", other.uri())),
        )
        .mount(&origin)
        .await;

    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&other)
        .await;

    let client = HyperClient::default();

    let request = Request::builder(Method::Get, url(&origin, "/start"))
        .basic_auth("user", "pass")
        .keep_auth_on_redirect(false)
        .build();
    client.execute(request).await.expect("response");

    let request = Request::builder(Method::Get, url(&origin, "/start"))
        .basic_auth("user", "pass")
        .build();
    client.execute(request).await.expect("response");

    let received = other.received_requests().await.expect("recording enabled");
    assert!(received[0].headers.get("authorization").is_none());
    assert!(received[1].headers.get("authorization").is_some());
}
