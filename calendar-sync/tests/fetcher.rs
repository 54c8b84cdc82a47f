use calendar_sync::{FeedFetcher, FetchError, HttpFeedFetcher};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

fn fetcher(timeout: Duration) -> HttpFeedFetcher {
    HttpFeedFetcher::new(timeout, "calendar-sync-test/1.0").unwrap()
}

#[tokio::test]
async fn test_fetch_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.ics"))
        .and(header("user-agent", "calendar-sync-test/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/calendar")
                .set_body_string(BODY),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = fetcher(Duration::from_secs(5))
        .fetch(&format!("{}/feed.ics", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, BODY);
}

#[tokio::test]
async fn test_error_status_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>Not Found</html>"))
        .mount(&server)
        .await;

    let err = fetcher(Duration::from_secs(5))
        .fetch(&format!("{}/missing.ics", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::Status { status: 404 });
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(BODY)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = fetcher(Duration::from_millis(100))
        .fetch(&format!("{}/feed.ics", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::Timeout);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Nothing listens on the discard port
    let err = fetcher(Duration::from_secs(5))
        .fetch("http://127.0.0.1:9/feed.ics")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "{:?}", err);
}
