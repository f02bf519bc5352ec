//! Probing real sockets through the HTTP adapter.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

use proxy_health::adapter::{HttpProxy, ProbeError, Proxy, UNKNOWN_DELAY};
use proxy_health::config::{ProxyEntry, ProxyProtocol};
use proxy_health::health::StatusRanges;

fn direct(name: &str) -> HttpProxy {
    HttpProxy::from_config(&ProxyEntry {
        name: name.to_string(),
        protocol: ProxyProtocol::Direct,
        server: String::new(),
        port: 0,
        username: None,
        password: None,
    })
    .unwrap()
}

fn soon(ms: u64) -> Instant {
    Instant::now() + Duration::from_millis(ms)
}

#[tokio::test]
async fn test_direct_probe_records_delay() {
    let (addr, hits) = common::start_mock_backend(204, Duration::from_millis(20)).await;
    let proxy = direct("direct");

    let result = proxy
        .url_test(&format!("http://{}/generate_204", addr), &StatusRanges::empty(), soon(2000))
        .await;

    let delay = result.unwrap();
    assert!(delay >= 20);
    assert!(proxy.alive());
    assert_eq!(proxy.last_delay(), delay);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unexpected_status_marks_down() {
    let (addr, _) = common::start_mock_backend(204, Duration::ZERO).await;
    let proxy = direct("direct");
    let expected = StatusRanges::parse("200").unwrap();

    let result = proxy
        .url_test(&format!("http://{}/", addr), &expected, soon(2000))
        .await;

    assert_eq!(result, Err(ProbeError::UnexpectedStatus(204)));
    assert!(!proxy.alive());
    assert_eq!(proxy.last_delay(), UNKNOWN_DELAY);
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let (addr, hits) = common::start_mock_backend(302, Duration::ZERO).await;
    let proxy = direct("direct");
    let expected = StatusRanges::parse("200-299/302").unwrap();

    let result = proxy
        .url_test(&format!("http://{}/", addr), &expected, soon(2000))
        .await;

    assert!(result.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_probe_goes_through_http_proxy() {
    let (proxy_addr, hits) = common::start_mock_backend(204, Duration::ZERO).await;
    let proxy = HttpProxy::from_config(&ProxyEntry {
        name: "forward".to_string(),
        protocol: ProxyProtocol::Http,
        server: proxy_addr.ip().to_string(),
        port: proxy_addr.port(),
        username: None,
        password: None,
    })
    .unwrap();

    // The target host does not exist; only the proxy can answer.
    let result = proxy
        .url_test("http://target.invalid/generate_204", &StatusRanges::empty(), soon(2000))
        .await;

    assert!(result.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(proxy.kind(), "http");
}

#[tokio::test]
async fn test_silent_target_times_out_at_deadline() {
    let addr = common::start_silent_backend().await;
    let proxy = direct("direct");
    let started = Instant::now();

    let result = proxy
        .url_test(&format!("http://{}/", addr), &StatusRanges::empty(), soon(200))
        .await;

    assert_eq!(result, Err(ProbeError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!proxy.alive());
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let addr = common::closed_port().await;
    let proxy = direct("direct");

    let result = proxy
        .url_test(&format!("http://{}/", addr), &StatusRanges::empty(), soon(2000))
        .await;

    assert!(matches!(result, Err(ProbeError::Transport(_))));
    assert!(!proxy.alive());
}
