//! HTTP prober tests against an in-process server

mod common;

use std::time::{Duration, Instant};

use common::{closed_port_url, init_tracing, Reply, TestServer};
use pingwatch::{HttpProber, ProbeError, Prober};

const TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn test_head_then_content_read() {
    init_tracing();
    let server = TestServer::spawn(Reply::Status(200)).await;
    let prober = HttpProber::new("pingwatch-test", true).unwrap();

    let outcome = prober.probe(&server.url("/config"), TIMEOUT).await;

    assert!(outcome.success, "Probe failed: {:?}", outcome.error);
    assert_eq!(outcome.status_code, Some(200));
    assert!(outcome.latency_ms.unwrap() >= 0.0);
    assert!(outcome.error.is_none());
    assert_eq!(server.methods(), vec!["HEAD", "GET"]);
}

#[tokio::test]
async fn test_header_only_probe() {
    let server = TestServer::spawn(Reply::Status(204)).await;
    let prober = HttpProber::new("pingwatch-test", false).unwrap();

    let outcome = prober.probe(&server.url("/"), TIMEOUT).await;

    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(204));
    assert_eq!(server.methods(), vec!["HEAD"]);
}

#[tokio::test]
async fn test_error_status_still_measures_latency() {
    let server = TestServer::spawn(Reply::Status(403)).await;
    let prober = HttpProber::new("pingwatch-test", false).unwrap();

    let outcome = prober.probe(&server.url("/locked"), TIMEOUT).await;

    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(403));
    assert!(outcome.latency_ms.is_some());
}

#[tokio::test]
async fn test_connection_refused() {
    let prober = HttpProber::new("pingwatch-test", true).unwrap();

    let outcome = prober.probe(&closed_port_url(), TIMEOUT).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(ProbeError::ConnectionFailed));
    assert!(outcome.latency_ms.is_none());
    assert!(outcome.status_code.is_none());
}

#[tokio::test]
async fn test_timeout() {
    let server = TestServer::spawn(Reply::Delayed(Duration::from_secs(5), 200)).await;
    let prober = HttpProber::new("pingwatch-test", true).unwrap();

    let outcome = prober.probe(&server.url("/slow"), Duration::from_millis(200)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(ProbeError::Timeout));
}

#[tokio::test]
async fn test_content_read_shares_the_probe_timeout() {
    let server = TestServer::spawn(Reply::SlowContent(Duration::from_secs(5), 200)).await;
    let prober = HttpProber::new("pingwatch-test", true).unwrap();
    let timeout = Duration::from_millis(500);

    let started = Instant::now();
    let outcome = prober.probe(&server.url("/slow-body"), timeout).await;
    let elapsed = started.elapsed();

    // The GET only gets what the HEAD left over, then header latency is kept
    assert!(elapsed < timeout + Duration::from_millis(250), "Probe took {:?}", elapsed);
    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(200));
    assert!(outcome.latency_ms.unwrap() < timeout.as_secs_f64() * 1000.0);
    assert_eq!(server.methods(), vec!["HEAD", "GET"]);
}

#[tokio::test]
async fn test_redirect_loop() {
    let server = TestServer::spawn(Reply::RedirectLoop).await;
    let prober = HttpProber::new("pingwatch-test", true).unwrap();

    let outcome = prober.probe(&server.url("/loop"), TIMEOUT).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(ProbeError::TooManyRedirects));
}

#[tokio::test]
async fn test_invalid_url_is_generic_failure() {
    let prober = HttpProber::new("pingwatch-test", true).unwrap();

    let outcome = prober.probe("not a url", TIMEOUT).await;

    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(ProbeError::Other(_))));
}
