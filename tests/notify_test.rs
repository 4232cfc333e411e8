//! Notification dispatcher tests against a local mock bridge.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mosaic::error::MosaicError;
use mosaic::notify::{NotificationDispatcher, RetryPolicy};

/// Spawn a one-shot HTTP server that answers each request with the next
/// status from `statuses` (repeating the last one). Returns its URL and a
/// counter of requests served.
async fn mock_bridge(statuses: Vec<u16>) -> (String, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&served);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let status = *statuses.get(n).or(statuses.last()).unwrap_or(&200);

            // Drain the request before responding; reqwest sends a small
            // JSON body, so a bounded read is enough.
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let reason = match status {
                200 => "OK",
                400 => "Bad Request",
                500 => "Internal Server Error",
                _ => "Status",
            };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}/notify"), served)
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: vec![
            Duration::from_millis(50),
            Duration::from_millis(100),
            Duration::from_millis(200),
        ],
        timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn success_on_third_attempt_reports_three_attempts() {
    let (url, served) = mock_bridge(vec![500, 500, 200]).await;
    let dispatcher = NotificationDispatcher::new(Some(url), true, None, fast_policy());

    let started = Instant::now();
    let receipt = dispatcher
        .notify("Reminder", "standup", None, None)
        .await
        .unwrap();

    assert!(receipt.delivered);
    assert_eq!(receipt.attempts, 3);
    assert_eq!(served.load(Ordering::SeqCst), 3);
    // two backoffs were slept through: 50ms + 100ms
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn persistent_failure_exhausts_exactly_max_attempts() {
    let (url, served) = mock_bridge(vec![500]).await;
    let dispatcher = NotificationDispatcher::new(Some(url), true, None, fast_policy());

    let err = dispatcher
        .notify("Reminder", "standup", None, None)
        .await
        .unwrap_err();

    match err {
        MosaicError::DeliveryFailed { attempts } => assert_eq!(attempts, 3),
        other => panic!("expected DeliveryFailed, got {other:?}"),
    }
    assert_eq!(served.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, served) = mock_bridge(vec![400]).await;
    let dispatcher = NotificationDispatcher::new(Some(url), true, None, fast_policy());

    let err = dispatcher
        .notify("Reminder", "standup", None, None)
        .await
        .unwrap_err();

    match err {
        MosaicError::DeliveryFailed { attempts } => assert_eq!(attempts, 1),
        other => panic!("expected DeliveryFailed, got {other:?}"),
    }
    assert_eq!(served.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_attempt_success_is_one_attempt() {
    let (url, served) = mock_bridge(vec![200]).await;
    let dispatcher = NotificationDispatcher::new(Some(url), true, None, fast_policy());

    let receipt = dispatcher
        .notify("Reminder", "standup", None, None)
        .await
        .unwrap();

    assert!(receipt.delivered);
    assert_eq!(receipt.attempts, 1);
    assert_eq!(served.load(Ordering::SeqCst), 1);
}
