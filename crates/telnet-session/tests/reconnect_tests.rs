//! Integration tests for reconnect timing.

use std::io;
use std::time::Duration;

use telnet_session::test_utils::{CaptureListener, DuplexConnector};
use telnet_session::trigger::{self, Trigger};
use telnet_session::{Engine, SessionConfig, Supervisor, SupervisorExit};
use tokio::time::Instant;

fn config(reconnect_delay: u64, session_timer: Option<u64>) -> SessionConfig {
    SessionConfig::new("router", 23)
        .no_login()
        .reconnect_delay(Duration::from_secs(reconnect_delay))
        .session_timer(session_timer.map(Duration::from_secs))
}

#[tokio::test(start_paused = true)]
async fn watchdog_expiry_reconnects_without_delay() {
    let config = config(300, Some(100)).watchdog(Duration::from_secs(20), None);
    let connector = DuplexConnector::new();
    let _first = connector.push_peer();
    let _second = connector.push_peer();
    let capture = CaptureListener::new();
    let engine = Engine::builder(config, connector.clone())
        .listener(capture.clone())
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    assert_eq!(supervisor.run().await, SupervisorExit::DeadlineReached);

    let attempts = connector.attempts();
    assert!(attempts.len() >= 3);
    let gap = attempts[1] - attempts[0];
    assert!(gap >= Duration::from_secs(20), "reconnected after {gap:?}");
    assert!(gap < Duration::from_secs(25), "reconnected after {gap:?}");
    assert_eq!(supervisor.watchdog_expiries(), 2);
    assert!(capture.contains("remote host is not responding. Reconnecting in progress..."));
}

#[tokio::test(start_paused = true)]
async fn connect_failure_waits_reconnect_delay() {
    let connector = DuplexConnector::new();
    connector.push_failure(io::ErrorKind::ConnectionRefused);
    let _peer = connector.push_peer();
    let capture = CaptureListener::new();
    let engine = Engine::builder(config(30, Some(100)), connector.clone())
        .listener(capture.clone())
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    assert_eq!(supervisor.run().await, SupervisorExit::DeadlineReached);

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_secs(30));
    assert_eq!(supervisor.faults(), 1);
    assert!(capture.contains("transport error during connection"));
    assert!(capture.contains("Retrying after 30 seconds..."));
}

#[tokio::test(start_paused = true)]
async fn remote_close_is_a_delayed_fault() {
    let connector = DuplexConnector::new();
    drop(connector.push_peer());
    let _peer = connector.push_peer();
    let capture = CaptureListener::new();
    let engine = Engine::builder(config(15, Some(100)), connector.clone())
        .listener(capture.clone())
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    assert_eq!(supervisor.run().await, SupervisorExit::DeadlineReached);

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_secs(15));
    assert!(capture.contains("eof error during connection"));
}

#[tokio::test(start_paused = true)]
async fn handshake_timeout_is_a_delayed_fault() {
    let config = SessionConfig::new("router", 23)
        .credentials("alice", "secret")
        .timeout(Duration::from_secs(3))
        .reconnect_delay(Duration::from_secs(10))
        .session_timer(Some(Duration::from_secs(30)));
    let connector = DuplexConnector::new();
    let mut peer = connector.push_peer();
    let capture = CaptureListener::new();
    let engine = Engine::builder(config, connector.clone())
        .listener(capture.clone())
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    peer.send("Username: ").await.unwrap();
    assert_eq!(supervisor.run().await, SupervisorExit::DeadlineReached);

    let attempts = connector.attempts();
    assert!(attempts.len() >= 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_secs(13));
    assert!(capture.contains("timeout error during connection"));
}

#[tokio::test(start_paused = true)]
async fn stop_during_login_abandons_attempt() {
    let config = SessionConfig::new("router", 23)
        .credentials("alice", "secret")
        .timeout(Duration::from_secs(30))
        .reconnect_delay(Duration::from_secs(10))
        .session_timer(None);
    let connector = DuplexConnector::new();
    let _peer = connector.push_peer();
    let (tx, rx) = trigger::channel();
    let capture = CaptureListener::new();
    let engine = Engine::builder(config, connector.clone())
        .listener(capture.clone())
        .triggers(rx)
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    let start = Instant::now();
    let (exit, ()) = tokio::join!(supervisor.run(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(Trigger::Stop).unwrap();
    });

    assert_eq!(exit, SupervisorExit::Stopped);
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(supervisor.faults(), 0);
    assert!(capture.contains("stop requested, abandoning connection attempt"));
}

#[tokio::test(start_paused = true)]
async fn no_connect_after_deadline() {
    let connector = DuplexConnector::new();
    let capture = CaptureListener::new();
    let engine = Engine::builder(config(60, Some(10)), connector.clone())
        .listener(capture.clone())
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    assert_eq!(supervisor.run().await, SupervisorExit::DeadlineReached);
    assert_eq!(connector.attempt_count(), 1);
    assert!(capture.contains("telnet session timeout, quit!!"));
}

#[tokio::test(start_paused = true)]
async fn unreachable_host_is_retried_indefinitely() {
    let connector = DuplexConnector::new();
    let engine = Engine::builder(config(5, None), connector.clone())
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(engine);

    let ran = tokio::time::timeout(Duration::from_secs(61), supervisor.run()).await;
    assert!(ran.is_err());
    assert_eq!(connector.attempt_count(), 13);

    let attempts = connector.attempts();
    for pair in attempts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(5));
    }
}
