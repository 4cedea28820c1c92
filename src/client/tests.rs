use std::time::Duration;

use super::connection::Connection;
use super::heartbeat::{Heartbeat, HeartbeatAction, HeartbeatState};
use crate::utils::RelayError;
use tokio::sync::{mpsc, oneshot};
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_connection_new() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let conn = Connection::new(tx);
    assert!(!conn.id.is_empty());
    assert!(conn.topics().is_empty());
    assert!(!conn.is_closed());
}

#[test]
fn test_connection_ids_are_unique() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let a = Connection::new(tx.clone());
    let b = Connection::new(tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_with_id_keeps_given_id() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let conn = Connection::with_id("session-1".to_string(), tx);
    assert_eq!(conn.id, "session-1");
}

#[test]
fn test_send_queues_frame() {
    let (tx, mut rx) = mpsc::channel::<WsMessage>(4);
    let conn = Connection::new(tx);
    conn.send(WsMessage::text("hello")).unwrap();
    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("hello"));
}

#[test]
fn test_send_after_receiver_dropped_fails() {
    let (tx, rx) = mpsc::channel::<WsMessage>(4);
    let conn = Connection::new(tx);
    drop(rx);
    assert!(conn.is_closed());
    assert!(matches!(
        conn.send(WsMessage::text("hello")),
        Err(RelayError::ConnectionClosed(_))
    ));
}

#[test]
fn test_send_to_full_queue_fails() {
    let (tx, mut rx) = mpsc::channel::<WsMessage>(2);
    let conn = Connection::new(tx);
    conn.send(WsMessage::text("1")).unwrap();
    conn.send(WsMessage::text("2")).unwrap();
    assert!(matches!(
        conn.send(WsMessage::text("3")),
        Err(RelayError::QueueFull(_))
    ));

    // nothing beyond capacity was buffered
    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("1"));
    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("2"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_close_is_idempotent_and_clears_topics() {
    let (tx, mut rx) = mpsc::channel::<WsMessage>(4);
    let mut conn = Connection::new(tx);
    conn.join("room1");
    conn.join("room2");

    let topics = conn.close().unwrap();
    assert_eq!(topics.len(), 2);
    assert!(conn.topics().is_empty());
    assert!(conn.is_closed());
    assert!(conn.close().is_none());

    assert!(conn.send(WsMessage::text("late")).is_err());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_close_fires_notifier() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let (notify_tx, mut notify_rx) = oneshot::channel();
    let mut conn = Connection::new(tx).notify_on_close(notify_tx);

    assert!(notify_rx.try_recv().is_err());
    conn.close();
    assert_eq!(notify_rx.try_recv(), Ok(()));
}

#[test]
fn test_dropping_connection_fires_notifier() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let (notify_tx, mut notify_rx) = oneshot::channel::<()>();
    let conn = Connection::new(tx).notify_on_close(notify_tx);
    drop(conn);
    assert_eq!(
        notify_rx.try_recv(),
        Err(oneshot::error::TryRecvError::Closed)
    );
}

#[test]
fn test_heartbeat_first_tick_pings() {
    let mut hb = Heartbeat::new(Duration::from_secs(30));
    assert_eq!(hb.state(), HeartbeatState::AwaitingProbe);
    assert_eq!(hb.on_tick(), HeartbeatAction::SendProbe);
    assert_eq!(hb.state(), HeartbeatState::ProbeSent);
}

#[test]
fn test_heartbeat_ack_keeps_session_alive() {
    let mut hb = Heartbeat::new(Duration::from_secs(30));
    for _ in 0..5 {
        assert_eq!(hb.on_tick(), HeartbeatAction::SendProbe);
        hb.on_ack();
        assert_eq!(hb.state(), HeartbeatState::AwaitingProbe);
    }
}

#[test]
fn test_heartbeat_unanswered_ping_terminates() {
    let mut hb = Heartbeat::new(Duration::from_secs(30));
    assert_eq!(hb.on_tick(), HeartbeatAction::SendProbe);
    assert_eq!(hb.on_tick(), HeartbeatAction::Terminate);
    assert_eq!(hb.state(), HeartbeatState::TimedOut);

    // a late pong does not bring it back
    hb.on_ack();
    assert_eq!(hb.state(), HeartbeatState::TimedOut);
    assert_eq!(hb.on_tick(), HeartbeatAction::Terminate);
}

#[test]
fn test_unsolicited_ack_is_harmless() {
    let mut hb = Heartbeat::new(Duration::from_secs(30));
    hb.on_ack();
    assert_eq!(hb.state(), HeartbeatState::AwaitingProbe);
}

#[tokio::test]
async fn test_ticker_waits_one_interval() {
    let hb = Heartbeat::new(Duration::from_millis(50));
    let mut ticker = hb.ticker();
    let started = tokio::time::Instant::now();
    ticker.tick().await;
    assert!(started.elapsed() >= Duration::from_millis(45));
}
