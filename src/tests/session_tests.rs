use crate::protocol::{InboundEvent, OutboundEvent};
use crate::session::{SessionManager, SessionState};
use crate::tests::support::{FakeConnector, live};
use tokio_test::{assert_pending, task};

fn join(peer: &str) -> OutboundEvent {
    OutboundEvent::JoinChat {
        peer_id: peer.to_string(),
    }
}

fn leave(peer: &str) -> OutboundEvent {
    OutboundEvent::LeaveChat {
        peer_id: peer.to_string(),
    }
}

#[tokio::test]
async fn test_open_emits_join_and_waits_for_snapshot() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");

    session.open("bob").await.unwrap();

    assert_eq!(session.state(), SessionState::Joining);
    assert_eq!(session.peer_id(), Some("bob"));
    assert_eq!(session.session().unwrap().local_user_id, "me");
    assert_eq!(connector.last().emitted(), vec![join("bob")]);
    assert!(connector.last().is_subscribed());

    session.mark_joined();
    assert_eq!(session.state(), SessionState::Joined);
}

#[tokio::test]
async fn test_open_same_peer_reuses_session() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");

    session.open("bob").await.unwrap();
    let id = session.session().unwrap().id;
    session.open("bob").await.unwrap();

    assert_eq!(connector.connections(), 1);
    assert_eq!(session.session().unwrap().id, id);
}

#[tokio::test]
async fn test_switch_closes_old_session_first() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");

    session.open("bob").await.unwrap();
    session.switch_peer("carol").await.unwrap();

    let old = connector.channel(0);
    assert!(old.is_closed());
    assert!(!old.is_subscribed());
    assert_eq!(old.emitted(), vec![join("bob"), leave("bob")]);

    assert_eq!(connector.open_channels(), 1);
    assert_eq!(connector.last().emitted(), vec![join("carol")]);
    assert_eq!(session.peer_id(), Some("carol"));
    assert_eq!(session.state(), SessionState::Joining);
}

#[tokio::test]
async fn test_events_from_closed_session_are_not_delivered() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");

    session.open("bob").await.unwrap();
    let old = connector.last();
    session.open("carol").await.unwrap();

    assert!(!old.push(live("bob", "late")));
    assert!(connector.last().push(live("carol", "hi")));
    assert_eq!(session.next_event().await, Some(live("carol", "hi")));
}

#[tokio::test]
async fn test_send_emits_trimmed_text() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");
    session.open("bob").await.unwrap();

    assert!(session.send("  hello  ").await.unwrap());

    assert_eq!(
        connector.last().emitted().last(),
        Some(&OutboundEvent::SendMessage {
            peer_id: "bob".to_string(),
            text: "hello".to_string(),
        })
    );
}

#[tokio::test]
async fn test_send_blank_or_without_session_is_noop() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");

    assert!(!session.send("hello").await.unwrap());

    session.open("bob").await.unwrap();
    assert!(!session.send("   ").await.unwrap());
    assert!(!session.send("").await.unwrap());
    assert_eq!(connector.last().emitted(), vec![join("bob")]);
}

#[tokio::test]
async fn test_connect_failure_leaves_manager_idle() {
    let connector = FakeConnector::new();
    connector.set_fail(true);
    let mut session = SessionManager::new(connector.clone(), "me");

    let err = session.open("bob").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!session.is_active());

    // A later attempt succeeds once the transport is back
    connector.set_fail(false);
    session.open("bob").await.unwrap();
    assert!(session.is_active());
}

#[tokio::test]
async fn test_mark_joined_without_session_stays_idle() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector, "me");

    session.mark_joined();
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_next_event_pending_when_idle() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector, "me");

    let mut next = task::spawn(session.next_event());
    assert_pending!(next.poll());
}

#[tokio::test]
async fn test_hang_up_ends_event_stream() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");
    session.open("bob").await.unwrap();

    connector.last().push(InboundEvent::OnlineUsers(vec!["bob".to_string()]));
    connector.last().hang_up();

    assert_eq!(
        session.next_event().await,
        Some(InboundEvent::OnlineUsers(vec!["bob".to_string()]))
    );
    assert_eq!(session.next_event().await, None);

    session.handle_disconnect();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!session.is_active());
}

#[tokio::test]
async fn test_close_without_session_is_harmless() {
    let connector = FakeConnector::new();
    let mut session = SessionManager::new(connector.clone(), "me");

    session.close().await;

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(connector.connections(), 0);
}
