//! End-to-end tests against the in-process backend
//!
//! Run with: cargo test -p integration-tests --test e2e_tests

use consult_common::{ClientError, RefreshError};
use consult_realtime::{
    ChatSocket, ConnectionState, OutboundEvent, RealtimeManager, SocketEndpoint,
    TungsteniteConnector,
};
use consult_session::RecordingNavigator;
use integration_tests::{
    bad_credentials, credentials, unique_room, wait_for_state, CollectingHandlers, TestServer,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_login_then_transparent_refresh() {
    let server = TestServer::start().await.expect("Failed to start server");
    let nav = Arc::new(RecordingNavigator::new());
    let session = server.session(nav.clone()).unwrap();

    session.login(&credentials()).await.unwrap();
    let first_token = session.access_token().unwrap();

    let me: Value = session.get_json("/api/me/").await.unwrap();
    assert_eq!(me["email"], "patient@example.com");

    server.backend.expire_access_tokens();

    let me: Value = session.get_json("/api/me/").await.unwrap();
    assert_eq!(me["email"], "patient@example.com");

    let second_token = session.access_token().unwrap();
    assert_ne!(first_token, second_token);
    assert_eq!(server.backend.refresh_calls(), 1);
    assert_eq!(
        server.backend.auth_headers(),
        vec![
            format!("Bearer {first_token}"),
            format!("Bearer {first_token}"),
            format!("Bearer {second_token}"),
        ]
    );
    assert!(nav.visited().is_empty());
}

#[tokio::test]
async fn test_concurrent_expiry_refreshes_once() {
    let server = TestServer::start().await.expect("Failed to start server");
    let session = server.session(Arc::new(RecordingNavigator::new())).unwrap();
    session.login(&credentials()).await.unwrap();

    server.backend.expire_access_tokens();

    let calls = (0..8).map(|_| {
        let session = session.clone();
        async move { session.get_json::<Value>("/api/me/").await }
    });
    for result in futures::future::join_all(calls).await {
        assert!(result.is_ok(), "call failed: {result:?}");
    }

    assert_eq!(server.backend.refresh_calls(), 1);
}

#[tokio::test]
async fn test_revoked_refresh_token_sends_user_to_login() {
    let server = TestServer::start().await.expect("Failed to start server");
    let nav = Arc::new(RecordingNavigator::new());
    let session = server.session(nav.clone()).unwrap();
    session.login(&credentials()).await.unwrap();

    server.backend.expire_access_tokens();
    server.backend.revoke_refresh_tokens();

    let err = session.get_json::<Value>("/api/me/").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::RefreshFailed(RefreshError::Rejected { status: 401 })
    ));
    assert!(!session.is_authenticated());
    assert_eq!(nav.visited(), vec!["/login"]);
}

#[tokio::test]
async fn test_bad_credentials_do_not_refresh() {
    let server = TestServer::start().await.expect("Failed to start server");
    let session = server.session(Arc::new(RecordingNavigator::new())).unwrap();

    let err = session.login(&bad_credentials()).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(server.backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_silent_restore_across_restarts() {
    let server = TestServer::start().await.expect("Failed to start server");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session").join("refresh.json");

    let first = server
        .session_with_file(Arc::new(RecordingNavigator::new()), &path)
        .unwrap();
    first.login(&credentials()).await.unwrap();
    drop(first);

    let nav = Arc::new(RecordingNavigator::new());
    let second = server.session_with_file(nav.clone(), &path).unwrap();
    assert!(second.silent_restore().await);
    assert!(second.is_authenticated());
    assert!(second.get_json::<Value>("/api/me/").await.is_ok());

    second.logout();
    let third = server.session_with_file(nav.clone(), &path).unwrap();
    assert!(!third.silent_restore().await);
    assert!(nav.visited().is_empty());
}

// ============================================================================
// Realtime
// ============================================================================

#[tokio::test]
async fn test_chat_round_trip() {
    let server = TestServer::start().await.expect("Failed to start server");
    let session = server.session(Arc::new(RecordingNavigator::new())).unwrap();
    session.login(&credentials()).await.unwrap();

    let realtime = RealtimeManager::new(&server.config(), session.tokens()).unwrap();
    let room = unique_room();
    let mut collected = CollectingHandlers::new();

    let socket = realtime.join(&room, collected.handlers.clone());
    wait_for_state(&socket, |s| s.is_open()).await.unwrap();

    assert!(realtime.send(&room, &OutboundEvent::typing(true)));
    assert!(realtime.send(&room, &OutboundEvent::chat_message("hello doctor")));

    let typing = tokio::time::timeout(Duration::from_secs(5), collected.typing.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(typing.is_typing);

    let msg = tokio::time::timeout(Duration::from_secs(5), collected.messages.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.text.as_deref(), Some("hello doctor"));

    realtime.close_all();
    assert_eq!(socket.state(), ConnectionState::ClosedClean);
}

#[tokio::test]
async fn test_invalid_token_is_not_retried() {
    let server = TestServer::start().await.expect("Failed to start server");
    let config = server.config();

    let socket = ChatSocket::new(
        Arc::new(TungsteniteConnector::new()),
        SocketEndpoint::from_config(&config).unwrap(),
        config.realtime.clone(),
    );
    socket.open(&unique_room(), "bogus", CollectingHandlers::new().handlers);

    let state = wait_for_state(&socket, |s| s.is_terminal()).await.unwrap();
    assert_eq!(state, ConnectionState::ClosedAuthRejected);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.backend.ws_connects(), 1);
    assert!(!socket.is_ready());
}

#[tokio::test]
async fn test_unexpected_close_reconnects() {
    let server = TestServer::start().await.expect("Failed to start server");
    let session = server.session(Arc::new(RecordingNavigator::new())).unwrap();
    session.login(&credentials()).await.unwrap();

    let realtime = RealtimeManager::new(&server.config(), session.tokens()).unwrap();
    let room = unique_room();
    let mut collected = CollectingHandlers::new();
    let socket = realtime.join(&room, collected.handlers.clone());
    wait_for_state(&socket, |s| s.is_open()).await.unwrap();

    // An echo proves the server side has joined the room before it is kicked.
    assert!(realtime.send(&room, &OutboundEvent::chat_message("ping")));
    tokio::time::timeout(Duration::from_secs(5), collected.messages.recv())
        .await
        .unwrap()
        .unwrap();

    server.backend.kick_room(&room, 4000);
    wait_for_state(&socket, |s| matches!(s, ConnectionState::Reconnecting { .. }))
        .await
        .unwrap();
    wait_for_state(&socket, |s| s.is_open()).await.unwrap();

    assert_eq!(server.backend.ws_connects(), 2);
    realtime.close_all();
}

#[tokio::test]
async fn test_token_rotation_reconnects_room() {
    let server = TestServer::start().await.expect("Failed to start server");
    let session = server.session(Arc::new(RecordingNavigator::new())).unwrap();
    session.login(&credentials()).await.unwrap();

    let realtime = RealtimeManager::new(&server.config(), session.tokens()).unwrap();
    let room = unique_room();
    let socket = realtime.join(&room, CollectingHandlers::new().handlers);
    wait_for_state(&socket, |s| s.is_open()).await.unwrap();

    // A refresh swaps the access token; the old socket token is now invalid.
    server.backend.expire_access_tokens();
    let _: Value = session.get_json("/api/me/").await.unwrap();
    realtime.rotate_token();

    wait_for_state(&socket, |s| s.is_open()).await.unwrap();
    assert_eq!(server.backend.ws_connects(), 2);
    assert_eq!(socket.room().as_deref(), Some(room.as_str()));
    realtime.close_all();
}
