//! # Handshake Flows
//!
//! Hello → Identify → Identified as seen from the wire:
//!
//! 1. **Unauthenticated Hello**: Identify carries `eventSubscriptions = 0`
//!    and no `authentication` key
//! 2. **Challenged Hello**: Identify carries the two-round SHA-256 token
//! 3. **Identified**: the client lists lower thirds before any user action

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::json;
    use sha2::{Digest, Sha256};

    use slt_client::{
        ClientConfig, ClientEvent, ConnectionStatus, HandshakeState, LowerThird, OpCode,
        TransportCommand,
    };

    use crate::integration::{notices, statuses, Harness};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn b64_sha256(input: &str) -> String {
        STANDARD.encode(Sha256::digest(input.as_bytes()))
    }

    /// Token built step by step, independent of the client's own helper.
    fn expected_token(password: &str, salt: &str, challenge: &str) -> String {
        let secret = b64_sha256(&format!("{password}{salt}"));
        b64_sha256(&format!("{secret}{challenge}"))
    }

    // =========================================================================
    // SCENARIO A: NO AUTHENTICATION
    // =========================================================================

    #[tokio::test]
    async fn test_hello_without_challenge_sends_plain_identify() {
        let mut harness = Harness::quiet();
        let mut peer = harness.open(Some("unused-password")).await;

        peer.send_hello(None);
        let envelope = peer.recv_envelope().await.unwrap();

        assert_eq!(envelope.opcode(), Some(OpCode::Identify));
        assert_eq!(envelope.d["eventSubscriptions"], json!(0));
        assert_eq!(envelope.d["rpcVersion"], json!(1));
        assert!(envelope.d.get("authentication").is_none());
        assert_eq!(harness.client.state(), HandshakeState::Identifying);
    }

    #[tokio::test]
    async fn test_status_sequence_through_identified() {
        let mut harness = Harness::quiet();
        let _peer = harness.ready().await;

        assert_eq!(
            statuses(&harness.drain()),
            vec![
                ConnectionStatus::Connecting,
                ConnectionStatus::SocketOpen,
                ConnectionStatus::Identifying,
                ConnectionStatus::Identified,
            ]
        );
        assert!(harness.client.is_ready());
    }

    #[tokio::test]
    async fn test_missing_rpc_version_falls_back_to_configured() {
        let mut harness = Harness::new(ClientConfig {
            list_on_identify: false,
            rpc_version: 3,
            ..Default::default()
        });
        let mut peer = harness.open(None).await;

        peer.send_json(&json!({"op": 0, "d": {"obsWebSocketVersion": "5.5.0"}}));
        let identify = peer.expect_identify().await.unwrap();

        assert_eq!(identify.rpc_version, 3);
    }

    // =========================================================================
    // SCENARIO B: CHALLENGE-RESPONSE
    // =========================================================================

    #[tokio::test]
    async fn test_challenge_answered_with_token() {
        let mut harness = Harness::quiet();
        let mut peer = harness.open(Some("hunter2")).await;

        peer.send_hello(Some(("S1", "C1")));
        let identify = peer.expect_identify().await.unwrap();

        assert_eq!(
            identify.authentication.as_deref(),
            Some(expected_token("hunter2", "S1", "C1").as_str())
        );
        assert_eq!(identify.event_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_token_never_logged() {
        let mut harness = Harness::quiet();
        let mut peer = harness.open(Some("hunter2")).await;

        peer.send_hello(Some(("S1", "C1")));
        peer.expect_identify().await.unwrap();

        let token = expected_token("hunter2", "S1", "C1");
        let logs: Vec<String> = harness
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                ClientEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect();

        assert!(logs.iter().any(|line| line == ">> Identify"));
        assert!(logs.iter().all(|line| !line.contains(&token)));
    }

    #[tokio::test]
    async fn test_challenge_without_password_sends_unauthenticated_identify() {
        let mut harness = Harness::quiet();
        let mut peer = harness.open(Some("")).await;

        peer.send_hello(Some(("S1", "C1")));
        let identify = peer.expect_identify().await.unwrap();
        assert!(identify.authentication.is_none());

        // obs-websocket closes the socket on failed authentication.
        peer.close();
        let status = harness
            .next_matching(|e| *e == ClientEvent::Status(ConnectionStatus::Disconnected))
            .await;

        assert!(status.is_some());
        assert_eq!(harness.client.state(), HandshakeState::Disconnected);
    }

    // =========================================================================
    // SCENARIO C: AUTOMATIC LISTING
    // =========================================================================

    #[tokio::test]
    async fn test_identified_triggers_listing() {
        let mut harness = Harness::new(ClientConfig::default());
        let mut peer = harness.open(None).await;
        peer.handshake().await.unwrap();

        let request = peer.expect_request().await.unwrap();
        assert_eq!(request.request_type, "CallVendorRequest");
        assert_eq!(
            request.request_data,
            json!({
                "vendorName": "smart-lower-thirds",
                "requestType": "ListLowerThirds",
                "requestData": {}
            })
        );

        peer.respond(
            &request,
            true,
            100,
            json!({
                "vendorName": "smart-lower-thirds",
                "requestType": "ListLowerThirds",
                "responseData": {"items": [
                    {"id": "lt-1", "title": "Jane Doe", "subtitle": "Host", "isVisible": true,
                     "repeatEverySec": 60, "repeatVisibleSec": 10, "hotkey": "F1"},
                    {"id": "lt-2", "title": "", "isVisible": false},
                ]}
            }),
        );

        let Some(ClientEvent::Items(items)) = harness
            .next_matching(|e| matches!(e, ClientEvent::Items(_)))
            .await
        else {
            panic!("no items event");
        };

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            LowerThird {
                id: "lt-1".into(),
                title: "Jane Doe".into(),
                subtitle: "Host".into(),
                is_visible: true,
                repeat_every_sec: 60,
                repeat_visible_sec: 10,
                hotkey: Some("F1".into()),
            }
        );
        assert_eq!(items[1].display_title(), "lt-2");

        let notice = harness
            .next_matching(|e| matches!(e, ClientEvent::Notice(_)))
            .await;
        assert_eq!(notice, Some(ClientEvent::Notice("Listed 2 item(s).".into())));
    }

    #[tokio::test]
    async fn test_failed_listing_reports_notice() {
        let mut harness = Harness::new(ClientConfig::default());
        let mut peer = harness.open(None).await;
        peer.handshake().await.unwrap();

        let request = peer.expect_request().await.unwrap();
        peer.fail(&request, 703, "vendor not found");

        let events = harness
            .collect_until(|e| *e == ClientEvent::Notice("List failed (see log).".into()))
            .await;
        assert!(!events.is_empty());

        let logged = events.iter().any(|e| {
            matches!(e, ClientEvent::Log(line) if line.contains("703") && line.contains("vendor not found"))
        });
        assert!(logged);
    }

    #[tokio::test]
    async fn test_listing_with_no_items_is_empty() {
        let mut harness = Harness::new(ClientConfig::default());
        let mut peer = harness.open(None).await;
        peer.handshake().await.unwrap();

        let request = peer.expect_request().await.unwrap();
        peer.respond(&request, true, 100, json!({"unexpected": true}));

        let items = harness
            .next_matching(|e| matches!(e, ClientEvent::Items(_)))
            .await;
        assert_eq!(items, Some(ClientEvent::Items(vec![])));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(notices(&harness.drain()).contains(&"Listed 0 item(s).".to_string()));
    }

    // =========================================================================
    // HANDSHAKE ROBUSTNESS
    // =========================================================================

    #[tokio::test]
    async fn test_garbage_frames_ignored_during_handshake() {
        let mut harness = Harness::quiet();
        let mut peer = harness.open(None).await;

        peer.send_text("not json");
        peer.send_text("[1,2,3]");
        peer.send_json(&json!({"op": 5, "d": {"eventType": "SceneChanged"}}));
        peer.send_json(&json!({"op": 7, "d": {"requestId": "req_999_0", "requestType": "X"}}));

        peer.handshake().await.unwrap();
        harness
            .client
            .wait_until_ready(Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_second_hello_ignored() {
        let mut harness = Harness::quiet();
        let mut peer = harness.ready().await;

        peer.send_hello(None);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(peer.try_recv().is_none());
        assert!(harness.client.is_ready());
    }

    #[tokio::test]
    async fn test_server_close_during_handshake() {
        let mut harness = Harness::quiet();
        let peer = harness.open(None).await;

        peer.close();
        let err = harness
            .client
            .wait_until_ready(Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(harness.client.state(), HandshakeState::Disconnected);
    }

    #[tokio::test]
    async fn test_client_disconnect_sends_close() {
        let mut harness = Harness::quiet();
        let mut peer = harness.ready().await;

        harness.client.disconnect().await;

        let mut saw_close = false;
        while let Some(command) = peer.recv().await {
            if matches!(command, TransportCommand::Close) {
                saw_close = true;
            }
        }
        assert!(saw_close);
    }
}
