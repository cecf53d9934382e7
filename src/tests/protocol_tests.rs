use crate::protocol::*;

#[test]
fn test_encode_join_frame() {
    let frame = encode_frame(&OutboundEvent::JoinChat {
        peer_id: "bob".to_string(),
    })
    .expect("Failed to encode");

    assert!(frame.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(frame.trim()).expect("Invalid JSON");
    assert_eq!(value["event"], "joinChat");
    assert_eq!(value["data"]["peerId"], "bob");
}

#[test]
fn test_encode_send_frame() {
    let frame = encode_frame(&OutboundEvent::SendMessage {
        peer_id: "bob".to_string(),
        text: "hello there".to_string(),
    })
    .expect("Failed to encode");

    let value: serde_json::Value = serde_json::from_str(frame.trim()).expect("Invalid JSON");
    assert_eq!(value["event"], "sendMessage");
    assert_eq!(value["data"]["peerId"], "bob");
    assert_eq!(value["data"]["text"], "hello there");
}

#[test]
fn test_decode_online_users() {
    let event = decode_frame(r#"{"event":"onlineUsers","data":["alice","bob"]}"#).unwrap();
    assert_eq!(
        event,
        InboundEvent::OnlineUsers(vec!["alice".to_string(), "bob".to_string()])
    );
}

#[test]
fn test_decode_user_offline_with_millis_and_rfc3339() {
    let event = decode_frame(r#"{"event":"userOffline","data":{"userId":"bob","lastSeenAt":1700000000000}}"#)
        .unwrap();
    assert_eq!(
        event,
        InboundEvent::UserOffline {
            user_id: "bob".to_string(),
            last_seen_at: Some(1_700_000_000_000),
        }
    );

    let event = decode_frame(
        r#"{"event":"userOffline","data":{"userId":"bob","lastSeenAt":"2023-11-14T22:13:20Z"}}"#,
    )
    .unwrap();
    assert_eq!(
        event,
        InboundEvent::UserOffline {
            user_id: "bob".to_string(),
            last_seen_at: Some(1_700_000_000_000),
        }
    );
}

#[test]
fn test_decode_user_offline_without_timestamp() {
    let event = decode_frame(r#"{"event":"userOffline","data":{"userId":"bob","lastSeenAt":null}}"#).unwrap();
    assert_eq!(
        event,
        InboundEvent::UserOffline {
            user_id: "bob".to_string(),
            last_seen_at: None,
        }
    );
}

#[test]
fn test_decode_message_received_ignores_extra_fields() {
    let event = decode_frame(
        r#"{"event":"messageReceived","data":{"senderId":"bob","text":"hey","firstName":"Bob","lastName":"B"}}"#,
    )
    .unwrap();
    assert_eq!(
        event,
        InboundEvent::MessageReceived {
            sender_id: "bob".to_string(),
            text: "hey".to_string(),
            created_at: None,
            first_name: Some("Bob".to_string()),
        }
    );
}

#[test]
fn test_decode_informational_events() {
    assert_eq!(
        decode_frame(r#"{"event":"messagesSeen","data":{"seenBy":"bob"}}"#).unwrap(),
        InboundEvent::MessagesSeen {
            seen_by: "bob".to_string()
        }
    );
    assert_eq!(
        decode_frame(r#"{"event":"errorMessage","data":"not connected"}"#).unwrap(),
        InboundEvent::ErrorMessage("not connected".to_string())
    );
}

#[test]
fn test_decode_unknown_event() {
    let event = decode_frame(r#"{"event":"typing","data":{"userId":"bob"}}"#).unwrap();
    assert_eq!(event, InboundEvent::Unknown("typing".to_string()));
    assert_eq!(event.name(), "typing");
}

#[test]
fn test_decode_rejects_malformed_frames() {
    assert!(matches!(decode_frame("not json"), Err(crate::Error::Protocol(_))));
    assert!(matches!(
        decode_frame(r#"{"event":"userOnline","data":{"id":"bob"}}"#),
        Err(crate::Error::Protocol(_))
    ));
}

#[test]
fn test_timestamp_parse_text() {
    assert_eq!(timestamp::parse_text("1000"), Ok(1000));
    assert_eq!(timestamp::parse_text("1970-01-01T00:00:01Z"), Ok(1000));
    assert!(timestamp::parse_text("yesterday").is_err());
}
