use super::*;
use serde_json::json;
use uuid::Uuid;

#[test]
fn decode_join_project() {
    let room_id = Uuid::new_v4();
    let text = json!({"event": "join-project", "data": {"roomId": room_id}}).to_string();
    let event = decode_client_event(&text).expect("decode");
    assert_eq!(event, ClientEvent::JoinProject { room_id });
    assert_eq!(event.name(), "join-project");
    assert_eq!(event.room_id(), room_id);
}

#[test]
fn decode_cursor_move_without_element_id() {
    let room_id = Uuid::new_v4();
    let text = json!({
        "event": "cursor-move",
        "data": {"roomId": room_id, "position": {"x": 10.5, "y": -3.0}}
    })
    .to_string();
    let ClientEvent::CursorMove { position, element_id, .. } = decode_client_event(&text).expect("decode") else {
        panic!("expected cursor-move");
    };
    assert!((position.x - 10.5).abs() < f64::EPSILON);
    assert!((position.y + 3.0).abs() < f64::EPSILON);
    assert!(element_id.is_none());
}

#[test]
fn decode_send_message_accepts_optional_fields() {
    let room_id = Uuid::new_v4();
    let sender = Uuid::new_v4();
    let text = json!({
        "event": "send_message",
        "data": {"roomId": room_id, "text": "hi", "senderId": sender, "clientRef": "temp_1"}
    })
    .to_string();
    let event = decode_client_event(&text).expect("decode");
    assert_eq!(
        event,
        ClientEvent::SendMessage {
            room_id,
            text: "hi".into(),
            sender_id: Some(sender),
            client_ref: Some("temp_1".into()),
        }
    );
}

#[test]
fn decode_rejects_unknown_event_name() {
    let text = json!({"event": "object:create", "data": {}}).to_string();
    let err = decode_client_event(&text).expect_err("unknown event");
    assert!(matches!(err, CodecError::UnknownEvent(ref name) if name == "object:create"));
    assert_eq!(err.error_code(), "E_UNKNOWN_EVENT");
}

#[test]
fn decode_rejects_server_event_sent_by_client() {
    let text = json!({"event": "user-left", "data": {"roomId": Uuid::nil(), "actorId": Uuid::nil()}}).to_string();
    let err = decode_client_event(&text).expect_err("wrong direction");
    assert!(matches!(err, CodecError::UnknownEvent(_)));
}

#[test]
fn decode_rejects_non_json() {
    let err = decode_client_event("not json").expect_err("malformed");
    assert!(matches!(err, CodecError::Malformed(_)));
    assert_eq!(err.error_code(), "E_INVALID_FRAME");
}

#[test]
fn decode_rejects_missing_event_name() {
    let err = decode_client_event(r#"{"data": {}}"#).expect_err("malformed");
    assert!(matches!(err, CodecError::Malformed(_)));
}

#[test]
fn decode_rejects_bad_payload_for_known_event() {
    let text = json!({"event": "join-project", "data": {"roomId": "not-a-uuid"}}).to_string();
    let err = decode_client_event(&text).expect_err("payload");
    assert!(matches!(err, CodecError::Payload { ref event, .. } if event == "join-project"));
}

#[test]
fn encoded_server_event_uses_wire_names() {
    let actor_id = Uuid::new_v4();
    let room_id = Uuid::new_v4();
    let event = ServerEvent::UserJoined {
        room_id,
        actor_id,
        display_name: "Ada".into(),
        color: "#E57373".into(),
    };
    let text = encode_event(&event).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["event"], "user-joined");
    assert_eq!(value["data"]["actorId"], json!(actor_id));
    assert_eq!(value["data"]["displayName"], "Ada");

    let decoded = decode_server_event(&text).expect("decode");
    assert_eq!(decoded, event);
}

#[test]
fn receive_message_omits_absent_client_ref() {
    let message = Message {
        id: Uuid::new_v4(),
        room_id: Uuid::new_v4(),
        sender_id: Uuid::new_v4(),
        text: "hi".into(),
        created_at: 42,
    };
    let text = encode_event(&ServerEvent::ReceiveMessage { message, client_ref: None }).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert!(value["data"].get("clientRef").is_none());
    assert_eq!(value["data"]["message"]["createdAt"], 42);
}

#[test]
fn error_from_carries_code_and_message() {
    let err = CodecError::UnknownEvent("nope".into());
    let event = ServerEvent::error_from(&err);
    assert_eq!(
        event,
        ServerEvent::Error { code: "E_UNKNOWN_EVENT".into(), message: "unknown event: nope".into(), room_id: None }
    );
    let text = encode_event(&event).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert!(value["data"].get("roomId").is_none());
}

#[test]
fn room_scoped_error_round_trips_room_id() {
    let room_id = Uuid::new_v4();
    let event = ServerEvent::error_in_room(room_id, &CodecError::UnknownEvent("nope".into()));
    let text = encode_event(&event).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["data"]["roomId"], json!(room_id));
    assert_eq!(decode_server_event(&text).expect("decode"), event);
}

#[test]
fn column_deleted_uses_wire_name() {
    let room_id = Uuid::new_v4();
    let column_id = Uuid::new_v4();
    let event = ServerEvent::ColumnDeleted { room_id, column_id };
    assert!(ServerEvent::NAMES.contains(&event.name()));
    let text = encode_event(&event).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["event"], "column-deleted");
    assert_eq!(value["data"]["columnId"], json!(column_id));
    assert_eq!(decode_server_event(&text).expect("decode"), event);
}

#[test]
fn card_status_storage_names() {
    assert_eq!(CardStatus::InProgress.as_str(), "in_progress");
    assert_eq!(CardStatus::parse("done"), CardStatus::Done);
    assert_eq!(CardStatus::parse("garbage"), CardStatus::Todo);
    assert_eq!(serde_json::to_value(CardStatus::InProgress).expect("json"), json!("in_progress"));
}

#[test]
fn move_intent_noop_and_reorder() {
    let col = Uuid::new_v4();
    let other = Uuid::new_v4();
    let card = Uuid::new_v4();
    let same = MoveIntent { card_id: card, from_column_id: col, to_column_id: col, from_index: 2, to_index: 2 };
    assert!(same.is_noop());
    assert!(same.is_reorder());

    let across = MoveIntent { to_column_id: other, ..same };
    assert!(!across.is_noop());
    assert!(!across.is_reorder());
}

#[test]
fn column_position_lookup() {
    let card = Card { id: Uuid::new_v4(), member: "p".into(), tasks: vec![], status: CardStatus::Todo };
    let column = Column { id: Uuid::new_v4(), project_id: Uuid::new_v4(), title: "A".into(), cards: vec![card.clone()] };
    assert_eq!(column.position_of(card.id), Some(0));
    assert_eq!(column.position_of(Uuid::new_v4()), None);
    assert_eq!(column.card_ids(), vec![card.id]);
}
