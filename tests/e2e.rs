//! Drives the real router over TCP with the native client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use client::net::api::{BoardApi, HttpApi};
use client::net::session::Session;
use client::state::project::ProjectView;
use client::{ClientConfig, ClientError};
use frames::api::{MoveBody, ReorderBody};
use frames::{Actor, Card, CardStatus, Column, ServerEvent};
use futures::{SinkExt, StreamExt};
use projectboard::config::Config;
use projectboard::routes;
use projectboard::services::persistence;
use projectboard::state::AppState;
use projectboard::store::MemoryStorage;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

struct Server {
    addr: SocketAddr,
    storage: Arc<MemoryStorage>,
    project_id: Uuid,
    u1: Actor,
    u2: Actor,
}

fn card(member: &str) -> Card {
    Card { id: Uuid::new_v4(), member: member.to_owned(), tasks: Vec::new(), status: CardStatus::Todo }
}

fn members(column: &Column) -> Vec<&str> {
    column.cards.iter().map(|c| c.member.as_str()).collect()
}

/// Column A `[x,y,z]` and column B `[p,q]`; `u1` and `u2` may both join.
async fn start_server() -> Server {
    let project_id = Uuid::new_v4();
    let storage = Arc::new(MemoryStorage::new());
    let u1 = Actor { id: Uuid::new_v4(), display_name: "u1".into() };
    let u2 = Actor { id: Uuid::new_v4(), display_name: "u2".into() };
    storage.add_actor("tok-u1", u1.clone());
    storage.add_actor("tok-u2", u2.clone());
    storage.grant(project_id, u1.id);
    storage.grant(project_id, u2.id);
    storage.put_columns(
        project_id,
        vec![
            Column { id: Uuid::new_v4(), project_id, title: "A".into(), cards: vec![card("x"), card("y"), card("z")] },
            Column { id: Uuid::new_v4(), project_id, title: "B".into(), cards: vec![card("p"), card("q")] },
        ],
    );

    let config = Config { column_flush_interval: Duration::from_millis(20), ..Config::default() };
    let state = AppState::new(storage.clone(), config);
    let _persistence = persistence::spawn_persistence_task(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server { addr, storage, project_id, u1, u2 }
}

fn config(server: &Server, token: &str) -> ClientConfig {
    ClientConfig::new(format!("http://{}", server.addr), token)
}

/// Next event satisfying `pred`, skipping others.
async fn next_matching(rx: &mut mpsc::Receiver<ServerEvent>, pred: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.expect("session closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn reorder_move_chat_and_delete_across_two_actors() {
    let server = start_server().await;
    let room = server.project_id;
    let api1 = HttpApi::new(&config(&server, "tok-u1")).unwrap();
    let api2 = HttpApi::new(&config(&server, "tok-u2")).unwrap();

    let (s1, mut rx1) = Session::connect(&config(&server, "tok-u1")).await.unwrap();
    let (s2, mut rx2) = Session::connect(&config(&server, "tok-u2")).await.unwrap();
    s1.join(room);
    next_matching(&mut rx1, |e| matches!(e, ServerEvent::PresenceSnapshot { .. })).await;
    s2.join(room);
    let ServerEvent::PresenceSnapshot { members: present, .. } =
        next_matching(&mut rx2, |e| matches!(e, ServerEvent::PresenceSnapshot { .. })).await
    else {
        unreachable!()
    };
    assert_eq!(present.len(), 1);
    assert_eq!(present[0].actor_id, server.u1.id);
    let joined = next_matching(&mut rx1, |e| matches!(e, ServerEvent::UserJoined { .. })).await;
    assert!(matches!(joined, ServerEvent::UserJoined { actor_id, .. } if actor_id == server.u2.id));

    // Board: reorder then move.
    let columns = api1.fetch_columns(room).await.unwrap();
    let (a, b) = (columns[0].id, columns[1].id);
    let x = columns[0].cards[0].id;

    let reordered = api1.reorder(a, ReorderBody { from_index: 0, to_index: 2 }).await.unwrap();
    assert_eq!(members(&reordered), ["y", "z", "x"]);
    let ServerEvent::ColumnsUpdated { columns: pushed, .. } =
        next_matching(&mut rx2, |e| matches!(e, ServerEvent::ColumnsUpdated { .. })).await
    else {
        unreachable!()
    };
    assert_eq!(members(&pushed[0]), ["y", "z", "x"]);

    let moved = api1
        .move_card(x, MoveBody { from_column_id: a, to_column_id: b, to_card_index: 1 })
        .await
        .unwrap();
    let by_id = |id: Uuid| moved.iter().find(|c| c.id == id).unwrap();
    assert_eq!(members(by_id(a)), ["y", "z"]);
    assert_eq!(members(by_id(b)), ["p", "x", "q"]);

    let seen_by_u2 = api2.fetch_columns(room).await.unwrap();
    assert_eq!(members(&seen_by_u2[1]), ["p", "x", "q"]);

    // Chat: U1 says hi, U2 sees it.
    assert!(s1.send_message(room, "hi", server.u1.id, Some("temp_1".into())));
    let ServerEvent::ReceiveMessage { message, .. } =
        next_matching(&mut rx2, |e| matches!(e, ServerEvent::ReceiveMessage { .. })).await
    else {
        unreachable!()
    };
    assert_eq!(message.text, "hi");
    assert_eq!(message.sender_id, server.u1.id);
    let ServerEvent::ReceiveMessage { client_ref, .. } =
        next_matching(&mut rx1, |e| matches!(e, ServerEvent::ReceiveMessage { .. })).await
    else {
        unreachable!()
    };
    assert_eq!(client_ref.as_deref(), Some("temp_1"));

    // Delete: only the sender may.
    let err = api2.delete_message(message.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Status(403)));
    api1.delete_message(message.id).await.unwrap();
    let deleted = next_matching(&mut rx2, |e| matches!(e, ServerEvent::MessageDeleted { .. })).await;
    assert_eq!(deleted, ServerEvent::MessageDeleted { room_id: room, message_id: message.id });
    assert!(api2.list_messages(room).await.unwrap().is_empty());
    assert!(matches!(api2.delete_message(message.id).await, Err(ClientError::Status(404))));

    // Disconnect leaves the room.
    drop(s1);
    let left = next_matching(&mut rx2, |e| matches!(e, ServerEvent::UserLeft { .. })).await;
    assert_eq!(left, ServerEvent::UserLeft { room_id: room, actor_id: server.u1.id });
    drop(s2);
}

#[tokio::test]
async fn moves_are_flushed_to_storage() {
    let server = start_server().await;
    let api = HttpApi::new(&config(&server, "tok-u1")).unwrap();
    let columns = api.fetch_columns(server.project_id).await.unwrap();
    api.reorder(columns[1].id, ReorderBody { from_index: 0, to_index: 1 }).await.unwrap();

    let flushed = timeout(Duration::from_secs(2), async {
        loop {
            let stored = server.storage.stored_columns(server.project_id);
            if members(&stored[1]) == ["q", "p"] {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(flushed.is_ok(), "reorder never reached storage");
}

#[tokio::test]
async fn project_view_drag_and_drop_over_the_wire() {
    let server = start_server().await;
    let cfg = config(&server, "tok-u1");
    let api = Arc::new(HttpApi::new(&cfg).unwrap());
    let (session, mut rx) = Session::connect(&cfg).await.unwrap();
    let mut view = ProjectView::new(session, api, server.project_id, server.u1.id);
    view.open().await.unwrap();
    let snapshot = next_matching(&mut rx, |e| matches!(e, ServerEvent::PresenceSnapshot { .. })).await;
    assert!(view.handle_event(snapshot, 0));

    view.board.begin_drag(0, 0).unwrap();
    assert!(view.board.hover(1, 1));
    assert!(matches!(view.board.drop_card().await, client::state::board::DropOutcome::Committed));
    assert_eq!(members(&view.board.columns()[1]), ["p", "x", "q"]);

    let temp = view.send_chat("hello", client::state::now_ms()).unwrap();
    let event = next_matching(&mut rx, |e| matches!(e, ServerEvent::ReceiveMessage { .. })).await;
    view.handle_event(event, 2);
    assert_eq!(view.chat.pending_count(), 0);
    assert_eq!(view.chat.confirmed().next().map(|m| m.text.as_str()), Some("hello"));
    assert!(temp.starts_with("temp_"));
}

#[tokio::test]
async fn websocket_rejects_bad_token_and_unknown_events() {
    let server = start_server().await;
    let bad = Session::connect(&config(&server, "nope")).await;
    assert!(matches!(bad, Err(ClientError::Connection(_))));

    let url = format!("ws://{}/ws?token=tok-u1", server.addr);
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    socket
        .send(WsMessage::Text(r#"{"event":"board:teleport","data":{}}"#.into()))
        .await
        .unwrap();
    let reply = timeout(Duration::from_secs(2), socket.next()).await.unwrap().unwrap().unwrap();
    let WsMessage::Text(text) = reply else {
        panic!("expected text frame, got {reply:?}");
    };
    let event = frames::decode_server_event(text.as_str()).unwrap();
    assert!(matches!(event, ServerEvent::Error { ref code, .. } if code == "E_UNKNOWN_EVENT"));
}
