//! Chat routes: room history and authorized deletion.
//!
//! Sending happens over the websocket so delivery order matches the log.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::Message;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::chat::{self, ChatError};
use crate::state::AppState;

/// `GET /messages/:room_id`: room log in arrival order.
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let messages = chat::history(&state, &auth.actor, room_id)
        .await
        .map_err(chat_error_to_status)?;
    Ok(Json(messages))
}

/// `DELETE /messages/:message_id`: 200 on success, 403 for non-senders.
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    chat::delete_message(&state, message_id, &auth.actor)
        .await
        .map_err(chat_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub(crate) fn chat_error_to_status(err: ChatError) -> StatusCode {
    match err {
        ChatError::NotFound(_) | ChatError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Permission(_) => StatusCode::FORBIDDEN,
        ChatError::EmptyText | ChatError::TooLong => StatusCode::BAD_REQUEST,
        ChatError::NotJoined(_) => StatusCode::CONFLICT,
        ChatError::Storage(e) => {
            tracing::error!(error = %e, "chat request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session;
    use crate::state::test_helpers;
    use tokio::sync::mpsc;

    #[test]
    fn chat_error_to_status_maps_permission_to_403() {
        assert_eq!(chat_error_to_status(ChatError::Permission(Uuid::nil())), StatusCode::FORBIDDEN);
        assert_eq!(chat_error_to_status(ChatError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(chat_error_to_status(ChatError::EmptyText), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_handler_enforces_sender() {
        let (state, storage) = test_helpers::test_app_state();
        let room_id = Uuid::new_v4();
        let u1 = test_helpers::actor("u1");
        let u2 = test_helpers::actor("u2");
        storage.grant(room_id, u1.id);
        storage.grant(room_id, u2.id);
        let (tx, _rx) = mpsc::channel(8);
        session::join(&state, room_id, &u1, Uuid::new_v4(), tx).await.unwrap();
        let sent = chat::send_message(&state, room_id, &u1, "hi", None).await.unwrap();

        let status = delete_message(State(state.clone()), AuthUser { actor: u2.clone() }, Path(sent.id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);

        delete_message(State(state.clone()), AuthUser { actor: u1 }, Path(sent.id)).await.unwrap();
        let Json(log) = history(State(state.clone()), AuthUser { actor: u2.clone() }, Path(room_id)).await.unwrap();
        assert!(log.is_empty());

        let status = delete_message(State(state), AuthUser { actor: u2 }, Path(sent.id)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
