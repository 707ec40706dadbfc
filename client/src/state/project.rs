//! One open project: the connection-scoped context the UI talks to.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`ProjectView`] is built once per session and project from an explicit
//! [`Session`] and [`BoardApi`], and owns the board, presence, cursor, and
//! chat mirrors for that room. Server events from the session's receiver are
//! fed in through [`ProjectView::handle_event`]; events for other rooms are
//! ignored so several views can share one connection.

#[cfg(test)]
#[path = "project_test.rs"]
mod project_test;

use std::sync::Arc;

use frames::{ErrorCode, Position, ServerEvent};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::net::api::BoardApi;
use crate::net::session::Session;
use crate::state::board::BoardClient;
use crate::state::chat::ChatLog;
use crate::state::cursor::CursorTracker;
use crate::state::presence::PresenceMirror;

/// Error codes the server answers a rejected `send_message` with. Those
/// frames carry the room id, so only the view that sent reacts.
const SEND_REJECTIONS: &[&str] = &["E_EMPTY_MESSAGE", "E_MESSAGE_TOO_LONG", "E_NOT_JOINED"];

pub struct ProjectView<A: BoardApi> {
    project_id: Uuid,
    actor_id: Uuid,
    session: Session,
    api: Arc<A>,
    pub board: BoardClient<A>,
    pub presence: PresenceMirror,
    pub cursors: CursorTracker,
    pub chat: ChatLog,
    notices: Vec<String>,
}

impl<A: BoardApi> ProjectView<A> {
    pub fn new(session: Session, api: Arc<A>, project_id: Uuid, actor_id: Uuid) -> Self {
        Self {
            project_id,
            actor_id,
            board: BoardClient::new(api.clone(), project_id),
            session,
            api,
            presence: PresenceMirror::default(),
            cursors: CursorTracker::default(),
            chat: ChatLog::new(project_id),
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// Join the room and load columns and chat history.
    ///
    /// # Errors
    ///
    /// Propagates a failed columns or history fetch.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        if !self.session.join(self.project_id) {
            debug!(project_id = %self.project_id, "project: join dropped; connection closed");
        }
        self.board.load().await?;
        let history = self.api.list_messages(self.project_id).await?;
        self.chat.load_history(history);
        Ok(())
    }

    /// Swap in a fresh connection after the old one dropped. Presence and
    /// cursors from the old connection are stale and are discarded before
    /// the room is rejoined and re-synced.
    ///
    /// # Errors
    ///
    /// As for [`ProjectView::open`].
    pub async fn reconnect(&mut self, session: Session) -> Result<(), ClientError> {
        debug!(project_id = %self.project_id, "project: reconnecting");
        self.session = session;
        self.presence.clear();
        self.cursors.clear_room(self.project_id);
        self.open().await
    }

    /// Leave the room and forget its ephemeral state.
    pub fn close(&mut self) {
        self.session.leave(self.project_id);
        self.presence.clear_room(self.project_id);
        self.cursors.clear_room(self.project_id);
    }

    /// Apply one server event. Returns whether any mirror changed.
    pub fn handle_event(&mut self, event: ServerEvent, now_ms: i64) -> bool {
        match event {
            ServerEvent::PresenceSnapshot { room_id, .. } | ServerEvent::UserJoined { room_id, .. }
                if room_id == self.project_id =>
            {
                self.presence.apply(&event)
            }
            ServerEvent::UserLeft { room_id, actor_id } if room_id == self.project_id => {
                self.cursors.remove(room_id, actor_id);
                self.presence.apply(&event)
            }
            ServerEvent::RemoteCursorMove { room_id, actor_id, position, element_id } if room_id == self.project_id => {
                self.cursors.observe(room_id, actor_id, position, element_id, now_ms);
                true
            }
            ServerEvent::ReceiveMessage { message, client_ref } => {
                if message.room_id != self.project_id {
                    return false;
                }
                self.chat.apply_received(message, client_ref.as_deref());
                true
            }
            ServerEvent::MessageDeleted { room_id, message_id } if room_id == self.project_id => {
                self.chat.apply_deleted(message_id)
            }
            ServerEvent::ColumnsUpdated { room_id, columns } if room_id == self.project_id => {
                self.board.apply_remote_columns(columns)
            }
            ServerEvent::ColumnDeleted { room_id, column_id } if room_id == self.project_id => {
                self.board.apply_column_deleted(column_id)
            }
            ServerEvent::Error { code, message, room_id } => {
                if room_id.is_some_and(|r| r != self.project_id) {
                    return false;
                }
                warn!(%code, %message, "project: server error");
                if room_id.is_some() && SEND_REJECTIONS.contains(&code.as_str()) {
                    self.chat.fail_oldest_pending();
                    self.notices.push(message);
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    /// Periodic housekeeping.
    pub fn tick(&mut self, now_ms: i64) {
        self.cursors.prune(now_ms);
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Send a chat message optimistically. Returns the pending entry's temp
    /// id, or `None` if nothing was sent.
    pub fn send_chat(&mut self, text: &str, now_ms: i64) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let temp_id = self.chat.push_optimistic(self.actor_id, text, now_ms);
        if !self.session.send_message(self.project_id, text, self.actor_id, Some(temp_id.clone())) {
            debug!(project_id = %self.project_id, "project: message dropped; connection closed");
            self.chat.fail_pending(&temp_id);
            return None;
        }
        Some(temp_id)
    }

    pub fn send_cursor(&self, position: Position, element_id: Option<String>) -> bool {
        self.session.send_cursor(self.project_id, position, element_id)
    }

    /// Delete a message optimistically; on failure the message is restored
    /// and a notice is recorded.
    ///
    /// # Errors
    ///
    /// Returns the server's refusal, e.g. `Status(403)` for a non-sender.
    pub async fn delete_chat(&mut self, message_id: Uuid) -> Result<(), ClientError> {
        let removed = self.chat.begin_delete(message_id);
        match self.api.delete_message(message_id).await {
            Ok(()) => {
                self.chat.confirm_delete(message_id);
                Ok(())
            }
            Err(e) => {
                if removed {
                    self.chat.rollback_delete(message_id);
                }
                let notice = if e.is_permission() {
                    "You can only delete your own messages".to_owned()
                } else {
                    format!("Could not delete message ({})", e.error_code())
                };
                self.notices.push(notice);
                Err(e)
            }
        }
    }

    /// User-visible notices accumulated since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}
