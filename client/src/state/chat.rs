//! Local message list for one room, with optimistic send and delete.
//!
//! SYSTEM CONTEXT
//! ==============
//! A sent message is rendered at once as a pending entry with a temporary
//! `temp_<ms>` id, which is also sent as the message's `clientRef`. When the
//! server's broadcast arrives it replaces the pending entry carrying the
//! echoed ref; without a ref the first pending entry with the same text,
//! sender, and room is replaced instead. Anything unmatched is appended.
//!
//! Deletes are applied locally first and rolled back to the original index
//! if the server refuses.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::collections::HashMap;

use frames::Message;
use uuid::Uuid;

/// A message sent from here that the server has not echoed yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMessage {
    pub temp_id: String,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEntry {
    Pending(PendingMessage),
    Confirmed(Message),
}

impl ChatEntry {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Pending(p) => &p.text,
            Self::Confirmed(m) => &m.text,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    fn message_id(&self) -> Option<Uuid> {
        match self {
            Self::Confirmed(m) => Some(m.id),
            Self::Pending(_) => None,
        }
    }

    fn pending(&self) -> Option<&PendingMessage> {
        match self {
            Self::Pending(p) => Some(p),
            Self::Confirmed(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatLog {
    room_id: Uuid,
    entries: Vec<ChatEntry>,
    /// Locally removed messages awaiting the server's answer: original index.
    deleting: HashMap<Uuid, (usize, Message)>,
}

impl ChatLog {
    #[must_use]
    pub fn new(room_id: Uuid) -> Self {
        Self { room_id, entries: Vec::new(), deleting: HashMap::new() }
    }

    #[must_use]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|e| match e {
            ChatEntry::Confirmed(m) => Some(m),
            ChatEntry::Pending(_) => None,
        })
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Replace confirmed messages with the server log. Pending sends stay
    /// at the tail.
    pub fn load_history(&mut self, messages: Vec<Message>) {
        let pending: Vec<_> = self.entries.drain(..).filter(ChatEntry::is_pending).collect();
        self.entries = messages
            .into_iter()
            .filter(|m| m.room_id == self.room_id)
            .map(ChatEntry::Confirmed)
            .chain(pending)
            .collect();
        self.deleting.clear();
    }

    // =========================================================================
    // SEND
    // =========================================================================

    /// Render a message before the server has seen it. Returns its temp id.
    pub fn push_optimistic(&mut self, sender_id: Uuid, text: &str, now_ms: i64) -> String {
        let base = format!("temp_{now_ms}");
        let mut temp_id = base.clone();
        let mut n = 1;
        while self.entries.iter().any(|e| e.pending().is_some_and(|p| p.temp_id == temp_id)) {
            temp_id = format!("{base}_{n}");
            n += 1;
        }
        self.entries.push(ChatEntry::Pending(PendingMessage {
            temp_id: temp_id.clone(),
            room_id: self.room_id,
            sender_id,
            text: text.to_owned(),
            created_at: now_ms,
        }));
        temp_id
    }

    /// Apply a broadcast message. Returns `true` if it replaced a pending
    /// entry, `false` if it was appended or ignored.
    pub fn apply_received(&mut self, message: Message, client_ref: Option<&str>) -> bool {
        if message.room_id != self.room_id {
            return false;
        }
        if self.entries.iter().any(|e| e.message_id() == Some(message.id)) {
            return false;
        }

        let by_ref = client_ref.and_then(|r| {
            self.entries
                .iter()
                .position(|e| e.pending().is_some_and(|p| p.temp_id == r))
        });
        let slot = by_ref.or_else(|| {
            self.entries.iter().position(|e| {
                e.pending().is_some_and(|p| {
                    p.text == message.text && p.sender_id == message.sender_id && p.room_id == message.room_id
                })
            })
        });

        match slot {
            Some(index) => {
                self.entries[index] = ChatEntry::Confirmed(message);
                true
            }
            None => {
                self.entries.push(ChatEntry::Confirmed(message));
                false
            }
        }
    }

    /// Drop a pending entry whose send failed.
    pub fn fail_pending(&mut self, temp_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.pending().is_none_or(|p| p.temp_id != temp_id));
        before != self.entries.len()
    }

    /// Drop the oldest pending entry. Used when the server rejects a send
    /// without saying which one.
    pub fn fail_oldest_pending(&mut self) -> Option<PendingMessage> {
        let index = self.entries.iter().position(ChatEntry::is_pending)?;
        match self.entries.remove(index) {
            ChatEntry::Pending(p) => Some(p),
            ChatEntry::Confirmed(_) => None,
        }
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// A `message_deleted` broadcast.
    pub fn apply_deleted(&mut self, message_id: Uuid) -> bool {
        let removed = self.deleting.remove(&message_id).is_some();
        let before = self.entries.len();
        self.entries.retain(|e| e.message_id() != Some(message_id));
        removed || before != self.entries.len()
    }

    /// Remove locally ahead of the server's answer.
    pub fn begin_delete(&mut self, message_id: Uuid) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.message_id() == Some(message_id)) else {
            return false;
        };
        if let ChatEntry::Confirmed(message) = self.entries.remove(index) {
            self.deleting.insert(message_id, (index, message));
        }
        true
    }

    pub fn confirm_delete(&mut self, message_id: Uuid) {
        self.deleting.remove(&message_id);
    }

    /// Put a refused delete back where it was.
    pub fn rollback_delete(&mut self, message_id: Uuid) -> bool {
        let Some((index, message)) = self.deleting.remove(&message_id) else {
            return false;
        };
        let index = index.min(self.entries.len());
        self.entries.insert(index, ChatEntry::Confirmed(message));
        true
    }
}
