//! Scripted [`BoardApi`] for driving the mirrors without a server.

use std::sync::Mutex;

use async_trait::async_trait;
use frames::api::{MoveBody, ReorderBody};
use frames::{Card, CardStatus, Column, Message};
use uuid::Uuid;

use crate::error::ClientError;
use crate::net::api::BoardApi;

#[derive(Default)]
pub(crate) struct Script {
    /// What `fetch_columns` returns: the server's truth.
    pub columns: Vec<Column>,
    pub messages: Vec<Message>,
    /// Status returned by reorder/move instead of success.
    pub reject_commit: Option<u16>,
    pub reject_delete: Option<u16>,
    pub fail_fetch: bool,
    pub calls: Vec<String>,
}

#[derive(Default)]
pub(crate) struct MockApi {
    pub script: Mutex<Script>,
}

impl MockApi {
    pub fn with_columns(columns: Vec<Column>) -> Self {
        let api = Self::default();
        api.script.lock().unwrap().columns = columns;
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn set_columns(&self, columns: Vec<Column>) {
        self.script.lock().unwrap().columns = columns;
    }
}

#[async_trait]
impl BoardApi for MockApi {
    async fn fetch_columns(&self, _project_id: Uuid) -> Result<Vec<Column>, ClientError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("fetch".into());
        if script.fail_fetch {
            return Err(ClientError::Timeout);
        }
        Ok(script.columns.clone())
    }

    async fn reorder(&self, _column_id: Uuid, body: ReorderBody) -> Result<Column, ClientError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("reorder {}->{}", body.from_index, body.to_index));
        match script.reject_commit {
            Some(status) => Err(ClientError::Status(status)),
            None => Ok(script.columns[0].clone()),
        }
    }

    async fn move_card(&self, _card_id: Uuid, body: MoveBody) -> Result<Vec<Column>, ClientError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("move @{}", body.to_card_index));
        match script.reject_commit {
            Some(status) => Err(ClientError::Status(status)),
            None => Ok(script.columns.clone()),
        }
    }

    async fn list_messages(&self, _room_id: Uuid) -> Result<Vec<Message>, ClientError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("history".into());
        Ok(script.messages.clone())
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), ClientError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("delete {message_id}"));
        match script.reject_delete {
            Some(status) => Err(ClientError::Status(status)),
            None => Ok(()),
        }
    }
}

pub(crate) fn card(member: &str) -> Card {
    Card { id: Uuid::new_v4(), member: member.to_owned(), tasks: Vec::new(), status: CardStatus::Todo }
}

pub(crate) fn column(project_id: Uuid, title: &str, cards: Vec<Card>) -> Column {
    Column { id: Uuid::new_v4(), project_id, title: title.to_owned(), cards }
}

pub(crate) fn members(column: &Column) -> Vec<&str> {
    column.cards.iter().map(|c| c.member.as_str()).collect()
}
