//! Request/response calls against the board server.
//!
//! [`BoardApi`] is the seam the board and chat mirrors depend on, so they can
//! be driven by a scripted implementation in tests. [`HttpApi`] is the real
//! implementation over `reqwest`, with every request bounded by the
//! configured timeout.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use frames::api::{CreateCardBody, CreateColumnBody, MoveBody, ReorderBody};
use frames::{Column, Message};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;

#[async_trait]
pub trait BoardApi: Send + Sync {
    /// `GET /columns?projectId=`
    async fn fetch_columns(&self, project_id: Uuid) -> Result<Vec<Column>, ClientError>;

    /// `PATCH /columns/{columnId}/cards/reorder`
    async fn reorder(&self, column_id: Uuid, body: ReorderBody) -> Result<Column, ClientError>;

    /// `PATCH /cards/{cardId}/move`
    async fn move_card(&self, card_id: Uuid, body: MoveBody) -> Result<Vec<Column>, ClientError>;

    /// `GET /messages/{roomId}`
    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, ClientError>;

    /// `DELETE /messages/{messageId}`
    async fn delete_message(&self, message_id: Uuid) -> Result<(), ClientError>;
}

pub(crate) fn columns_endpoint(base: &str, project_id: Uuid) -> String {
    format!("{base}/columns?projectId={project_id}")
}

pub(crate) fn reorder_endpoint(base: &str, column_id: Uuid) -> String {
    format!("{base}/columns/{column_id}/cards/reorder")
}

pub(crate) fn move_endpoint(base: &str, card_id: Uuid) -> String {
    format!("{base}/cards/{card_id}/move")
}

pub(crate) fn messages_endpoint(base: &str, id: Uuid) -> String {
    format!("{base}/messages/{id}")
}

/// HTTP implementation of [`BoardApi`] plus board administration calls.
#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, base_url: config.base_url.clone(), token: config.token.clone() })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), url = %response.url(), "request rejected");
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(builder).await?.json::<T>().await?)
    }

    /// `POST /columns`
    ///
    /// # Errors
    ///
    /// Transport failure, timeout, or non-success status.
    pub async fn create_column(&self, project_id: Uuid, title: &str) -> Result<Column, ClientError> {
        let body = CreateColumnBody { project_id, title: title.to_owned() };
        let url = format!("{}/columns", self.base_url);
        self.send_json(self.request(Method::POST, &url).json(&body)).await
    }

    /// `DELETE /columns/{columnId}`
    ///
    /// # Errors
    ///
    /// Transport failure, timeout, or non-success status.
    pub async fn delete_column(&self, column_id: Uuid) -> Result<(), ClientError> {
        let url = format!("{}/columns/{column_id}", self.base_url);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    /// `POST /columns/{columnId}/cards`
    ///
    /// # Errors
    ///
    /// Transport failure, timeout, or non-success status.
    pub async fn create_card(&self, column_id: Uuid, body: &CreateCardBody) -> Result<Column, ClientError> {
        let url = format!("{}/columns/{column_id}/cards", self.base_url);
        self.send_json(self.request(Method::POST, &url).json(body)).await
    }

    /// `DELETE /columns/{columnId}/cards/{cardId}`
    ///
    /// # Errors
    ///
    /// Transport failure, timeout, or non-success status.
    pub async fn delete_card(&self, column_id: Uuid, card_id: Uuid) -> Result<Column, ClientError> {
        let url = format!("{}/columns/{column_id}/cards/{card_id}", self.base_url);
        self.send_json(self.request(Method::DELETE, &url)).await
    }
}

#[async_trait]
impl BoardApi for HttpApi {
    async fn fetch_columns(&self, project_id: Uuid) -> Result<Vec<Column>, ClientError> {
        let url = columns_endpoint(&self.base_url, project_id);
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn reorder(&self, column_id: Uuid, body: ReorderBody) -> Result<Column, ClientError> {
        let url = reorder_endpoint(&self.base_url, column_id);
        self.send_json(self.request(Method::PATCH, &url).json(&body)).await
    }

    async fn move_card(&self, card_id: Uuid, body: MoveBody) -> Result<Vec<Column>, ClientError> {
        let url = move_endpoint(&self.base_url, card_id);
        self.send_json(self.request(Method::PATCH, &url).json(&body)).await
    }

    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, ClientError> {
        let url = messages_endpoint(&self.base_url, room_id);
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), ClientError> {
        let url = messages_endpoint(&self.base_url, message_id);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}
