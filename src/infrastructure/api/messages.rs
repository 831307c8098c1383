#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::models::ImportedMessage;
use crate::domain::models::Message;
use crate::domain::models::MessageRole;
use crate::domain::models::PendingRequest;
use crate::infrastructure::http::ApiError;
use crate::infrastructure::http::Gateway;

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    chat_id: Uuid,
    content: &'a str,
    role: MessageRole,
}

#[derive(Serialize)]
struct UpdateMessageRequest<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct GenerateRequest {
    chat_id: Uuid,
    context_messages_count: u32,
}

#[derive(Serialize)]
struct ReviseRequest<'a> {
    message_id: Uuid,
    revision_instructions: &'a str,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    chat_id: Uuid,
    messages: &'a [ImportedMessage],
}

pub struct MessagesApi {
    gateway: Arc<Gateway>,
}

impl MessagesApi {
    pub fn new(gateway: Arc<Gateway>) -> MessagesApi {
        return MessagesApi { gateway };
    }

    pub async fn create(
        &self,
        chat_id: Uuid,
        content: &str,
        role: MessageRole,
    ) -> Result<Message, ApiError> {
        let req = PendingRequest::post("/messages/").json(&CreateMessageRequest {
            chat_id,
            content,
            role,
        })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn update(&self, message_id: Uuid, content: &str) -> Result<Message, ApiError> {
        let req = PendingRequest::put(&format!("/messages/{message_id}"))
            .json(&UpdateMessageRequest { content })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn delete(&self, message_id: Uuid) -> Result<(), ApiError> {
        return self
            .gateway
            .send_empty(PendingRequest::delete(&format!("/messages/{message_id}")))
            .await;
    }

    /// Asks the AI backend to draft the next manager reply from the last
    /// `context_messages_count` messages of the chat.
    pub async fn generate_ai_response(
        &self,
        chat_id: Uuid,
        context_messages_count: u32,
    ) -> Result<Message, ApiError> {
        let req = PendingRequest::post("/messages/generate-ai-response").json(&GenerateRequest {
            chat_id,
            context_messages_count,
        })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn revise_with_ai(
        &self,
        message_id: Uuid,
        revision_instructions: &str,
    ) -> Result<Message, ApiError> {
        let req = PendingRequest::post("/messages/revise-with-ai").json(&ReviseRequest {
            message_id,
            revision_instructions,
        })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn import(
        &self,
        chat_id: Uuid,
        messages: &[ImportedMessage],
    ) -> Result<Vec<Message>, ApiError> {
        let req = PendingRequest::post("/messages/import").json(&ImportRequest { chat_id, messages })?;
        return self.gateway.send_json(req).await;
    }
}
