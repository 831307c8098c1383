#[cfg(test)]
#[path = "chats_test.rs"]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::AiConfigApi;
use crate::domain::models::Chat;
use crate::domain::models::ChatList;
use crate::domain::models::ChatUpdate;
use crate::domain::models::ChatWithMessages;
use crate::domain::models::MessageList;
use crate::domain::models::PendingRequest;
use crate::infrastructure::http::ApiError;
use crate::infrastructure::http::Gateway;

#[derive(Serialize)]
struct CreateChatRequest<'a> {
    name: &'a str,
}

pub struct ChatsApi {
    gateway: Arc<Gateway>,
}

impl ChatsApi {
    pub fn new(gateway: Arc<Gateway>) -> ChatsApi {
        return ChatsApi { gateway };
    }

    pub async fn list(&self, page: u32, page_size: u32) -> Result<ChatList, ApiError> {
        let req = PendingRequest::get("/chats/")
            .query("page", page)
            .query("page_size", page_size);
        return self.gateway.send_json(req).await;
    }

    pub async fn get(&self, chat_id: Uuid) -> Result<Chat, ApiError> {
        return self
            .gateway
            .send_json(PendingRequest::get(&format!("/chats/{chat_id}")))
            .await;
    }

    pub async fn get_with_messages(&self, chat_id: Uuid) -> Result<ChatWithMessages, ApiError> {
        return self
            .gateway
            .send_json(PendingRequest::get(&format!(
                "/chats/{chat_id}/with-messages"
            )))
            .await;
    }

    /// Creates the chat, then stores its prompt configuration when either
    /// description was provided.
    pub async fn create(
        &self,
        name: &str,
        client_description: &str,
        special_instructions: &str,
    ) -> Result<Chat, ApiError> {
        let req = PendingRequest::post("/chats/").json(&CreateChatRequest { name })?;
        let chat: Chat = self.gateway.send_json(req).await?;

        if !client_description.is_empty() || !special_instructions.is_empty() {
            AiConfigApi::new(self.gateway.clone())
                .update_chat(chat.id, client_description, special_instructions)
                .await?;
        }

        tracing::info!(chat_id = %chat.id, "Created chat");
        return Ok(chat);
    }

    pub async fn update(&self, chat_id: Uuid, update: &ChatUpdate) -> Result<Chat, ApiError> {
        let req = PendingRequest::put(&format!("/chats/{chat_id}")).json(update)?;
        return self.gateway.send_json(req).await;
    }

    pub async fn delete(&self, chat_id: Uuid) -> Result<(), ApiError> {
        return self
            .gateway
            .send_empty(PendingRequest::delete(&format!("/chats/{chat_id}")))
            .await;
    }

    pub async fn messages(
        &self,
        chat_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<MessageList, ApiError> {
        let req = PendingRequest::get(&format!("/chats/{chat_id}/messages"))
            .query("page", page)
            .query("page_size", page_size);
        return self.gateway.send_json(req).await;
    }
}
