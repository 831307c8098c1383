#[cfg(test)]
#[path = "ai_config_test.rs"]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::models::AiConfig;
use crate::domain::models::PendingRequest;
use crate::infrastructure::http::ApiError;
use crate::infrastructure::http::Gateway;

#[derive(Serialize)]
struct UpdateAiConfigRequest<'a> {
    client_description: &'a str,
    special_instructions: &'a str,
}

pub struct AiConfigApi {
    gateway: Arc<Gateway>,
}

impl AiConfigApi {
    pub fn new(gateway: Arc<Gateway>) -> AiConfigApi {
        return AiConfigApi { gateway };
    }

    fn path(chat_id: Option<Uuid>) -> String {
        if let Some(id) = chat_id {
            return format!("/ai-config/chat/{id}");
        }
        return "/ai-config/global".to_string();
    }

    /// Returns `None` when no configuration has been saved yet.
    pub async fn get(&self, chat_id: Option<Uuid>) -> Result<Option<AiConfig>, ApiError> {
        return self
            .gateway
            .send_json(PendingRequest::get(&AiConfigApi::path(chat_id)))
            .await;
    }

    pub async fn global(&self) -> Result<Option<AiConfig>, ApiError> {
        return self.get(None).await;
    }

    pub async fn for_chat(&self, chat_id: Uuid) -> Result<Option<AiConfig>, ApiError> {
        return self.get(Some(chat_id)).await;
    }

    pub async fn update(
        &self,
        chat_id: Option<Uuid>,
        client_description: &str,
        special_instructions: &str,
    ) -> Result<AiConfig, ApiError> {
        let req = PendingRequest::put(&AiConfigApi::path(chat_id)).json(&UpdateAiConfigRequest {
            client_description,
            special_instructions,
        })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn update_global(
        &self,
        client_description: &str,
        special_instructions: &str,
    ) -> Result<AiConfig, ApiError> {
        return self
            .update(None, client_description, special_instructions)
            .await;
    }

    pub async fn update_chat(
        &self,
        chat_id: Uuid,
        client_description: &str,
        special_instructions: &str,
    ) -> Result<AiConfig, ApiError> {
        return self
            .update(Some(chat_id), client_description, special_instructions)
            .await;
    }

    pub async fn delete(&self, chat_id: Option<Uuid>) -> Result<(), ApiError> {
        return self
            .gateway
            .send_empty(PendingRequest::delete(&AiConfigApi::path(chat_id)))
            .await;
    }

    pub async fn delete_global(&self) -> Result<(), ApiError> {
        return self.delete(None).await;
    }

    pub async fn delete_chat(&self, chat_id: Uuid) -> Result<(), ApiError> {
        return self.delete(Some(chat_id)).await;
    }
}
