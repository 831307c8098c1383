use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::Message;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub client_description: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatWithMessages {
    #[serde(flatten)]
    pub chat: Chat,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatList {
    pub chats: Vec<Chat>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Partial update for a chat. Fields left as `None` are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl ChatUpdate {
    pub fn is_empty(&self) -> bool {
        return self.name.is_none()
            && self.client_description.is_none()
            && self.special_instructions.is_none();
    }
}
