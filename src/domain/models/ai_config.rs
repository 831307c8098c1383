use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Prompt configuration used by the AI backend. A config without a `chat_id`
/// is the company-wide default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub id: Uuid,
    pub company_id: Uuid,
    #[serde(default)]
    pub chat_id: Option<Uuid>,
    #[serde(default)]
    pub client_description: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AiConfig {
    pub fn is_global(&self) -> bool {
        return self.chat_id.is_none();
    }
}
