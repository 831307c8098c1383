#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    Client,
    Manager,
}

impl MessageRole {
    pub fn parse(text: &str) -> Option<MessageRole> {
        return MessageRole::iter().find(|e| return e.to_string() == text);
    }

    /// Header used when a chat is written out as a transcript.
    pub fn marker(&self) -> &'static str {
        match self {
            MessageRole::Client => return "CLIENT:",
            MessageRole::Manager => return "MANAGER:",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub content: String,
    pub role: MessageRole,
    #[serde(default)]
    pub is_ai_generated: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Message {
    pub fn as_string_lines(&self, line_max_width: usize) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        for full_line in self.content.split('\n') {
            if full_line.trim().is_empty() {
                lines.push(" ".to_string());
                continue;
            }

            let mut char_count = 0;
            let mut current_lines: Vec<&str> = vec![];

            for word in full_line.split(' ') {
                if word.len() + char_count + 1 > line_max_width && !current_lines.is_empty() {
                    lines.push(current_lines.join(" ").trim_end().to_string());
                    current_lines = vec![word];
                    char_count = word.len() + 1;
                } else {
                    current_lines.push(word);
                    char_count += word.len() + 1;
                }
            }
            if !current_lines.is_empty() {
                lines.push(current_lines.join(" ").trim_end().to_string());
            }
        }

        return lines;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// A message recovered from a pasted transcript, ready for `/messages/import`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedMessage {
    pub role: MessageRole,
    pub content: String,
    pub is_ai_generated: bool,
}

impl ImportedMessage {
    pub fn new(role: MessageRole, content: &str) -> ImportedMessage {
        return ImportedMessage {
            role,
            content: content.to_string(),
            is_ai_generated: false,
        };
    }

    pub fn append_line(&mut self, line: &str) {
        self.content += "\n";
        self.content += line;
    }
}
