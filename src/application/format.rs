#[cfg(test)]
#[path = "format_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::NaiveDateTime;

use crate::domain::models::AiConfig;
use crate::domain::models::Chat;
use crate::domain::models::Message;
use crate::domain::models::User;

const PREVIEW_WIDTH: usize = 70;

pub fn format_timestamp(timestamp: &str) -> String {
    if let Ok(date) = DateTime::parse_from_rfc3339(timestamp) {
        return date.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return date.format("%Y-%m-%d %H:%M").to_string();
    }
    return timestamp.to_string();
}

fn preview(text: &str) -> String {
    let line = text.split('\n').next().unwrap_or_default().trim();
    if line.chars().count() >= PREVIEW_WIDTH {
        let cut = line.chars().take(PREVIEW_WIDTH - 3).collect::<String>();
        return format!("{cut}...");
    }
    return line.to_string();
}

pub fn format_chat(chat: &Chat) -> String {
    let mut res = format!(
        "- (ID: {}) {}, Created: {}",
        chat.id,
        chat.name,
        format_timestamp(&chat.created_at)
    );

    if let Some(description) = &chat.client_description {
        if !description.trim().is_empty() {
            res = format!("{res}, {}", preview(description));
        }
    }

    return res;
}

pub fn format_message(message: &Message, line_max_width: usize) -> String {
    let mut header = format!(
        "{} (ID: {}) {}",
        message.role.marker(),
        message.id,
        format_timestamp(&message.created_at)
    );
    if message.is_ai_generated {
        header = format!("{header} [AI]");
    }

    let body = message
        .as_string_lines(line_max_width)
        .iter()
        .map(|e| return format!("  {}", e.trim_end()).trim_end().to_string())
        .collect::<Vec<String>>()
        .join("\n");

    return format!("{header}\n{body}");
}

pub fn format_page(page: u32, total_pages: u32, total_count: u64) -> String {
    return format!("Page {page} of {} ({total_count} total)", total_pages.max(1));
}

pub fn format_user(user: &User) -> String {
    return format!(
        "{} <{}>\nUser ID: {}\nCompany ID: {}",
        user.name, user.email, user.id, user.company_id
    );
}

pub fn format_ai_config(config: Option<&AiConfig>) -> String {
    let config = match config {
        Some(config) => config,
        None => return "No AI configuration saved.".to_string(),
    };

    let scope = match config.chat_id {
        Some(chat_id) if !config.is_global() => format!("Chat {chat_id}"),
        _ => "Company default".to_string(),
    };
    let field = |val: &Option<String>| {
        return match val.as_deref().map(|e| return e.trim()) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => "(none)".to_string(),
        };
    };

    return format!(
        "Scope: {scope}\nClient description: {}\nSpecial instructions: {}\nUpdated: {}",
        field(&config.client_description),
        field(&config.special_instructions),
        format_timestamp(&config.updated_at)
    );
}
