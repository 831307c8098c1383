#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use strum::IntoEnumIterator;

use crate::domain::models::ImportedMessage;
use crate::domain::models::Message;
use crate::domain::models::MessageRole;

fn split_marker(line: &str) -> Option<(MessageRole, &str)> {
    return MessageRole::iter().find_map(|role| {
        return line
            .strip_prefix(role.marker())
            .map(|rest| return (role, rest.trim()));
    });
}

/// Reads a pasted conversation. Lines starting with `CLIENT:` or `MANAGER:`
/// open a new message; other lines continue the current one.
pub fn parse(text: &str) -> Vec<ImportedMessage> {
    let mut messages: Vec<ImportedMessage> = vec![];

    for line in text.lines().map(|e| return e.trim()) {
        if line.is_empty() {
            continue;
        }

        if let Some((role, rest)) = split_marker(line) {
            messages.push(ImportedMessage::new(role, rest));
            continue;
        }

        match messages.last_mut() {
            Some(current) => current.append_line(line),
            None => messages.push(ImportedMessage::new(MessageRole::Client, line)),
        }
    }

    return messages;
}

/// `parse` with the checks the import command applies before calling the
/// backend.
pub fn parse_for_import(text: &str) -> Result<Vec<ImportedMessage>> {
    if text.trim().is_empty() {
        bail!("Please provide messages to import");
    }

    let messages = parse(text);
    if messages.is_empty() {
        bail!("No valid messages found in the input");
    }

    return Ok(messages);
}

/// Writes messages back out in the format `parse` reads. The round trip is
/// lossy: `parse` trims every line and drops blank ones, and a content line
/// that starts with a role marker comes back as a message of its own.
pub fn render(messages: &[Message]) -> String {
    return messages
        .iter()
        .map(|e| return format!("{} {}", e.role.marker(), e.content))
        .collect::<Vec<String>>()
        .join("\n\n");
}
