use anyhow::anyhow;
use anyhow::Result;
use serde_json::json;

use super::merge_ai_config;
use super::needs_sign_in;
use super::require;
use super::CommandError;
use super::SIGN_IN_HINT;
use crate::domain::models::AiConfig;
use crate::domain::services::AuthError;
use crate::infrastructure::http::ApiError;

fn status_error(status: u16, detail: &str) -> ApiError {
    return ApiError::Status {
        status,
        detail: detail.to_string(),
    };
}

fn saved_config() -> Result<AiConfig> {
    let config = serde_json::from_value(json!({
        "id": test_utils::MESSAGE_ID,
        "company_id": test_utils::COMPANY_ID,
        "chat_id": test_utils::CHAT_ID,
        "client_description": "Small business owner",
        "special_instructions": "Always offer a discount code",
        "created_at": test_utils::TIMESTAMP,
        "updated_at": test_utils::TIMESTAMP,
    }))?;
    return Ok(config);
}

#[test]
fn it_flags_401_as_unauthenticated() {
    let err = CommandError::api("Failed to load chats")(status_error(401, "Not authenticated"));

    assert!(err.is_unauthenticated());
    assert_eq!(err.to_string(), "Not authenticated");
}

#[test]
fn it_flags_refresh_failures_as_unauthenticated() {
    let inner = status_error(401, "Invalid refresh token");
    let err = CommandError::api("Failed to load chats")(ApiError::RefreshFailed(Box::new(inner)));

    assert!(err.is_unauthenticated());
    assert_eq!(err.to_string(), "Invalid refresh token");
}

#[test]
fn it_keeps_other_failures_signed_in() {
    let forbidden = CommandError::api("Failed to load chat")(status_error(
        403,
        "Access denied to this chat",
    ));
    assert!(!forbidden.is_unauthenticated());
    assert_eq!(forbidden.to_string(), "Access denied to this chat");

    let decode_err = serde_json::from_str::<AiConfig>("{").unwrap_err();
    let undecodable = CommandError::api("Failed to load AI configuration")(decode_err.into());
    assert!(!undecodable.is_unauthenticated());
    assert_eq!(undecodable.to_string(), "Failed to load AI configuration");

    let invalid_url = CommandError::api("Failed to load chats")(ApiError::InvalidUrl(
        "not a url".to_string(),
    ));
    assert!(!invalid_url.is_unauthenticated());
}

#[test]
fn it_hints_sign_in_only_for_session_failures() {
    let expired = anyhow::Error::new(CommandError::api("Failed to load chats")(status_error(
        401,
        "Not authenticated",
    )));
    assert!(needs_sign_in(&expired));
    assert!(needs_sign_in(&anyhow::Error::new(CommandError::NotSignedIn)));

    let forbidden = anyhow::Error::new(CommandError::api("Failed to load chat")(status_error(
        403,
        "Access denied to this chat",
    )));
    assert!(!needs_sign_in(&forbidden));
    assert!(!needs_sign_in(&anyhow!("Chat name cannot be empty")));
    assert!(!needs_sign_in(&anyhow::Error::new(AuthError::LoginFailed(
        "Incorrect email or password".to_string()
    ))));

    assert_eq!(SIGN_IN_HINT, "Run \"chatsim login\" to sign in again.");
}

#[test]
fn it_rejects_blank_input_before_sending() {
    let err = require("  \t", "Chat name cannot be empty").unwrap_err();
    assert_eq!(err.to_string(), "Chat name cannot be empty");

    let err = require("", "Please provide revision instructions").unwrap_err();
    assert_eq!(err.to_string(), "Please provide revision instructions");
}

#[test]
fn it_trims_accepted_input() -> Result<()> {
    assert_eq!(require("  Refund request ", "Chat name cannot be empty")?, "Refund request");
    return Ok(());
}

#[test]
fn it_keeps_saved_fields_left_out() -> Result<()> {
    let merged = merge_ai_config(
        Some(saved_config()?),
        Some(" Impatient regular customer ".to_string()),
        None,
    );

    assert_eq!(
        merged,
        (
            "Impatient regular customer".to_string(),
            "Always offer a discount code".to_string()
        )
    );
    return Ok(());
}

#[test]
fn it_clears_fields_set_to_empty() -> Result<()> {
    let merged = merge_ai_config(Some(saved_config()?), None, Some("".to_string()));

    assert_eq!(
        merged,
        ("Small business owner".to_string(), "".to_string())
    );
    return Ok(());
}

#[test]
fn it_defaults_to_empty_without_saved_config() {
    let merged = merge_ai_config(None, None, Some("Be formal".to_string()));

    assert_eq!(merged, ("".to_string(), "Be formal".to_string()));
}
