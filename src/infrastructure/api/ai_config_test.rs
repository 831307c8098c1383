use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::AiConfigApi;
use crate::domain::models::Event;
use crate::infrastructure::http::Gateway;
use crate::infrastructure::storage::MemoryTokenStore;

fn ai_config_api(url: String) -> Result<AiConfigApi> {
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();
    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let gateway = Gateway::new(&url, Duration::from_secs(5), store, tx)?;
    return Ok(AiConfigApi::new(Arc::new(gateway)));
}

fn config_value(chat_id: Option<&str>) -> serde_json::Value {
    return json!({
        "id": test_utils::MESSAGE_ID,
        "company_id": test_utils::COMPANY_ID,
        "chat_id": chat_id,
        "client_description": "Small business owner",
        "special_instructions": "Always offer a discount code",
        "created_at": test_utils::TIMESTAMP,
        "updated_at": test_utils::TIMESTAMP,
    });
}

#[tokio::test]
async fn it_maps_missing_config_to_none() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/ai-config/global")
        .with_status(200)
        .with_body("null")
        .create();

    let res = ai_config_api(server.url())?.global().await?;
    mock.assert();

    assert_eq!(res, None);
    return Ok(());
}

#[tokio::test]
async fn it_loads_chat_config() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock(
            "GET",
            format!("/ai-config/chat/{}", test_utils::CHAT_ID).as_str(),
        )
        .with_status(200)
        .with_body(config_value(Some(test_utils::CHAT_ID)).to_string())
        .create();

    let chat_id = Uuid::parse_str(test_utils::CHAT_ID)?;
    let res = ai_config_api(server.url())?.for_chat(chat_id).await?;
    mock.assert();

    let config = res.unwrap();
    assert!(!config.is_global());
    assert_eq!(config.chat_id, Some(chat_id));
    assert_eq!(
        config.special_instructions.as_deref(),
        Some("Always offer a discount code")
    );
    return Ok(());
}

#[tokio::test]
async fn it_updates_global_config() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PUT", "/ai-config/global")
        .match_body(Matcher::Json(json!({
            "client_description": "Small business owner",
            "special_instructions": "Always offer a discount code",
        })))
        .with_status(200)
        .with_body(config_value(None).to_string())
        .create();

    let config = ai_config_api(server.url())?
        .update_global("Small business owner", "Always offer a discount code")
        .await?;
    mock.assert();

    assert!(config.is_global());
    return Ok(());
}

#[tokio::test]
async fn it_deletes_global_config() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("DELETE", "/ai-config/global")
        .with_status(204)
        .create();

    ai_config_api(server.url())?.delete_global().await?;
    mock.assert();
    return Ok(());
}
