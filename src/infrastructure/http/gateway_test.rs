use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use test_utils::tokens_body;
use tokio::sync::mpsc;

use super::Gateway;
use crate::domain::models::Event;
use crate::domain::models::PendingRequest;
use crate::domain::models::TokenPair;
use crate::infrastructure::http::ApiError;
use crate::infrastructure::storage::MemoryTokenStore;

fn build_gateway(
    url: String,
    store: &Arc<MemoryTokenStore>,
) -> Result<(Gateway, mpsc::UnboundedReceiver<Event>)> {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let gateway = Gateway::new(&url, Duration::from_secs(5), store.clone(), tx)?;
    return Ok((gateway, rx));
}

#[tokio::test]
async fn it_attaches_the_access_token() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/auth/me")
        .match_header("Authorization", "Bearer A1")
        .match_header("ngrok-skip-browser-warning", "true")
        .with_status(200)
        .with_body("{}")
        .create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, _rx) = build_gateway(server.url(), &store)?;
    gateway.send(PendingRequest::get("/auth/me")).await?;

    mock.assert();
    return Ok(());
}

#[tokio::test]
async fn it_sends_no_authorization_without_tokens() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/auth/login")
        .match_header("Authorization", Matcher::Missing)
        .with_status(200)
        .with_body(tokens_body("A1", "R1"))
        .create();

    let store = Arc::new(MemoryTokenStore::default());
    let (gateway, _rx) = build_gateway(server.url(), &store)?;
    let tokens: TokenPair = gateway
        .send_json(PendingRequest::post("/auth/login").json(&json!({
            "email": "agent@example.com",
            "password": "secret",
        }))?)
        .await?;

    mock.assert();
    assert_eq!(tokens, TokenPair::new("A1", "R1"));
    return Ok(());
}

#[tokio::test]
async fn it_passes_through_non_401_failures() -> Result<()> {
    let mut server = mockito::Server::new();
    let forbidden = server
        .mock("GET", format!("/chats/{}", test_utils::CHAT_ID).as_str())
        .with_status(403)
        .with_body(r#"{"detail": "Access denied to this chat"}"#)
        .create();
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let res = gateway
        .send(PendingRequest::get(&format!(
            "/chats/{}",
            test_utils::CHAT_ID
        )))
        .await;

    forbidden.assert();
    refresh.assert();

    let err = res.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.detail_or(""), "Access denied to this chat");
    assert_eq!(store.current(), Some(TokenPair::new("A1", "R1")));
    assert!(rx.try_recv().is_err());
    return Ok(());
}

#[tokio::test]
async fn it_refreshes_and_retries_once() -> Result<()> {
    let mut server = mockito::Server::new();
    let expired = server
        .mock("GET", "/auth/me")
        .match_header("Authorization", "Bearer A1")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid authentication credentials"}"#)
        .expect(1)
        .create();
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_header("Authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({ "refresh_token": "R1" })))
        .with_status(200)
        .with_body(tokens_body("A2", "R2"))
        .expect(1)
        .create();
    let retried = server
        .mock("GET", "/auth/me")
        .match_header("Authorization", "Bearer A2")
        .with_status(200)
        .with_body(test_utils::user_body())
        .expect(1)
        .create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let user: serde_json::Value = gateway.send_json(PendingRequest::get("/auth/me")).await?;

    expired.assert();
    refresh.assert();
    retried.assert();

    assert_eq!(user["email"], "agent@example.com");
    assert_eq!(store.current(), Some(TokenPair::new("A2", "R2")));
    assert_eq!(rx.try_recv()?, Event::TokensRefreshed());
    assert!(rx.try_recv().is_err());
    return Ok(());
}

#[tokio::test]
async fn it_propagates_a_second_401_without_refreshing_again() -> Result<()> {
    let mut server = mockito::Server::new();
    let rejected = server
        .mock("GET", "/auth/me")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid authentication credentials"}"#)
        .expect(2)
        .create();
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_body(tokens_body("A2", "R2"))
        .expect(1)
        .create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, _rx) = build_gateway(server.url(), &store)?;
    let res = gateway.send(PendingRequest::get("/auth/me")).await;

    rejected.assert();
    refresh.assert();

    let err = res.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!matches!(err, ApiError::RefreshFailed(_)));
    assert_eq!(store.current(), Some(TokenPair::new("A2", "R2")));
    return Ok(());
}

#[tokio::test]
async fn it_expires_without_a_refresh_token() -> Result<()> {
    let mut server = mockito::Server::new();
    let rejected = server
        .mock("GET", "/chats/")
        .with_status(401)
        .with_body(r#"{"detail": "Not authenticated"}"#)
        .expect(1)
        .create();
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", ""));
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let res = gateway.send(PendingRequest::get("/chats/")).await;

    rejected.assert();
    refresh.assert();

    let err = res.unwrap_err();
    assert_eq!(err.detail_or(""), "Not authenticated");
    assert_eq!(store.current(), None);
    assert_eq!(rx.try_recv()?, Event::SessionExpired());
    return Ok(());
}

#[tokio::test]
async fn it_expires_when_nothing_is_stored() -> Result<()> {
    let mut server = mockito::Server::new();
    let rejected = server
        .mock("GET", "/chats/")
        .match_header("Authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"detail": "Not authenticated"}"#)
        .create();
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create();

    let store = Arc::new(MemoryTokenStore::default());
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let res = gateway.send(PendingRequest::get("/chats/")).await;

    rejected.assert();
    refresh.assert();
    assert_eq!(res.unwrap_err().status(), Some(401));
    assert_eq!(rx.try_recv()?, Event::SessionExpired());
    return Ok(());
}

#[tokio::test]
async fn it_propagates_the_refresh_failure() -> Result<()> {
    let mut server = mockito::Server::new();
    let rejected = server
        .mock("GET", "/auth/me")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid authentication credentials"}"#)
        .expect(1)
        .create();
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid refresh token"}"#)
        .expect(1)
        .create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let res = gateway.send(PendingRequest::get("/auth/me")).await;

    rejected.assert();
    refresh.assert();

    match res.unwrap_err() {
        ApiError::RefreshFailed(inner) => {
            assert_eq!(inner.status(), Some(401));
            assert_eq!(inner.detail_or(""), "Invalid refresh token");
        }
        other => panic!("expected a refresh failure, got {other:?}"),
    }
    assert_eq!(store.current(), None);
    assert_eq!(rx.try_recv()?, Event::SessionExpired());
    return Ok(());
}

#[tokio::test]
async fn it_does_not_intercept_bad_credentials() -> Result<()> {
    let mut server = mockito::Server::new();
    let login = server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(r#"{"detail": "Incorrect email or password"}"#)
        .expect(1)
        .create();
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let res = gateway
        .send(PendingRequest::post("/auth/login").json(&json!({
            "email": "agent@example.com",
            "password": "wrong",
        }))?)
        .await;

    login.assert();
    refresh.assert();
    assert_eq!(res.unwrap_err().status(), Some(401));
    assert_eq!(store.current(), Some(TokenPair::new("A1", "R1")));
    assert!(rx.try_recv().is_err());
    return Ok(());
}

#[tokio::test]
async fn it_does_not_expire_on_bad_credentials_without_tokens() -> Result<()> {
    let mut server = mockito::Server::new();
    let register = server
        .mock("POST", "/auth/register")
        .match_header("Authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"detail": "Registration closed"}"#)
        .expect(1)
        .create();
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create();

    let store = Arc::new(MemoryTokenStore::default());
    let (gateway, mut rx) = build_gateway(server.url(), &store)?;
    let res = gateway
        .send(PendingRequest::post("/auth/register").json(&json!({
            "email": "agent@example.com",
            "password": "secret",
        }))?)
        .await;

    register.assert();
    refresh.assert();
    assert_eq!(res.unwrap_err().status(), Some(401));
    assert_eq!(store.current(), None);
    assert!(rx.try_recv().is_err());
    return Ok(());
}

#[tokio::test]
async fn it_coalesces_concurrent_refreshes() -> Result<()> {
    let mut server = mockito::Server::new();
    let expired = server
        .mock("GET", "/auth/me")
        .match_header("Authorization", "Bearer A1")
        .with_status(401)
        .expect(2)
        .create();
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(json!({ "refresh_token": "R1" })))
        .with_status(200)
        .with_body(tokens_body("A2", "R2"))
        .expect(1)
        .create();
    let retried = server
        .mock("GET", "/auth/me")
        .match_header("Authorization", "Bearer A2")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create();

    let store = Arc::new(MemoryTokenStore::with_tokens("A1", "R1"));
    let (gateway, _rx) = build_gateway(server.url(), &store)?;
    let (first, second) = tokio::join!(
        gateway.send(PendingRequest::get("/auth/me")),
        gateway.send(PendingRequest::get("/auth/me"))
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    expired.assert();
    refresh.assert();
    retried.assert();
    assert_eq!(store.current(), Some(TokenPair::new("A2", "R2")));
    return Ok(());
}

#[test]
fn it_rejects_invalid_base_urls() {
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();
    let store = Arc::new(MemoryTokenStore::default());
    let res = Gateway::new("not a url", Duration::from_secs(1), store, tx);

    assert!(matches!(res, Err(ApiError::InvalidUrl(_))));
}
