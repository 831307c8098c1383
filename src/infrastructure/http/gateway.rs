#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use super::ApiError;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Event;
use crate::domain::models::PendingRequest;
use crate::domain::models::TokenPair;
use crate::domain::models::REFRESH_PATH;
use crate::infrastructure::storage::TokenStoreBox;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// The one HTTP client every API call goes through. Attaches the stored access
/// token and recovers once from an expired one by refreshing the pair.
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenStoreBox,
    tx: mpsc::UnboundedSender<Event>,
    refresh_guard: Mutex<()>,
}

impl Gateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: TokenStoreBox,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Result<Gateway, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if let Err(err) = reqwest::Url::parse(&base_url) {
            return Err(ApiError::InvalidUrl(format!("{base_url}: {err}")));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "ngrok-skip-browser-warning",
            header::HeaderValue::from_static("true"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(format!("chatsim/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        return Ok(Gateway {
            client,
            base_url,
            tokens,
            tx,
            refresh_guard: Mutex::new(()),
        });
    }

    pub fn from_config(
        tokens: TokenStoreBox,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Result<Gateway, ApiError> {
        let timeout_ms = Config::get_number(ConfigKey::RequestTimeout);

        return Gateway::new(
            &Config::get(ConfigKey::ApiUrl),
            Duration::from_millis(u64::from(timeout_ms)),
            tokens,
            tx,
        );
    }

    pub fn tokens(&self) -> &TokenStoreBox {
        return &self.tokens;
    }

    fn url(&self, path: &str) -> String {
        return format!("{}{path}", self.base_url);
    }

    async fn access_token(&self) -> Result<Option<String>, ApiError> {
        let tokens = self.tokens.load().await?;
        return Ok(tokens.map(|e| return e.access_token));
    }

    async fn execute(
        &self,
        req: &PendingRequest,
        access_token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self.client.request(req.method.clone(), self.url(&req.path));
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = %req.method,
            path = %req.path,
            retry = ?req.retry_state(),
            authorized = access_token.is_some(),
            "Sending request"
        );

        let res = builder.send().await?;
        if !res.status().is_success() {
            tracing::debug!(
                method = %req.method,
                path = %req.path,
                status = res.status().as_u16(),
                "Request failed"
            );
        }

        return ApiError::check(res).await;
    }

    /// Sends `req`, returning the successful response. A 401 is recovered at
    /// most once per request; see `recover`.
    pub async fn send(&self, mut req: PendingRequest) -> Result<reqwest::Response, ApiError> {
        let sent_with = self.access_token().await?;
        let err = match self.execute(&req, sent_with.as_deref()).await {
            Ok(res) => return Ok(res),
            Err(err) => err,
        };

        if !err.is_unauthorized() || !req.can_refresh() {
            return Err(err);
        }
        req.mark_retried();

        let access_token = match self.recover(sent_with.as_deref()).await? {
            Some(token) => token,
            None => return Err(err),
        };

        return self.execute(&req, Some(&access_token)).await;
    }

    pub async fn send_json<T: DeserializeOwned>(&self, req: PendingRequest) -> Result<T, ApiError> {
        let text = self.send(req).await?.text().await?;
        return Ok(serde_json::from_str::<T>(&text)?);
    }

    pub async fn send_empty(&self, req: PendingRequest) -> Result<(), ApiError> {
        self.send(req).await?;
        return Ok(());
    }

    /// Produces the access token to retry with, or `None` when there is nothing
    /// to refresh with. Refreshes are serialized: a request that was rejected with
    /// a token that has since been rotated reuses the stored one instead of
    /// spending the refresh token again.
    async fn recover(&self, sent_with: Option<&str>) -> Result<Option<String>, ApiError> {
        let _guard = self.refresh_guard.lock().await;

        let tokens = match self.tokens.load().await? {
            Some(tokens) if tokens.has_refresh_token() => tokens,
            _ => {
                tracing::warn!("Access was rejected and no refresh token is stored");
                self.expire().await;
                return Ok(None);
            }
        };

        if sent_with != Some(tokens.access_token.as_str()) {
            tracing::debug!("Tokens were rotated while this request was in flight");
            return Ok(Some(tokens.access_token));
        }

        tracing::debug!("Access token rejected, refreshing");
        match self.refresh(&tokens.refresh_token).await {
            Ok(fresh) => {
                self.tokens.save(&fresh).await?;
                tracing::info!("Refreshed access token");
                if self.tx.send(Event::TokensRefreshed()).is_err() {
                    tracing::debug!("No listener for token refresh events");
                }
                return Ok(Some(fresh.access_token));
            }
            Err(err) => {
                tracing::error!(error = ?err, "Token refresh failed");
                self.expire().await;
                return Err(ApiError::RefreshFailed(Box::new(err)));
            }
        }
    }

    /// Plain refresh call, outside the interception in `send`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let res = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let text = ApiError::check(res).await?.text().await?;
        return Ok(serde_json::from_str::<TokenPair>(&text)?);
    }

    async fn expire(&self) {
        if let Err(err) = self.tokens.clear().await {
            tracing::error!(error = ?err, "Failed to clear stored tokens");
        }

        tracing::info!("Session expired, sign in required");
        if self.tx.send(Event::SessionExpired()).is_err() {
            tracing::debug!("No listener for session expiry events");
        }
    }
}
