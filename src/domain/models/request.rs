#[cfg(test)]
#[path = "request_test.rs"]
mod tests;

use reqwest::Method;
use serde::Serialize;

/// Paths served without stored credentials. A 401 from any of them is returned
/// to the caller as is. It never triggers a refresh or `Event::SessionExpired`,
/// even when nothing is stored.
pub const CREDENTIAL_PATHS: [&str; 3] = ["/auth/refresh", "/auth/login", "/auth/register"];

pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    Initial,
    RetriedOnce,
}

/// An outbound API call. Kept separate from `reqwest::Request` so the gateway
/// can rebuild it with a fresh access token.
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    retry: RetryState,
}

impl PendingRequest {
    pub fn new(method: Method, path: &str) -> PendingRequest {
        return PendingRequest {
            method,
            path: path.to_string(),
            query: vec![],
            body: None,
            retry: RetryState::Initial,
        };
    }

    pub fn get(path: &str) -> PendingRequest {
        return PendingRequest::new(Method::GET, path);
    }

    pub fn post(path: &str) -> PendingRequest {
        return PendingRequest::new(Method::POST, path);
    }

    pub fn put(path: &str) -> PendingRequest {
        return PendingRequest::new(Method::PUT, path);
    }

    pub fn delete(path: &str) -> PendingRequest {
        return PendingRequest::new(Method::DELETE, path);
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> PendingRequest {
        self.query.push((key.to_string(), value.to_string()));
        return self;
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> serde_json::Result<PendingRequest> {
        self.body = Some(serde_json::to_value(body)?);
        return Ok(self);
    }

    pub fn retry_state(&self) -> RetryState {
        return self.retry;
    }

    pub fn is_credential_path(&self) -> bool {
        let path = self.path.trim_end_matches('/');
        return CREDENTIAL_PATHS.iter().any(|e| return *e == path);
    }

    /// Whether a 401 on this request may be recovered by a token refresh.
    pub fn can_refresh(&self) -> bool {
        return self.retry == RetryState::Initial && !self.is_credential_path();
    }

    pub fn mark_retried(&mut self) {
        self.retry = RetryState::RetriedOnce;
    }
}
