#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{detail} (HTTP {status})")]
    Status { status: u16, detail: String },

    #[error("session refresh failed: {0}")]
    RefreshFailed(Box<ApiError>),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("token storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Validation(Vec<ValidationDetail>),
    Other(serde_json::Value),
}

#[derive(Deserialize)]
struct ValidationDetail {
    msg: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

impl ApiError {
    /// Builds a `Status` error from the body of a failed response. The backend
    /// reports errors as `{"detail": ...}`; anything else is kept verbatim.
    pub fn from_body(status: StatusCode, body: &str) -> ApiError {
        let detail = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: Detail::Text(text),
            }) => text,
            Ok(ErrorBody {
                detail: Detail::Validation(items),
            }) => items
                .into_iter()
                .map(|e| return e.msg)
                .collect::<Vec<String>>()
                .join("; "),
            Ok(ErrorBody {
                detail: Detail::Other(value),
            }) => value.to_string(),
            Err(_) => {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            }
        };

        return ApiError::Status {
            status: status.as_u16(),
            detail,
        };
    }

    /// Turns non-success responses into `Status` errors.
    pub async fn check(res: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        return Err(ApiError::from_body(status, &body));
    }

    pub fn status(&self) -> Option<u16> {
        if let ApiError::Status { status, .. } = self {
            return Some(*status);
        }
        return None;
    }

    pub fn is_unauthorized(&self) -> bool {
        return match self {
            ApiError::Status { status, .. } => *status == StatusCode::UNAUTHORIZED.as_u16(),
            ApiError::RefreshFailed(_) => true,
            _ => false,
        };
    }

    /// Text shown to the user: the backend's own message when there is one.
    pub fn detail_or(&self, fallback: &str) -> String {
        return match self {
            ApiError::Status { detail, .. } if !detail.is_empty() => detail.to_string(),
            ApiError::RefreshFailed(inner) => inner.detail_or(fallback),
            _ => fallback.to_string(),
        };
    }
}
