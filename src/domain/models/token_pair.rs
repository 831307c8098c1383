use serde::Deserialize;
use serde::Serialize;

/// Access and refresh credentials issued by the backend. Both tokens are always
/// stored and cleared together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: &str, refresh_token: &str) -> TokenPair {
        return TokenPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        };
    }

    pub fn has_refresh_token(&self) -> bool {
        return !self.refresh_token.trim().is_empty();
    }
}
