#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;

use std::io;
use std::path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::TokenPair;

/// Durable home of the token pair. Implementations must treat the pair as one
/// unit: after any call either both tokens are stored or neither is.
#[async_trait]
pub trait TokenStore {
    async fn load(&self) -> io::Result<Option<TokenPair>>;

    async fn save(&self, tokens: &TokenPair) -> io::Result<()>;

    async fn clear(&self) -> io::Result<()>;
}

pub type TokenStoreBox = Arc<dyn TokenStore + Send + Sync>;

/// Stores the pair as a single JSON document, replaced through a rename so a
/// crash mid-write never leaves half a pair on disk.
pub struct FileTokenStore {
    pub file_path: path::PathBuf,
    lock: Mutex<()>,
}

impl Default for FileTokenStore {
    fn default() -> FileTokenStore {
        return FileTokenStore::new(path::PathBuf::from(Config::get(ConfigKey::TokenFile)));
    }
}

impl FileTokenStore {
    pub fn new(file_path: path::PathBuf) -> FileTokenStore {
        return FileTokenStore {
            file_path,
            lock: Mutex::new(()),
        };
    }

    /// Writes `payload` to `tmp_path` and moves it over the token file. On unix
    /// the temp file is owner-only from the moment it exists.
    async fn replace_with(&self, tmp_path: &path::Path, payload: &[u8]) -> io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(tmp_path).await?;
        file.write_all(payload).await?;
        file.flush().await?;
        drop(file);

        // An existing temp file keeps its old mode through open.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        return fs::rename(tmp_path, &self.file_path).await;
    }

    fn tmp_path(&self) -> path::PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|e| return e.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        return self.file_path.with_file_name(name);
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> io::Result<Option<TokenPair>> {
        let _guard = self.lock.lock().await;
        if !self.file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(&self.file_path).await?;
        match serde_json::from_str::<TokenPair>(&payload) {
            Ok(tokens) => return Ok(Some(tokens)),
            Err(err) => {
                tracing::warn!(
                    path = ?self.file_path,
                    error = ?err,
                    "Token file is unreadable, treating as signed out"
                );
                return Ok(None);
            }
        }
    }

    async fn save(&self, tokens: &TokenPair) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let payload = serde_json::to_string(tokens)
            .map_err(|err| return io::Error::new(io::ErrorKind::InvalidData, err))?;

        let tmp_path = self.tmp_path();
        if let Err(err) = self.replace_with(&tmp_path, payload.as_bytes()).await {
            if let Err(remove_err) = fs::remove_file(&tmp_path).await {
                tracing::debug!(path = ?tmp_path, error = ?remove_err, "No temp file to remove");
            }
            return Err(err);
        }
        tracing::debug!(path = ?self.file_path, "Saved tokens");

        return Ok(());
    }

    async fn clear(&self) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        if !self.file_path.exists() {
            return Ok(());
        }

        fs::remove_file(&self.file_path).await?;
        tracing::debug!(path = ?self.file_path, "Cleared tokens");

        return Ok(());
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: std::sync::Mutex<Option<TokenPair>>,
}

#[cfg(test)]
impl MemoryTokenStore {
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> MemoryTokenStore {
        return MemoryTokenStore {
            tokens: std::sync::Mutex::new(Some(TokenPair::new(access_token, refresh_token))),
        };
    }

    pub fn current(&self) -> Option<TokenPair> {
        return self.tokens.lock().unwrap().clone();
    }
}

#[cfg(test)]
#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> io::Result<Option<TokenPair>> {
        return Ok(self.current());
    }

    async fn save(&self, tokens: &TokenPair) -> io::Result<()> {
        *self.tokens.lock().unwrap() = Some(tokens.clone());
        return Ok(());
    }

    async fn clear(&self) -> io::Result<()> {
        *self.tokens.lock().unwrap() = None;
        return Ok(());
    }
}
