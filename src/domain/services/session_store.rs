#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::Weak;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::domain::models::Event;
use crate::domain::models::Session;
use crate::domain::models::User;
use crate::infrastructure::api::AuthApi;
use crate::infrastructure::storage::TokenStoreBox;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    LoginFailed(String),

    #[error("{0}")]
    RegistrationFailed(String),

    #[error("Registration succeeded, but signing in failed. Please log in manually.")]
    LoginAfterRegistrationFailed,
}

pub type Listener = Arc<dyn Fn(bool, Option<&User>) + Send + Sync>;

type Listeners = DashMap<u64, Listener>;

/// Handle returned by `SessionStore::subscribe`.
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(&self.id);
        }
    }
}

/// Who is signed in. Listeners are told about every change, always after the
/// stored tokens have been updated for that change.
pub struct SessionStore {
    auth: AuthApi,
    state: RwLock<Session>,
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl SessionStore {
    pub fn new(auth: AuthApi) -> SessionStore {
        return SessionStore {
            auth,
            state: RwLock::new(Session::anonymous()),
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        };
    }

    fn tokens(&self) -> &TokenStoreBox {
        return self.auth.gateway().tokens();
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool, Option<&User>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        return Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        };
    }

    pub fn session(&self) -> Session {
        return match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
    }

    pub fn current_user(&self) -> Option<User> {
        return self.session().current_user;
    }

    pub fn is_authenticated(&self) -> bool {
        return self.session().is_authenticated;
    }

    fn set(&self, session: Session) {
        match self.state.write() {
            Ok(mut state) => *state = session.clone(),
            Err(poisoned) => *poisoned.into_inner() = session.clone(),
        }

        // Listeners run outside the map's shard locks so they may unsubscribe.
        let listeners = self
            .listeners
            .iter()
            .map(|e| return e.value().clone())
            .collect::<Vec<Listener>>();
        for listener in listeners {
            listener(session.is_authenticated, session.current_user.as_ref());
        }
    }

    async fn clear_tokens(&self) {
        if let Err(err) = self.tokens().clear().await {
            tracing::error!(error = ?err, "Failed to clear stored tokens");
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let tokens = match self.auth.login(email, password).await {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::info!(error = %err, "Login rejected");
                return Err(AuthError::LoginFailed(err.detail_or("Login failed")));
            }
        };

        if let Err(err) = self.tokens().save(&tokens).await {
            tracing::error!(error = ?err, "Failed to store tokens");
            return Err(AuthError::LoginFailed(err.to_string()));
        }

        match self.auth.me().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Signed in");
                self.set(Session::authenticated(user.clone()));
                return Ok(user);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Signed in but the profile could not be loaded");
                self.clear_tokens().await;
                self.set(Session::anonymous());
                return Err(AuthError::LoginFailed(err.detail_or("Login failed")));
            }
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        company_name: &str,
    ) -> Result<User, AuthError> {
        if let Err(err) = self.auth.register(email, password, name, company_name).await {
            tracing::info!(error = %err, "Registration rejected");
            return Err(AuthError::RegistrationFailed(
                err.detail_or("Registration failed"),
            ));
        }

        return self
            .login(email, password)
            .await
            .map_err(|_| return AuthError::LoginAfterRegistrationFailed);
    }

    /// Restores the session from stored tokens. Returns whether the profile
    /// could be loaded.
    pub async fn check_auth(&self) -> bool {
        match self.tokens().load().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.set(Session::anonymous());
                return false;
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Stored tokens could not be read");
                self.set(Session::anonymous());
                return false;
            }
        }

        match self.auth.me().await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Session restored");
                self.set(Session::authenticated(user));
                return true;
            }
            Err(err) => {
                tracing::info!(error = %err, "Stored session is no longer valid");
                self.clear_tokens().await;
                self.set(Session::anonymous());
                return false;
            }
        }
    }

    pub async fn logout(&self) {
        if let Err(err) = self.auth.logout().await {
            tracing::warn!(error = %err, "Logout request failed");
        }

        self.clear_tokens().await;
        tracing::info!("Signed out");
        self.set(Session::anonymous());
    }

    /// Drops the in-memory session after the gateway gave up on the tokens.
    pub fn expire(&self) {
        tracing::info!("Session expired");
        self.set(Session::anonymous());
    }

    /// Applies gateway events until every sender is gone.
    pub async fn watch(&self, mut rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            match event {
                Event::SessionExpired() => self.expire(),
                Event::TokensRefreshed() => tracing::debug!("Tokens refreshed"),
            }
        }
    }
}
