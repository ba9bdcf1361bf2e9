//! Session manager: login/logout use cases over the store, the login
//! endpoint and token storage.
//!
//! ARCHITECTURE
//! ============
//! `request_user_login` dispatches `REQUEST_LOGIN` before returning, then
//! runs the HTTP round-trip on a spawned task which ends by dispatching
//! exactly one of `REQUEST_LOGIN_SUCCESS` / `REQUEST_LOGIN_FAILURE`. Callers
//! observe outcomes through the store, never through a return value.
//!
//! CONCURRENCY
//! ===========
//! At most one login is outstanding per store; a second call while loading
//! is rejected without emitting anything. Every login attempt takes a
//! generation number from the store, and every applied logout bumps it, so
//! an attempt overtaken by a logout is discarded on completion instead of
//! re-authenticating a user who already left. The generation check, the
//! token write and the resolving dispatch happen in one store write section.
//!
//! A login task that ends without an outcome (its `JoinHandle` aborted, or
//! the `LoginApi` panicked) resolves its attempt as a failure from a drop
//! guard, so `is_loading` never stays set once nothing is outstanding.
//!
//! TRADE-OFFS
//! ==========
//! Token writes are best-effort: a storage failure is logged and the login
//! still counts as successful, matching a browser whose `localStorage` is
//! full or disabled.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{Credentials, HttpLoginClient, LoginApi, LoginError, LoginResponse};
use crate::config::{AuthConfig, DEFAULT_AUTH_TOKEN_KEY};
use crate::state::{SessionState, Transition};
use crate::storage::{FileStorage, TokenStorage};
use crate::store::SessionStore;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a login request is already in progress")]
    LoginInProgress,
}

#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    api: Arc<dyn LoginApi>,
    storage: Arc<dyn TokenStorage>,
    token_key: String,
    keep_token_on_logout: bool,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: SessionStore, api: Arc<dyn LoginApi>, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            store,
            api,
            storage,
            token_key: DEFAULT_AUTH_TOKEN_KEY.to_owned(),
            keep_token_on_logout: false,
        }
    }

    /// Build a manager talking HTTP to `config.login_url()` and persisting to
    /// `config.storage_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &AuthConfig) -> Result<Self, LoginError> {
        let api = HttpLoginClient::new(config)?;
        let storage = FileStorage::new(&config.storage_path);
        Ok(Self::new(SessionStore::new(), Arc::new(api), Arc::new(storage))
            .with_token_key(&config.token_key)
            .keep_token_on_logout(config.keep_token_on_logout))
    }

    #[must_use]
    pub fn with_token_key(mut self, key: &str) -> Self {
        key.clone_into(&mut self.token_key);
        self
    }

    #[must_use]
    pub fn keep_token_on_logout(mut self, keep: bool) -> Self {
        self.keep_token_on_logout = keep;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    /// The token currently held in storage, if any. Read failures are logged
    /// and reported as `None`.
    #[must_use]
    pub fn stored_token(&self) -> Option<String> {
        match self.storage.get(&self.token_key) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.token_key, "failed to read session token");
                None
            }
        }
    }

    /// Start a login. `REQUEST_LOGIN` is applied before this returns; the
    /// round-trip runs on the returned task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LoginInProgress`] if a login is already
    /// outstanding. No transition is emitted in that case.
    pub fn request_user_login(&self, credentials: Credentials) -> Result<JoinHandle<()>, SessionError> {
        let Some(attempt) = self.store.begin_login() else {
            tracing::warn!("login rejected: another login is in progress");
            return Err(SessionError::LoginInProgress);
        };
        tracing::info!(attempt, "login requested");

        // Built outside the task so an abort before the first poll still drops it.
        let pending = PendingLogin { manager: self.clone(), attempt, settled: false };
        Ok(tokio::spawn(async move {
            let outcome = pending.manager.api.login(&credentials).await;
            pending.settle(outcome);
        }))
    }

    fn resolve_login(&self, attempt: u64, outcome: Result<LoginResponse, LoginError>) {
        let applied = self.store.resolve_login(attempt, || match outcome {
            Ok(resp) => {
                let token = resp.access_token.unwrap_or_else(|| {
                    tracing::warn!(attempt, "login response carried no access_token; storing empty token");
                    String::new()
                });
                // Deliberately synchronous: one best-effort write, finished before success is visible.
                if let Err(e) = self.storage.set(&self.token_key, &token) {
                    tracing::warn!(error = %e, key = %self.token_key, "failed to persist session token");
                }
                tracing::info!(attempt, "login succeeded");
                Transition::RequestLoginSuccess
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "login failed");
                Transition::RequestLoginFailure { error: e.to_string() }
            }
        });
        if !applied {
            tracing::info!(attempt, "discarding login outcome overtaken by logout");
        }
    }

    /// Reset the session to anonymous. Removes the persisted token unless
    /// the manager was built with `keep_token_on_logout(true)`.
    pub fn log_user_out(&self) {
        // Dispatch first: once the generation moves, no in-flight login can write the token back.
        self.store.dispatch(Transition::RequestLogUserOut);
        if !self.keep_token_on_logout {
            if let Err(e) = self.storage.remove(&self.token_key) {
                tracing::warn!(error = %e, key = %self.token_key, "failed to clear session token");
            }
        }
        tracing::info!("user logged out");
    }
}

/// One outstanding login attempt. Dropping it unsettled resolves the attempt
/// as aborted.
struct PendingLogin {
    manager: SessionManager,
    attempt: u64,
    settled: bool,
}

impl PendingLogin {
    fn settle(mut self, outcome: Result<LoginResponse, LoginError>) {
        self.settled = true;
        self.manager.resolve_login(self.attempt, outcome);
    }
}

impl Drop for PendingLogin {
    fn drop(&mut self) {
        if !self.settled {
            self.manager.resolve_login(self.attempt, Err(LoginError::Aborted));
        }
    }
}
