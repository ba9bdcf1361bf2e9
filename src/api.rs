//! Login endpoint client.
//!
//! The endpoint is an OAuth2 password-flow token route: a form-encoded POST
//! with `username`/`password` fields answering `{"access_token": ..., "token_type": ...}`.
//!
//! ERROR HANDLING
//! ==============
//! Every failure becomes a `LoginError` whose `Display` text is what the
//! session state shows the user. The body of a 2xx answer is never
//! validated: a missing or non-JSON body yields `access_token: None`.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AuthConfig;

/// Login input. No validation is performed here; empty values are sent as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Form payload as it goes over the wire. The email travels as `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl From<&Credentials> for LoginForm {
    fn from(credentials: &Credentials) -> Self {
        Self { username: credentials.email.clone(), password: credentials.password.clone() }
    }
}

/// What a successful login answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Connection, timeout, or body-read failure.
    #[error("{0}")]
    Transport(String),
    /// Non-2xx answer.
    #[error("Request failed with status code {status}")]
    Status { status: u16 },
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    /// The login task ended before the round-trip finished.
    #[error("login aborted")]
    Aborted,
}

/// Seam over the login endpoint so the session manager can run against a mock.
#[async_trait::async_trait]
pub trait LoginApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, LoginError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpLoginClient {
    http: reqwest::Client,
    login_url: String,
}

impl HttpLoginClient {
    /// Build a client for `config.login_url()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: &AuthConfig) -> Result<Self, LoginError> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| LoginError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, login_url: config.login_url() })
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait::async_trait]
impl LoginApi for HttpLoginClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, LoginError> {
        // `form` also sets `Content-Type: application/x-www-form-urlencoded`.
        let resp = self
            .http
            .post(&self.login_url)
            .form(&LoginForm::from(credentials))
            .send()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoginError::Status { status: status.as_u16() });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;
        Ok(LoginResponse { access_token: parse_access_token(&body) })
    }
}

fn parse_access_token(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("access_token")?.as_str().map(str::to_owned)
}
