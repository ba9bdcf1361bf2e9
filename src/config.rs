//! Session configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

pub const DEFAULT_AUTH_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_AUTH_LOGIN_PATH: &str = "/api/users/login/token/";
pub const DEFAULT_AUTH_TOKEN_KEY: &str = "access_token";
pub const DEFAULT_AUTH_STORAGE_PATH: &str = ".phresh/storage.json";
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Scheme and host of the auth backend, without trailing slash.
    pub base_url: String,
    pub login_path: String,
    /// Storage key the bearer token is written under.
    pub token_key: String,
    pub storage_path: PathBuf,
    /// Leave the persisted token in storage on logout.
    pub keep_token_on_logout: bool,
    /// Whole-request timeout. `None` means the request may wait indefinitely.
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AUTH_BASE_URL.to_owned(),
            login_path: DEFAULT_AUTH_LOGIN_PATH.to_owned(),
            token_key: DEFAULT_AUTH_TOKEN_KEY.to_owned(),
            storage_path: PathBuf::from(DEFAULT_AUTH_STORAGE_PATH),
            keep_token_on_logout: false,
            request_timeout_secs: None,
            connect_timeout_secs: DEFAULT_AUTH_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl AuthConfig {
    /// Build typed config from environment variables. Every variable is optional.
    ///
    /// - `AUTH_BASE_URL`: default `http://localhost:8000`
    /// - `AUTH_LOGIN_PATH`: default `/api/users/login/token/`
    /// - `AUTH_TOKEN_KEY`: default `access_token`
    /// - `AUTH_STORAGE_PATH`: default `.phresh/storage.json`
    /// - `AUTH_KEEP_TOKEN_ON_LOGOUT`: boolean, default false
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: unset for no timeout
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error when a boolean or numeric variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let base_url = std::env::var("AUTH_BASE_URL")
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_owned();
        let login_path = std::env::var("AUTH_LOGIN_PATH").map_or(defaults.login_path, |p| normalize_path(&p));
        let token_key = std::env::var("AUTH_TOKEN_KEY").unwrap_or(defaults.token_key);
        let storage_path = std::env::var("AUTH_STORAGE_PATH").map_or(defaults.storage_path, PathBuf::from);
        let keep_token_on_logout = env_bool("AUTH_KEEP_TOKEN_ON_LOGOUT")?.unwrap_or(defaults.keep_token_on_logout);
        let request_timeout_secs = env_u64("AUTH_REQUEST_TIMEOUT_SECS")?;
        let connect_timeout_secs = env_u64("AUTH_CONNECT_TIMEOUT_SECS")?.unwrap_or(defaults.connect_timeout_secs);

        Ok(Self {
            base_url,
            login_path,
            token_key,
            storage_path,
            keep_token_on_logout,
            request_timeout_secs,
            connect_timeout_secs,
        })
    }

    /// Full login endpoint URL.
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_path)
    }
}

fn normalize_path(raw: &str) -> String {
    if raw.starts_with('/') { raw.to_owned() } else { format!("/{raw}") }
}

fn env_u64(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(None),
    }
}

fn env_bool(var: &'static str) -> Result<Option<bool>, ConfigError> {
    let Ok(value) = std::env::var(var) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}
