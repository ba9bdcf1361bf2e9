//! Session state and the transitions that move it.
//!
//! DESIGN
//! ======
//! `SessionState` is plain data. The only way to change it is to apply a
//! `Transition` through [`reduce`], a pure function of (old state,
//! transition). The store serializes those applications; this module knows
//! nothing about channels, HTTP or storage.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// SESSION STATE
// =============================================================================

/// Authentication state observed by the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// True strictly between `REQUEST_LOGIN` and its success/failure.
    pub is_loading: bool,
    /// Message of the last login failure.
    pub error: Option<String>,
    /// Opaque user/profile record. Emptied on failure.
    pub user: Map<String, Value>,
    /// Set by a successful login, cleared by failure and logout.
    pub is_authenticated: bool,
}

/// Lifecycle phase derived from the state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Anonymous,
    Authenticating,
    Authenticated,
    Failed,
}

impl SessionState {
    /// Loading wins over a stale error, so a retry from `Failed` reads as
    /// `Authenticating` even though the old message is still present.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Authenticating
        } else if self.error.is_some() {
            Phase::Failed
        } else if self.is_authenticated {
            Phase::Authenticated
        } else {
            Phase::Anonymous
        }
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// The four named events that update [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transition {
    #[serde(rename = "@@auth/REQUEST_LOGIN")]
    RequestLogin,
    #[serde(rename = "@@auth/REQUEST_LOGIN_SUCCESS")]
    RequestLoginSuccess,
    #[serde(rename = "@@auth/REQUEST_LOGIN_FAILURE")]
    RequestLoginFailure { error: String },
    #[serde(rename = "@@auth/REQUEST_LOG_USER_OUT")]
    RequestLogUserOut,
}

impl Transition {
    /// Wire name of the transition, e.g. `@@auth/REQUEST_LOGIN`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestLogin => "@@auth/REQUEST_LOGIN",
            Self::RequestLoginSuccess => "@@auth/REQUEST_LOGIN_SUCCESS",
            Self::RequestLoginFailure { .. } => "@@auth/REQUEST_LOGIN_FAILURE",
            Self::RequestLogUserOut => "@@auth/REQUEST_LOG_USER_OUT",
        }
    }
}

/// Apply one transition to a state, returning the next state.
#[must_use]
pub fn reduce(state: &SessionState, transition: &Transition) -> SessionState {
    match transition {
        Transition::RequestLogin => SessionState { is_loading: true, ..state.clone() },
        Transition::RequestLoginSuccess => {
            SessionState { is_loading: false, error: None, is_authenticated: true, ..state.clone() }
        }
        Transition::RequestLoginFailure { error } => SessionState {
            is_loading: false,
            error: Some(error.clone()),
            user: Map::new(),
            is_authenticated: false,
        },
        Transition::RequestLogUserOut => SessionState::default(),
    }
}
