//! Client-side auth session manager for the Phresh web client.
//!
//! SYSTEM CONTEXT
//! ==============
//! The UI reads a single [`SessionState`] and triggers two use cases on
//! [`SessionManager`]: `request_user_login` and `log_user_out`. Everything
//! else here is a seam around one collaborator: the login endpoint
//! ([`api`]), durable token storage ([`storage`]) and the state container
//! ([`store`]).

pub mod api;
pub mod config;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::{Credentials, HttpLoginClient, LoginApi, LoginError};
pub use config::AuthConfig;
pub use session::{SessionError, SessionManager};
pub use state::{Phase, SessionState, Transition};
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
pub use store::SessionStore;
