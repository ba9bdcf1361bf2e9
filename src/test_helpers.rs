//! Shared fixtures for unit tests: an in-process login endpoint and a
//! scripted `LoginApi` whose answers can be held back.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use tokio::sync::Semaphore;

use crate::api::{Credentials, LoginApi, LoginError, LoginForm, LoginResponse};
use crate::config::{AuthConfig, DEFAULT_AUTH_LOGIN_PATH};

// =============================================================================
// MOCK LOGIN ENDPOINT
// =============================================================================

/// One request as the mock endpoint decoded it.
#[derive(Debug, Clone)]
pub struct ReceivedLogin {
    pub form: LoginForm,
    pub content_type: Option<String>,
}

#[derive(Clone)]
struct EndpointState {
    status: StatusCode,
    body: String,
    received: Arc<Mutex<Vec<ReceivedLogin>>>,
}

pub struct MockLoginEndpoint {
    pub base_url: String,
    received: Arc<Mutex<Vec<ReceivedLogin>>>,
}

impl MockLoginEndpoint {
    /// Config pointing at this endpoint with default everything else.
    pub fn config(&self) -> AuthConfig {
        AuthConfig { base_url: self.base_url.clone(), ..AuthConfig::default() }
    }

    pub fn received(&self) -> Vec<ReceivedLogin> {
        self.received.lock().expect("received mutex should lock").clone()
    }
}

async fn login_handler(
    State(state): State<EndpointState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> (StatusCode, String) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state
        .received
        .lock()
        .expect("received mutex should lock")
        .push(ReceivedLogin { form, content_type });
    (state.status, state.body.clone())
}

/// Bind a login endpoint on an ephemeral localhost port that always answers
/// `status` with `body`.
pub async fn spawn_login_endpoint(status: StatusCode, body: &str) -> MockLoginEndpoint {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = EndpointState { status, body: body.to_owned(), received: Arc::clone(&received) };
    let app = Router::new()
        .route(DEFAULT_AUTH_LOGIN_PATH, post(login_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock endpoint should bind");
    let addr = listener.local_addr().expect("mock endpoint addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock endpoint failed");
    });

    MockLoginEndpoint { base_url: format!("http://{addr}"), received }
}

// =============================================================================
// SCRIPTED LOGIN API
// =============================================================================

/// `LoginApi` that answers from a queue. When gated, each call waits for a
/// permit from [`ScriptedLoginApi::release`] before answering.
pub struct ScriptedLoginApi {
    responses: Mutex<VecDeque<Result<LoginResponse, LoginError>>>,
    gate: Option<Semaphore>,
    calls: Mutex<Vec<Credentials>>,
}

impl ScriptedLoginApi {
    pub fn new(responses: Vec<Result<LoginResponse, LoginError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), gate: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn gated(responses: Vec<Result<LoginResponse, LoginError>>) -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::new(responses) }
    }

    /// Let one held-back call answer.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<Credentials> {
        self.calls.lock().expect("calls mutex should lock").clone()
    }
}

#[async_trait::async_trait]
impl LoginApi for ScriptedLoginApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, LoginError> {
        self.calls
            .lock()
            .expect("calls mutex should lock")
            .push(credentials.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.responses
            .lock()
            .expect("responses mutex should lock")
            .pop_front()
            .unwrap_or_else(|| Err(LoginError::Transport("no scripted response".into())))
    }
}

pub fn token(value: &str) -> Result<LoginResponse, LoginError> {
    Ok(LoginResponse { access_token: Some(value.to_owned()) })
}
