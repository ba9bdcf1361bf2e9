use clap::{Parser, Subcommand};
use phresh_auth::config::ConfigError;
use phresh_auth::{AuthConfig, Credentials, LoginError, Phase, SessionError, SessionManager};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Client(#[from] LoginError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("login task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "phresh-auth", about = "Log in to and out of a Phresh backend")]
struct Cli {
    /// Overrides `AUTH_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `AUTH_STORAGE_PATH`.
    #[arg(long)]
    storage_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange email/password for a bearer token and persist it.
    Login {
        #[arg(long, env = "PHRESH_EMAIL")]
        email: String,
        #[arg(long, env = "PHRESH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Reset the session and clear the persisted token.
    Logout,
    /// Report whether a token is persisted.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Missing .env is normal.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = AuthConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(path) = cli.storage_path {
        config.storage_path = path;
    }

    let manager = SessionManager::from_config(&config)?;
    match cli.command {
        Command::Login { email, password } => run_login(&manager, Credentials::new(email, password)).await,
        Command::Logout => run_logout(&manager, &config),
        Command::Status => run_status(&manager, &config),
    }
}

async fn run_login(manager: &SessionManager, credentials: Credentials) -> Result<(), CliError> {
    let mut transitions = manager.store().subscribe_transitions();
    manager.request_user_login(credentials)?.await?;
    while let Ok(t) = transitions.try_recv() {
        eprintln!("{}", t.name());
    }

    let state = manager.state();
    print_json(&json!({ "phase": state.phase(), "state": state }))?;
    match state.phase() {
        Phase::Failed => Err(CliError::LoginFailed(state.error.unwrap_or_default())),
        _ => Ok(()),
    }
}

fn run_logout(manager: &SessionManager, config: &AuthConfig) -> Result<(), CliError> {
    manager.log_user_out();
    print_json(&json!({
        "phase": manager.state().phase(),
        "tokenCleared": !config.keep_token_on_logout,
    }))
}

fn run_status(manager: &SessionManager, config: &AuthConfig) -> Result<(), CliError> {
    print_json(&json!({
        "loginUrl": config.login_url(),
        "storagePath": config.storage_path.display().to_string(),
        "tokenKey": config.token_key,
        "tokenStored": manager.stored_token().is_some_and(|t| !t.is_empty()),
    }))
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
