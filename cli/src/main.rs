use std::path::PathBuf;

use authsession::dashboard::{self, DashboardState};
use authsession::forms::{self, Notice, NoticeKind};
use authsession::guard::{self, Access, DASHBOARD_PATH};
use authsession::validation::{SignUpForm, ValidationError};
use authsession::{ClientConfig, FileStore, HttpApi, NetworkError, SessionManager, TransportError, UserProfile};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

type Session = SessionManager<HttpApi, FileStore>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("health check failed: {0}")]
    Health(NetworkError),
    #[error("{0}")]
    Rejected(String),
    #[error("invalid signup form:\n{0}")]
    InvalidForm(String),
    #[error("not signed in; redirected to {to} (from {from})")]
    NotSignedIn { to: &'static str, from: String },
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Parser, Debug)]
#[command(name = "authsession-cli", about = "Sign in to the Xploit-Eye API and manage the local session")]
struct Cli {
    /// Backend base URL, e.g. `http://localhost:8000/api`.
    #[arg(long, env = "AUTH_API_BASE_URL")]
    base_url: Option<String>,

    /// Session file; defaults to the per-user data directory.
    #[arg(long, env = "AUTH_STORAGE_PATH")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is up.
    Ping,
    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "AUTH_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    /// Sign in with an email address or username.
    Signin {
        identifier: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the local session.
    Logout,
    /// Ask the backend who the stored token belongs to.
    Whoami,
    /// Show the protected dashboard.
    Dashboard,
    /// Print the local session state without contacting the backend.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.base_url.as_deref() {
        config = config.with_api_base_url(url);
    }
    if let Some(path) = cli.storage {
        config = config.with_storage_path(path);
    }
    tracing::debug!(base_url = %config.api_base_url, storage = %config.storage_path.display(), "cli configured");

    let api = HttpApi::new(&config)?;
    let mut session = SessionManager::new(api, FileStore::new(&config.storage_path));

    match cli.command {
        Command::Ping => run_ping(&session).await,
        Command::Signup { name, username, email, password, confirm_password } => {
            let form = SignUpForm { name, username, email, password, confirm_password };
            run_signup(&mut session, &form).await
        }
        Command::Signin { identifier, password } => {
            let notice = forms::submit_sign_in(&mut session, &identifier, &password).await;
            report(notice)
        }
        Command::Logout => {
            let (notice, next) = dashboard::logout(&mut session).await;
            report(notice)?;
            println!("next: {next}");
            Ok(())
        }
        Command::Whoami => run_whoami(&mut session).await,
        Command::Dashboard => run_dashboard(&mut session).await,
        Command::Status => {
            run_status(&session);
            Ok(())
        }
    }
}

async fn run_ping(session: &Session) -> Result<(), CliError> {
    let health = session.health().await.map_err(CliError::Health)?;
    match health.version {
        Some(version) => println!("{} (version {version})", health.status),
        None => println!("{}", health.status),
    }
    Ok(())
}

async fn run_signup(session: &mut Session, form: &SignUpForm) -> Result<(), CliError> {
    match forms::submit_sign_up(session, form).await {
        Ok(notice) => report(notice),
        Err(e) => Err(CliError::InvalidForm(render_field_errors(&e))),
    }
}

async fn run_whoami(session: &mut Session) -> Result<(), CliError> {
    guarded(session, "/me")?;
    match session.current_user().await {
        Some(user) => {
            print_profile(&user);
            Ok(())
        }
        None => Err(CliError::Unavailable(dashboard::unavailable_notice(session).message)),
    }
}

async fn run_dashboard(session: &mut Session) -> Result<(), CliError> {
    guarded(session, DASHBOARD_PATH)?;
    match dashboard::load(session).await {
        DashboardState::Ready(user) => {
            print_profile(&user);
            if let Some(data) = session.dashboard().await {
                if !data.message.is_empty() {
                    println!("{}", data.message);
                }
            }
            Ok(())
        }
        DashboardState::Unavailable => Err(CliError::Unavailable(dashboard::unavailable_notice(session).message)),
    }
}

fn run_status(session: &Session) {
    println!("backend: {}", session.api().base_url());
    println!("session file: {}", session.store().path().display());
    println!("{}", status_line(session.is_authenticated(), session.user()));
}

fn status_line(authenticated: bool, user: Option<&UserProfile>) -> String {
    match (authenticated, user) {
        (false, _) => "signed out".to_owned(),
        (true, Some(user)) => format!("signed in as {} <{}>", user.username, user.email),
        (true, None) => "signed in (profile not cached)".to_owned(),
    }
}

fn guarded(session: &Session, location: &str) -> Result<(), CliError> {
    match guard::require_auth(session, location) {
        Access::Granted => Ok(()),
        Access::Redirect { to, from } => Err(CliError::NotSignedIn { to, from }),
    }
}

fn report(notice: Notice) -> Result<(), CliError> {
    match notice.kind {
        NoticeKind::Error => Err(CliError::Rejected(notice.message)),
        NoticeKind::Success | NoticeKind::Warning => {
            println!("{notice}");
            Ok(())
        }
    }
}

fn print_profile(user: &UserProfile) {
    for (label, value) in dashboard::profile_rows(user) {
        println!("{label:>9}: {value}");
    }
}

fn render_field_errors(err: &ValidationError) -> String {
    err.errors
        .iter()
        .map(|e| format!("  {}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
