//! `heat` command-line entry point.
//!
//! Stands in for the app front end: drives sign-in, sign-out, and session
//! inspection against the shared session manager. The persisted session
//! lives under `$HEAT_HOME` (default `~/.heat`).

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use heat_core::AuthConfig;
use heat_core::SessionManager;
use heat_core::SignInOutcome;

#[derive(Parser)]
#[command(
    name = "heat",
    about = "GitHub-backed session authentication for the Heat client",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in through the browser-based GitHub authorization flow.
    Login,
    /// Sign out and clear the persisted session.
    Logout,
    /// Show the current session, restored from disk if present.
    Status,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = AuthConfig::from_env()?;
    let manager = SessionManager::from_config(config);
    manager.restore().await?;

    match cli.command {
        Command::Login => login(&manager).await,
        Command::Logout => {
            manager.end_session().await?;
            println!("signed out");
            Ok(())
        }
        Command::Status => {
            status(&manager);
            Ok(())
        }
    }
}

async fn login(manager: &SessionManager) -> Result<()> {
    if let Some(user) = manager.current_user() {
        println!("already signed in as {}", user.login);
        return Ok(());
    }

    match manager.begin_session().await? {
        SignInOutcome::Established(user) => {
            println!("signed in as {} ({})", user.login, user.name);
        }
        SignInOutcome::Cancelled => println!("sign-in cancelled"),
        SignInOutcome::Denied => println!("sign-in denied"),
        SignInOutcome::AlreadyInProgress => {
            println!("a sign-in attempt is already running");
        }
    }
    Ok(())
}

fn status(manager: &SessionManager) {
    match manager.current_user() {
        Some(user) => {
            println!("signed in as {} ({})", user.login, user.name);
            println!("avatar: {}", user.avatar_url);
        }
        None => println!("not signed in"),
    }
}
