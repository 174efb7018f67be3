use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use detailhub::backend::Backend;
use detailhub::config::{BackendConfig, SessionSettings, session_file_from_env};
use detailhub::identity::{AuthEvent, AuthSubscription, IdentityService};
use detailhub::navigation::{Location, RouteGuard, entry_route, tabs_for};
use detailhub::profile::SignUpRole;
use detailhub::session::{AuthError, SessionFault, SessionManager, SessionState, SignUpRequest};
use serde_json::{Value, json};
use uuid::Uuid;

const SIGN_IN_SETTLE_SECS: u64 = 30;
const SIGN_OUT_SETTLE_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Session(SessionFault),
    #[error("timed out waiting for the session to settle")]
    Timeout,
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "detailhub", about = "DetailHub session client")]
struct Cli {
    /// Where the session is cached between runs.
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DETAILHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DETAILHUB_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_role, default_value = "client")]
        role: SignUpRole,
    },
    /// Show the restored user, landing route and tabs.
    Whoami,
    SignOut,
    /// Where the route guard sends the current user from `path`.
    Route { path: String },
}

fn parse_role(raw: &str) -> Result<SignUpRole, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let session_file = cli.session_file.unwrap_or_else(session_file_from_env);

    let (manager, identity) = match BackendConfig::from_env().and_then(|c| Backend::connect(&c, Some(session_file))) {
        Ok(backend) => {
            let identity: Arc<dyn IdentityService> = backend.identity;
            let manager = SessionManager::spawn(Arc::clone(&identity), backend.profiles, SessionSettings::from_env());
            (manager, Some(identity))
        }
        Err(e) => (SessionManager::unconfigured(&e), None),
    };

    let result = run(&manager, identity.as_deref(), cli.command).await;
    manager.teardown().await;
    result
}

async fn run(manager: &SessionManager, identity: Option<&dyn IdentityService>, command: Command) -> Result<(), CliError> {
    let state = manager.settled().await;
    if let Some(fault) = state.fault().filter(|f| f.is_terminal()) {
        return Err(CliError::Session(fault.clone()));
    }

    match command {
        Command::SignIn { email, password } => {
            let session = manager.sign_in(&email, &password).await.map_err(|e| {
                if e.is_validation() { e } else { AuthError::Rejected(e.sign_in_message()) }
            })?;
            let state = wait_for_user(manager, session.user_id()).await?;
            print_json(&describe(&state))
        }
        Command::SignUp { email, password, name, role } => {
            let created = manager
                .sign_up(&SignUpRequest::new(email, password, name, role))
                .await?;
            let state = wait_for_user(manager, created.id).await?;
            print_json(&describe(&state))
        }
        Command::Whoami => print_json(&describe(&state)),
        Command::SignOut => {
            // Without a session the identity service emits nothing to wait for.
            let had_session = state.user().is_some() || state.fault().is_some();
            let events = identity.filter(|_| had_session).map(|i| i.subscribe());
            manager.sign_out().await;
            if let Some(events) = events {
                wait_for_signed_out(events).await;
            }
            print_json(&describe(&manager.state()))
        }
        Command::Route { path } => {
            let location = Location::parse(&path);
            let target = if location.segments().is_empty() {
                Some(entry_route(state.user()))
            } else {
                RouteGuard::new().observe(&state, Some(&location))
            };
            print_json(&json!({
                "from": path,
                "redirect": target.map(|r| r.path()),
            }))
        }
    }
}

/// After sign-in the profile loads in the background; wait until the state
/// describes `user_id`'s session, not whatever was there before.
async fn wait_for_user(manager: &SessionManager, user_id: Uuid) -> Result<SessionState, CliError> {
    let mut rx = manager.subscribe();
    let settled = tokio::time::timeout(
        Duration::from_secs(SIGN_IN_SETTLE_SECS),
        rx.wait_for(|s| s.is_resolved_for(user_id)),
    )
        .await
        .map_err(|_| CliError::Timeout)?;

    let state = match settled {
        Ok(state) => state.clone(),
        Err(_) => manager.state(),
    };
    match state.fault() {
        Some(fault) => Err(CliError::Session(fault.clone())),
        None => Ok(state),
    }
}

/// The local clear in the identity service runs on a background task; wait
/// for it so the cached session is gone before the process exits.
async fn wait_for_signed_out(mut events: AuthSubscription) {
    let wait = async {
        while let Some(change) = events.recv().await {
            if change.event == AuthEvent::SignedOut {
                break;
            }
        }
    };
    if tokio::time::timeout(Duration::from_secs(SIGN_OUT_SETTLE_SECS), wait).await.is_err() {
        tracing::warn!("sign-out did not confirm locally in time");
    }
}

fn describe(state: &SessionState) -> Value {
    let tabs: Vec<Value> = tabs_for(state.role())
        .iter()
        .map(|t| json!({ "title": t.title, "route": t.route.path() }))
        .collect();
    json!({
        "user": state.user(),
        "fault": state.fault().map(ToString::to_string),
        "landing": entry_route(state.user()).path(),
        "tabs": tabs,
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
