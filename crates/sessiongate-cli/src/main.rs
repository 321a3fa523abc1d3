//! sessiongate - an interactive shell over the session subsystem.
//!
//! Wires the REST identity provider, session store, bootstrap gate and
//! route guard together the way a UI shell would: startup is held until the
//! provider reports the first authoritative state, and every navigation
//! goes through the guard.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessiongate_core::{
    BootstrapGate, Config, CredentialStore, Decision, IdentityFacade, RestProvider, Route,
    RouteGuard, SessionState, SessionStore, VerificationOutcome,
};

/// Landing route; `/` redirects here
const HOME_PATH: &str = "/characters";

/// How long to wait for the store to reflect a successful operation.
/// The provider pushes promptly; 5s only matters when something is wrong.
const CONVERGENCE_TIMEOUT_SECS: u64 = 5;

/// Static route table, equivalent to the application's router definition
fn routes() -> Vec<Route> {
    vec![
        Route::public("/characters"),
        Route::public("/login"),
        Route::public("/register"),
        Route::protected("/favorites"),
    ]
}

/// Initialize tracing with a rolling file writer.
/// Stdout carries the interactive prompt, so logs go to a file.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = Config::log_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let file = tracing_appender::rolling::daily(log_dir, "sessiongate.log");
    let (writer, guard) = tracing_appender::non_blocking(file);

    // Use RUST_LOG to control the log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing()?;
    info!("sessiongate starting");

    let mut config = Config::load().context("Failed to load configuration")?;
    let api_key = config
        .api_key()
        .context("No API key configured; set SESSIONGATE_API_KEY or api_key in config.json")?;

    let provider = Arc::new(
        RestProvider::new(config.api_base_url.clone(), api_key)
            .context("Failed to construct provider client")?,
    );
    let store = SessionStore::connect(provider.as_ref())
        .context("Failed to subscribe to the identity provider")?;
    let facade = IdentityFacade::new(
        provider.clone(),
        &store,
        config.verification_return_url.clone(),
    );
    let guard = RouteGuard::new(&store);
    let gate = BootstrapGate::new(&store);

    // Hold the shell until the provider reports the first authoritative state
    let initial = gate
        .open()
        .await
        .context("Startup aborted before any session state arrived")?;
    if let Some(state) = initial {
        print_state(&state);
    }

    let result = run_shell(&store, &facade, &guard, &mut config).await;
    info!("sessiongate shutting down");
    result
}

async fn run_shell(
    store: &SessionStore,
    facade: &IdentityFacade,
    guard: &RouteGuard,
    config: &mut Config,
) -> Result<()> {
    let table = routes();
    let mut current_path = HOME_PATH.to_string();
    print_help();

    loop {
        print!("{} > ", current_path);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };

        match command {
            "go" => {
                let Some(target) = parts.next() else {
                    println!("usage: go <path>");
                    continue;
                };
                let target = if target == "/" { HOME_PATH } else { target };
                match table.iter().find(|route| route.path == target) {
                    Some(route) => match guard.decide(route) {
                        Decision::Allow => {
                            current_path = route.path.clone();
                            println!("now at {}", current_path);
                        }
                        Decision::RedirectTo(login_path) => {
                            println!("sign in required, redirecting to {}", login_path);
                            current_path = login_path;
                        }
                    },
                    None => println!("no such route: {}", target),
                }
            }
            "login" => do_login(facade, store, config, parts.next()).await?,
            "register" => do_register(facade, store, parts.next()).await?,
            "logout" => match facade.logout().await {
                Ok(()) => {
                    await_convergence(store, |state| !state.is_authenticated()).await;
                    println!("signed out");
                }
                Err(err) => println!("error: {}", err),
            },
            "verify" => match facade.send_verification_email(None).await {
                Ok(VerificationOutcome::Sent) => println!("verification email sent"),
                Ok(VerificationOutcome::AlreadyVerified) => println!("email already verified"),
                Err(err) => println!("error: {}", err),
            },
            "whoami" => print_state(&store.current()),
            "forget" => match parts.next() {
                Some(email) => match CredentialStore::delete(email) {
                    Ok(()) => println!("removed saved password for {}", email),
                    Err(err) => println!("error: {}", err),
                },
                None => println!("usage: forget <email>"),
            },
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("unknown command: {} (try 'help')", other),
        }
    }
    Ok(())
}

async fn do_login(
    facade: &IdentityFacade,
    store: &SessionStore,
    config: &mut Config,
    email_arg: Option<&str>,
) -> Result<()> {
    let email = match email_arg {
        Some(email) => email.to_string(),
        None => match &config.last_email {
            Some(email) => {
                println!("logging in as {}", email);
                email.clone()
            }
            None => prompt_line("email: ")?,
        },
    };

    let saved = CredentialStore::has_credentials(&email);
    let password = if saved {
        println!("using saved password for {}", email);
        CredentialStore::get_password(&email)?
    } else {
        rpassword::prompt_password("password: ")?
    };

    match facade.login(&email, &password).await {
        Ok(_session) => {
            // Navigation keys off the store, so wait for it to catch up
            await_convergence(store, SessionState::is_authenticated).await;
            print_state(&store.current());

            config.last_email = Some(email.clone());
            let _ = config.save();

            if !saved && confirm("save password to keychain? [y/N] ")? {
                CredentialStore::store(&email, &password)?;
                println!("saved");
            }
        }
        Err(err) => println!("error: {}", err),
    }
    Ok(())
}

async fn do_register(
    facade: &IdentityFacade,
    store: &SessionStore,
    email_arg: Option<&str>,
) -> Result<()> {
    let email = match email_arg {
        Some(email) => email.to_string(),
        None => prompt_line("email: ")?,
    };
    let password = rpassword::prompt_password("password: ")?;

    match facade.register(&email, &password).await {
        Ok(_session) => {
            await_convergence(store, SessionState::is_authenticated).await;
            print_state(&store.current());
            println!("run 'verify' to confirm your email address");
        }
        Err(err) => println!("error: {}", err),
    }
    Ok(())
}

/// Wait until the store reflects the operation that just resolved.
/// A façade result is an acknowledgment only; the store is authoritative.
async fn await_convergence<F>(store: &SessionStore, predicate: F)
where
    F: FnMut(&SessionState) -> bool,
{
    let mut rx = store.watch();
    let _ = tokio::time::timeout(
        Duration::from_secs(CONVERGENCE_TIMEOUT_SECS),
        rx.wait_for(predicate),
    )
    .await;
}

fn print_state(state: &SessionState) {
    match state {
        SessionState::Unknown => println!("session state not yet known"),
        SessionState::Anonymous => println!("not signed in"),
        SessionState::Authenticated(session) => println!(
            "signed in as {} ({})",
            session.email,
            if session.email_verified {
                "verified"
            } else {
                "unverified"
            }
        ),
    }
}

fn print_help() {
    println!("commands:");
    println!("  go <path>        navigate (routes: /characters /favorites /login /register)");
    println!("  login [email]    sign in");
    println!("  register [email] create an account");
    println!("  logout           sign out");
    println!("  verify           send a verification email for the current session");
    println!("  whoami           show the current session state");
    println!("  forget <email>   remove a saved password");
    println!("  quit             exit");
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(prompt_line(prompt)?.eq_ignore_ascii_case("y"))
}
