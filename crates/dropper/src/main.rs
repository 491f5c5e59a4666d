//! Dropper server binary.
//!
//! Parses the CLI, layers configuration (file, then environment, then
//! flags), resolves the authentication mode, and runs the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dropper::auth::{AuthMode, Credential};
use dropper::config::Config;
use dropper::server::{self, AppState};

/// Environment variable holding the `user:pass` credential.
const CREDENTIAL_VAR: &str = "DROP_AUTH";

const LONG_ABOUT: &str = "\
Serve a directory tree over HTTP for browsing, search, and download.

By default every request requires HTTP Basic authentication; set the
DROP_AUTH environment variable to user:pass to configure the credential,
or pass --no-auth to disable the gate for this run.

Every file is also reachable by bare filename through the /drop/<name>
shortcut:

    curl -O http://<host>:<port>/drop/notes.txt

Colliding filenames get a numeric suffix before the extension
(notes_1.txt), assigned once at startup.";

/// Dropper - share a directory tree over HTTP.
#[derive(Parser, Debug)]
#[command(name = "dropper")]
#[command(version, about, long_about = LONG_ABOUT)]
pub struct Cli {
    /// Root directory to serve (created if absent)
    #[arg(short, long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Host to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Disable authentication for this run
    #[arg(long)]
    pub no_auth: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .init();

    // Load configuration, then layer environment and CLI overrides on top
    let mut config = if let Some(config_path) = &cli.config {
        info!("Using config file: {:?}", config_path);
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };
    config.apply_env_overrides();

    if let Some(dir) = cli.dir {
        config.files.root = dir;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    // Resolve the authentication mode before touching the filesystem;
    // guarded mode without a credential must die before binding anything
    let auth = if cli.no_auth || !config.auth.required {
        AuthMode::Open
    } else {
        match credential_from_env() {
            Some(credential) => AuthMode::Guarded(credential),
            None => {
                print_credential_help();
                std::process::exit(1);
            }
        }
    };

    let root = config.files.root.clone();
    if !root.exists() {
        info!("Creating root directory: {}", root.display());
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create root directory {}", root.display()))?;
    }

    let state = AppState::new(&root, auth)
        .with_context(|| format!("cannot serve root directory {}", root.display()))?;
    info!("Short-name table holds {} entries", state.short_names.len());

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Serving root: {}", state.resolver.root().display());
    if state.auth.is_guarded() {
        info!(
            "Basic auth enabled; set {}=user:pass to change the credential",
            CREDENTIAL_VAR
        );
    } else {
        warn!("Authentication disabled; anyone who can reach the socket can read files");
    }
    info!("Open http://{} in your browser", bind_addr);

    server::serve(listener, Arc::new(state)).await?;

    Ok(())
}

/// Read the credential from the environment; empty counts as unset.
fn credential_from_env() -> Option<Credential> {
    std::env::var(CREDENTIAL_VAR)
        .ok()
        .and_then(|value| Credential::from_env_value(&value))
}

/// Log filter for the process: `RUST_LOG` when set, otherwise a default
/// level chosen by `--verbose`.
fn log_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn print_credential_help() {
    eprintln!();
    eprintln!("ERROR: the {} environment variable is not set.", CREDENTIAL_VAR);
    eprintln!("Set a username and password to secure the server. Format: user:pass");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  On Linux/macOS:");
    eprintln!("    export {}=\"admin:mypassword\"", CREDENTIAL_VAR);
    eprintln!("  On Windows CMD:");
    eprintln!("    set {}=admin:mypassword", CREDENTIAL_VAR);
    eprintln!("  On Windows PowerShell:");
    eprintln!("    $env:{}=\"admin:mypassword\"", CREDENTIAL_VAR);
    eprintln!();
    eprintln!("To run without authentication, pass --no-auth.");
}
