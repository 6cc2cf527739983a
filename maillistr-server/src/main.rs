//! maillistr - mailing-list collection service
//!
//! `maillistr serve` (the default) runs the HTTP server; the other
//! subcommands manage the database, lists and API key from the shell.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maillistr_common::config::{resolve_config_path, TomlConfig};
use maillistr_common::db;
use maillistr_server::dispatch::{Dispatcher, MailchimpClient};
use maillistr_server::{build_router, commands, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for queued subscribe calls
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Command-line arguments for maillistr
#[derive(Parser, Debug)]
#[command(name = "maillistr")]
#[command(about = "Mailing-list collection service")]
#[command(version)]
struct Cli {
    /// Config file (default: $MAILLISTR_CONFIG, ./maillistr.toml, user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database and write a new API key to the config file
    Init,
    /// Create the database schema
    Createdb,
    /// Print a new random API key
    Genapikey,
    /// Create a mailing list
    Createlist {
        slug: String,
        /// Mailchimp list to forward new entries to
        #[arg(long)]
        mailchimp_list_id: Option<String>,
    },
    /// Delete a mailing list and all its entries
    Dellist { slug: String },
    /// Print every list slug
    Lists,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(startup(&config_path, true)?).await,
        Command::Init => {
            // init writes the file, so it must not fail on an incomplete one
            let config = startup(&config_path, false)?;
            let key = commands::init(config, &config_path).await?;
            println!("{}", key);
            Ok(())
        }
        Command::Createdb => commands::createdb(&startup(&config_path, true)?).await,
        Command::Genapikey => {
            println!("{}", commands::genapikey());
            Ok(())
        }
        Command::Createlist {
            slug,
            mailchimp_list_id,
        } => {
            let config = startup(&config_path, true)?;
            let list = commands::createlist(&config, &slug, mailchimp_list_id.as_deref()).await?;
            println!("Created list {}", list.slug);
            Ok(())
        }
        Command::Dellist { slug } => {
            let config = startup(&config_path, true)?;
            let removed = commands::dellist(&config, &slug).await?;
            println!("Deleted list {} ({} entries)", slug, removed);
            Ok(())
        }
        Command::Lists => {
            for slug in commands::lists(&startup(&config_path, true)?).await? {
                println!("{}", slug);
            }
            Ok(())
        }
    }
}

/// Load the config, then start logging at its level and report where the
/// config came from. `strict` applies env overrides and validation.
fn startup(config_path: &Path, strict: bool) -> Result<TomlConfig> {
    let config = if strict {
        TomlConfig::load(config_path)
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))?
    } else {
        TomlConfig::from_file(config_path)?
    };

    init_tracing(&config.logging.level);

    if config_path.exists() {
        info!("Loaded configuration from {}", config_path.display());
    } else {
        warn!(
            "Config file not found at {}, using built-in defaults",
            config_path.display()
        );
    }

    Ok(config)
}

/// `RUST_LOG` wins; otherwise a bare level from the config applies to this
/// service's crates and the HTTP trace layer.
fn init_tracing(level: &str) {
    let default_filter = if level.contains('=') {
        level.to_string()
    } else {
        format!(
            "maillistr={0},maillistr_server={0},maillistr_common={0},tower_http={0}",
            level
        )
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config: TomlConfig) -> Result<()> {
    info!("Starting maillistr v{}", env!("CARGO_PKG_VERSION"));

    if config.api_key.is_empty() {
        warn!("No api_key configured, every admin request will be refused");
    }

    let pool = db::init_database(&config.database_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open database {}",
                config.database_path.display()
            )
        })?;

    let (dispatcher, worker) = if config.mailchimp.enabled {
        let client = MailchimpClient::new(&config.mailchimp)
            .context("Failed to build Mailchimp client")?;
        let call_timeout = Duration::from_secs(config.mailchimp.timeout_secs);
        let (dispatcher, worker) = Dispatcher::spawn(Arc::new(client), &config.dispatch, call_timeout);
        info!(
            queue_capacity = config.dispatch.queue_capacity,
            max_in_flight = config.dispatch.max_in_flight,
            "Mailchimp sync enabled"
        );
        (Some(dispatcher), Some(worker))
    } else {
        info!("Mailchimp sync disabled");
        (None, None)
    };

    let state = AppState::new(pool.clone(), &config.api_key, dispatcher);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!("maillistr listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // The router held the last dispatcher handle; the worker now drains
    if let Some(worker) = worker {
        match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
            Ok(_) => info!("Dispatch queue drained"),
            Err(_) => warn!(
                "Dispatch queue not drained after {:?}, dropping pending calls",
                DRAIN_TIMEOUT
            ),
        }
    }

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
