// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AuthGate: admin console for an API allowlist gateway
//
//  Console:   event-driven controller on a tokio loop
//  Backend:   REST allowlist API + server-sent log stream
//  Config:    YAML file with AUTHGATE_ env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod commands;
mod interactive;

use anyhow::Context;
use authgate_core::ConsoleConfig;
use authgate_core::config::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "authgate", version, about = "AuthGate — admin console for an API allowlist gateway")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "authgate.yaml", global = true)]
    config: PathBuf,

    /// Allowlist server base URL (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level (overrides `logging.level`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive console (default)
    Console,
    /// Print the allowlist
    List {
        /// Only show entries whose path or description contains this text
        #[arg(long)]
        filter: Option<String>,
        /// Print raw JSON instead of a table
        #[arg(long, conflicts_with = "html")]
        json: bool,
        /// Print the table as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Add an API path
    Add {
        path: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Create the entry disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Change path, description or status of an entry
    Update {
        id: i64,
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Flip the enabled flag of an entry
    Toggle { id: i64 },
    /// Delete an entry
    Delete {
        id: i64,
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Reset call counters
    ResetCount {
        #[arg(required_unless_present = "all")]
        id: Option<i64>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Bulk-import entries from a JSON array file
    Import { file: PathBuf },
    /// Ask the server to write an export file
    Export,
    /// Print recent operation logs
    Logs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Follow the live operation log
    Tail {
        /// Historical records printed before following
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete all operation logs
    ClearLogs {
        #[arg(long)]
        yes: bool,
    },
    /// Ask whether a path is authorized
    Check { path: String },
    /// Show the login password hint
    Hint,
    /// Change the admin password
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        /// Defaults to `--new`
        #[arg(long)]
        confirm: Option<String>,
    },
    /// End the server session
    Logout {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Config ──
    let mut config = ConsoleConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(base_url) = cli.base_url {
        config.server.base_url = base_url;
    }

    // ── Tracing ──
    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.server.base_url,
        "AuthGate starting"
    );

    match cli.command.unwrap_or(Command::Console) {
        Command::Console => interactive::run(config).await,
        command => commands::run(command, &config).await,
    }
}

/// Logs go to stderr so they never interleave with command output.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
