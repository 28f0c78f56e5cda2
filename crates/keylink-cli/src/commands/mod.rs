//! CLI command definitions and handlers.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use keylink_core::config::Config;
use keylink_core::store::Database;

pub mod config;
pub mod link;
pub mod list;
pub mod revoke;
pub mod start;
pub mod unban;

/// Load configuration and apply command-line and environment overrides.
///
/// A missing config file yields defaults; a malformed one is an error, as is
/// a configuration that fails validation.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    global.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Open the link database named by `config`.
pub fn open_database(config: &Config) -> Result<Database> {
    let path = config.database_path();
    Database::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Keylink - expiring download links for local files
#[derive(Parser)]
#[command(name = "keylink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted before or after any command.
///
/// Each one overrides the matching value from the config file.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "KEYLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "KEYLINK_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Port the retrieval endpoint listens on (also used in issued URLs)
    #[arg(long, global = true, env = "KEYLINK_PORT")]
    pub port: Option<u16>,

    /// Public host used when formatting URLs
    #[arg(long, global = true, env = "KEYLINK_HOST")]
    pub host: Option<String>,

    /// Secret mixed into deterministic tokens
    #[arg(long, global = true, env = "KEYLINK_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// SQLite database file
    #[arg(long, global = true, env = "KEYLINK_DATABASE")]
    pub database: Option<PathBuf>,
}

impl GlobalArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(secret) = &self.secret {
            config.links.secret = Some(secret.clone());
        }
        if let Some(database) = &self.database {
            config.storage.database = Some(database.clone());
        }
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Run the retrieval endpoint in the foreground
    Start(StartArgs),

    /// Issue a link for a file or directory
    Link(LinkArgs),

    /// List stored links or failed-attempt records
    List(ListArgs),

    /// Clear a client's failed attempts
    Unban(UnbanArgs),

    /// Delete a link
    Revoke(RevokeArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

/// Arguments for the start command
#[derive(Parser)]
pub struct StartArgs {
    /// Address to bind
    #[arg(long, env = "KEYLINK_BIND")]
    pub bind: Option<IpAddr>,
}

/// Arguments for the link command
#[derive(Parser)]
pub struct LinkArgs {
    /// File or directory to share
    pub path: PathBuf,

    /// Link lifetime (e.g., 30m, 24h, 7d)
    #[arg(short, long)]
    pub expire: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command
#[derive(Parser)]
pub struct ListArgs {
    /// What to list
    #[command(subcommand)]
    pub what: ListTarget,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,
}

/// List subcommands
#[derive(Subcommand)]
pub enum ListTarget {
    /// Stored links
    Entries {
        /// Only links that have not expired
        #[arg(long, conflicts_with = "expired")]
        active: bool,

        /// Only links that have expired
        #[arg(long)]
        expired: bool,
    },

    /// Clients with failed attempts
    Attempts,
}

/// Arguments for the unban command
#[derive(Parser)]
pub struct UnbanArgs {
    /// Client address to clear
    pub client: String,
}

/// Arguments for the revoke command
#[derive(Parser)]
pub struct RevokeArgs {
    /// Token of the link to delete
    pub token: String,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}
