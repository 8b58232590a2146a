//! rediguard CLI
//!
//! Command-line access to a rediguard-managed store.
//!
//! # Commands
//!
//! - `get` / `set` / `del` / `inc` / `dec` - Single-key operations
//! - `keys` / `dump` - List keys, or keys with values
//! - `del-by-set` / `del-all` - Bulk deletion
//! - `lock` / `unlock` / `lock-status` / `sweep` - Advisory locks
//! - `config` - Show the effective configuration

mod commands;

use clap::{Parser, Subcommand};
use rediguard_bootstrap::{ConfigFile, ConfigOverrides};
use rediguard_core::Client;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// rediguard command-line tools.
#[derive(Parser)]
#[command(name = "rediguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(global = true, short, long, default_value = "rediguard.json")]
    config: PathBuf,

    /// Server host
    #[arg(global = true, long)]
    host: Option<String>,

    /// Server port
    #[arg(global = true, long)]
    port: Option<u16>,

    /// Server password
    #[arg(global = true, long)]
    password: Option<String>,

    /// Database index
    #[arg(global = true, long)]
    db: Option<u32>,

    /// Key prefix
    #[arg(global = true, long)]
    prefix: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a key
    Get {
        /// Logical key name
        name: String,
    },

    /// Store a value
    Set {
        /// Logical key name
        name: String,

        /// Value to store
        value: String,

        /// Expiry in seconds (0 for none; default from config)
        #[arg(short, long)]
        ttl: Option<u64>,

        /// Parse the value as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a key
    Del {
        /// Logical key name
        name: String,
    },

    /// Increment an integer
    Inc {
        /// Logical key name
        name: String,

        /// Amount to add
        #[arg(default_value = "1")]
        delta: i64,
    },

    /// Decrement an integer
    Dec {
        /// Logical key name
        name: String,

        /// Amount to subtract
        #[arg(default_value = "1")]
        delta: i64,
    },

    /// List keys under the prefix
    Keys {
        /// Ignore the prefix and list every key
        #[arg(short, long)]
        all: bool,
    },

    /// Print keys with their values
    Dump {
        /// Ignore the prefix and dump every key
        #[arg(short, long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete every key listed in a set
    DelBySet {
        /// Logical name of the set
        set: String,
    },

    /// Delete every key under the prefix
    DelAll {
        /// Ignore the prefix and delete every key in the database
        #[arg(short, long)]
        all: bool,
    },

    /// Try to take a lock
    Lock {
        /// Lock name
        name: String,

        /// Lock lifetime in seconds (default from config)
        #[arg(short, long)]
        ttl: Option<u64>,
    },

    /// Release a lock
    Unlock {
        /// Lock name
        name: String,
    },

    /// Show whether a lock is free, held or expired
    LockStatus {
        /// Lock name
        name: String,
    },

    /// Reclaim stale locks
    Sweep,

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Commands::Version = cli.command {
        writeln!(out, "rediguard CLI v{}", env!("CARGO_PKG_VERSION"))?;
        return Ok(());
    }

    let file = load_config(&cli)?;
    if let Commands::Config = cli.command {
        return commands::config::run(&file, &mut out);
    }

    tracing::debug!(host = %file.host, port = file.port, db = file.select, prefix = %file.prefix, "connecting");
    let client = Client::connect_redis(file.into_client_config())?;
    match cli.command {
        Commands::Get { name } => commands::data::get(&client, &name, &mut out)?,
        Commands::Set {
            name,
            value,
            ttl,
            json,
        } => commands::data::set(&client, &name, &value, ttl, json, &mut out)?,
        Commands::Del { name } => commands::data::del(&client, &name, &mut out)?,
        Commands::Inc { name, delta } => commands::data::inc(&client, &name, delta, &mut out)?,
        Commands::Dec { name, delta } => commands::data::dec(&client, &name, delta, &mut out)?,
        Commands::Keys { all } => commands::data::keys(&client, all, &mut out)?,
        Commands::Dump { all, format } => commands::data::dump(&client, all, &format, &mut out)?,
        Commands::DelBySet { set } => commands::data::del_by_set(&client, &set, &mut out)?,
        Commands::DelAll { all } => commands::data::del_all(&client, all, &mut out)?,
        Commands::Lock { name, ttl } => commands::lock::lock(&client, &name, ttl, &mut out)?,
        Commands::Unlock { name } => commands::lock::unlock(&client, &name, &mut out)?,
        Commands::LockStatus { name } => commands::lock::status(&client, &name, &mut out)?,
        Commands::Sweep => commands::lock::sweep(&client, &mut out)?,
        Commands::Config | Commands::Version => {}
    }

    Ok(())
}

/// Loads the config file bound to its own directory and applies flags.
fn load_config(cli: &Cli) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let deployment_dir = deployment_dir(&cli.config)?;
    let mut file = ConfigFile::load_or_init(&cli.config, &deployment_dir)?;
    file.apply_overrides(&ConfigOverrides {
        host: cli.host.clone(),
        port: cli.port,
        password: cli.password.clone(),
        select: cli.db,
        prefix: cli.prefix.clone(),
        ..ConfigOverrides::default()
    });
    Ok(file)
}

fn deployment_dir(config: &Path) -> io::Result<PathBuf> {
    let dir = match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    Ok(dir.canonicalize().unwrap_or(dir))
}
