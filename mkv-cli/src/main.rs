//! # mkv
//!
//! Command-line front end for the connection manager: load a server
//! configuration, pick a named connection and send one command to it.
//!
//! ```text
//! mkv --config servers.toml exec PING
//! mkv --config servers.toml --connection cache exec HGET user:1 name
//! mkv --config servers.toml connections
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mkv_manager::{CommandDispatcher, ManagerConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod output;

#[derive(Debug, Parser)]
#[command(name = "mkv")]
#[command(about = "Run commands against named key-value store connections", long_about = None)]
struct Cli {
    /// Server configuration file (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Connection to use; empty or omitted selects `default`
    #[arg(short = 'n', long)]
    connection: Option<String>,

    /// Connect timeout in seconds, overriding the configuration
    #[arg(long)]
    timeout: Option<f64>,

    /// Print replies as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send one command to the selected connection
    Exec {
        /// Command name, e.g. GET or HSET
        name: String,
        /// Positional arguments
        args: Vec<String>,
    },
    /// List the configured connections without connecting
    Connections,
}

fn main() {
    // Initialize logging with environment filter (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mkv=info,mkv_manager=info,mkv_client=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ManagerConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(secs) = cli.timeout {
        config.timeout = match Duration::try_from_secs_f64(secs) {
            Ok(timeout) => timeout,
            Err(_) => bail!("--timeout must be a non-negative number of seconds"),
        };
    }

    match cli.command {
        Commands::Connections => {
            for spec in &config.servers {
                println!("{}", output::describe_server(spec));
            }
            Ok(())
        }
        Commands::Exec { name, args } => {
            let mut redis = CommandDispatcher::from_config(&config)?;
            redis.select(cli.connection.as_deref())?;
            debug!(
                connection = redis.registry().current_name(),
                command = %name,
                "running command"
            );

            let args: Vec<Vec<u8>> = args.into_iter().map(String::into_bytes).collect();
            let reply = redis.execute(&name, &args)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output::to_json(&reply))?);
            } else {
                println!("{}", output::render(&reply));
            }
            Ok(())
        }
    }
}
