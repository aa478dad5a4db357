//! DVS CLI - Command-line tool for DVSPortal guest parking
//!
//! Check the guest-parking balance, manage reservations and stored plates,
//! or run a poll loop that prints every refresh.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dvs_client::DvsPortal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "dvs")]
#[command(author, version, about = "DVSPortal guest-parking CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Portal API host, e.g. parkeren.gemeente.nl
    #[arg(long, env = "DVS_HOST")]
    host: Option<String>,

    /// Account identifier (report code)
    #[arg(long, env = "DVS_IDENTIFIER")]
    identifier: Option<String>,

    /// Account password
    #[arg(long, env = "DVS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "DVS_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh once and show balance, reservations and known plates
    Status,

    /// Poll the portal and print every refresh until interrupted
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value = "120")]
        interval: u64,
    },

    /// Create a guest-parking reservation
    Reserve {
        /// License plate to reserve for
        plate: String,

        /// Display name to attach to the plate
        #[arg(long)]
        name: Option<String>,

        /// Start time, YYYY-MM-DDTHH:MM:SS; defaults to now
        #[arg(long)]
        from: Option<String>,

        /// End time, YYYY-MM-DDTHH:MM:SS; open-ended when omitted
        #[arg(long)]
        until: Option<String>,
    },

    /// End an active reservation by reservation id or plate
    End {
        /// Reservation id, or a plate with an active reservation
        reservation: String,
    },

    /// Known license plates
    Plates {
        #[command(subcommand)]
        command: Option<PlatesCommand>,
    },
}

#[derive(Subcommand)]
enum PlatesCommand {
    /// List known plates
    List,

    /// Store or rename a plate on the permit
    Store {
        /// License plate value
        plate: String,

        /// Display name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(
        cli.host.as_deref(),
        cli.identifier.as_deref(),
        cli.password.as_deref(),
    )?;

    // Create output context
    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);

    let portal = DvsPortal::new(&merged.host, &merged.identifier, &merged.password)?;

    // Execute command
    match &cli.command {
        Commands::Status => {
            commands::status(&portal, &ctx).await?;
        }

        Commands::Watch { interval } => {
            commands::watch(portal, Duration::from_secs(*interval), &ctx).await?;
        }

        Commands::Reserve {
            plate,
            name,
            from,
            until,
        } => {
            commands::reserve(
                &portal,
                plate,
                name.as_deref(),
                from.as_deref(),
                until.as_deref(),
                &ctx,
            )
            .await?;
        }

        Commands::End { reservation } => {
            commands::end(&portal, reservation, &ctx).await?;
        }

        Commands::Plates { command } => match command {
            Some(PlatesCommand::Store { plate, name }) => {
                commands::store_plate(&portal, plate, name, &ctx).await?;
            }
            Some(PlatesCommand::List) | None => {
                commands::plates(&portal, &ctx).await?;
            }
        },
    }

    Ok(())
}
