//! QuickBites CLI - database migrations and ticket maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run canteen database migrations
//! qb-cli migrate
//!
//! # Re-render an order's ticket with the current TICKET_* settings
//! qb-cli ticket regenerate 0f6c3a52-8f7e-4c1e-9a51-2d4c1f0b9e77
//!
//! # Print the token inside a ticket image
//! qb-cli ticket decode ticket.png
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "qb-cli")]
#[command(author, version, about = "QuickBites CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run canteen database migrations
    Migrate,
    /// Ticket maintenance
    Ticket {
        #[command(subcommand)]
        action: TicketAction,
    },
}

#[derive(Subcommand)]
enum TicketAction {
    /// Re-render and store the ticket for an order
    Regenerate {
        /// Order ID (canonical UUID)
        order_id: String,
    },
    /// Print the token encoded in a ticket PNG
    Decode {
        /// Path to the PNG file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::canteen().await?,
        Commands::Ticket { action } => match action {
            TicketAction::Regenerate { order_id } => {
                commands::ticket::regenerate(&order_id).await?;
            }
            TicketAction::Decode { path } => commands::ticket::decode(&path)?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_ticket_decode() {
        let cli = Cli::try_parse_from(["qb-cli", "ticket", "decode", "t.png"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Ticket {
                action: TicketAction::Decode { .. }
            })
        ));
    }
}
