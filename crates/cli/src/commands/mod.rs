//! Subcommand implementations.

pub mod migrate;
pub mod ticket;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] quickbites_canteen::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Ledger(#[from] quickbites_canteen::services::LedgerError),

    #[error("Ticket error: {0}")]
    Ticket(#[from] quickbites_canteen::ticket::TicketError),

    #[error("Invalid token: {0}")]
    Token(#[from] quickbites_core::TokenError),

    #[error("Invalid order id: {0}")]
    OrderId(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
