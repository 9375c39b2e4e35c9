use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::DEFAULT_GRAMS_PER_CUP;

/// Shared coffee fund: ledger service, forecasting, kiosk terminal
#[derive(Parser, Debug)]
#[command(name = "kaffeekasse")]
#[command(
    about = "Shared coffee fund: ledger service, forecasting, kiosk terminal",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the database and create the administrator member
    Init {
        /// Path of the SQLite database file
        #[arg(long, value_name = "FILE", default_value = "kaffee.db")]
        db: PathBuf,

        /// Opaque credential hash for the administrator (hashing happens upstream)
        #[arg(long, value_name = "HASH")]
        admin_credential: Option<String>,
    },

    /// Run the ledger service and HTTP API
    Serve {
        /// Path of the SQLite database file
        #[arg(long, value_name = "FILE", default_value = "kaffee.db")]
        db: PathBuf,

        /// Address to bind the HTTP API on
        #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:5000")]
        listen: String,

        /// Grams of beans one cup consumes (forecasting constant)
        #[arg(long, value_name = "GRAMS", default_value_t = DEFAULT_GRAMS_PER_CUP)]
        grams_per_cup: u32,
    },

    /// Run a kiosk terminal against a ledger service
    Kiosk {
        /// Base URL of the ledger service
        #[arg(long, value_name = "URL", default_value = "http://localhost:5000")]
        server: String,

        /// Card polling interval in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 100)]
        poll_interval_ms: u64,
    },
}

/// Parse command-line arguments
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
