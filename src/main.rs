//! Kaffeekasse CLI
//!
//! # Usage
//!
//! ```bash
//! kaffeekasse init --db kaffee.db
//! kaffeekasse serve --db kaffee.db --listen 0.0.0.0:5000
//! kaffeekasse kiosk --server http://localhost:5000
//! ```
//!
//! `init` provisions the database and the administrator member. `serve`
//! runs the ledger service with its HTTP API. `kiosk` runs one terminal
//! against a running service.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (database not accessible, address in use, etc.)

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use kaffeekasse::api::{self, AppState};
use kaffeekasse::cli::{self, CliArgs, Command};
use kaffeekasse::core::{BookingService, ForecastEngine};
use kaffeekasse::kiosk::{HttpBookingApi, KioskConfig, LineReader, Terminal};
use kaffeekasse::store::LedgerStore;
use kaffeekasse::types::KasseError;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(cli::parse_args()).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<(), KasseError> {
    match args.command {
        Command::Init {
            db,
            admin_credential,
        } => init(db, admin_credential),
        Command::Serve {
            db,
            listen,
            grams_per_cup,
        } => serve(db, listen, grams_per_cup).await,
        Command::Kiosk {
            server,
            poll_interval_ms,
        } => kiosk(server, poll_interval_ms).await,
    }
}

fn init(db: PathBuf, admin_credential: Option<String>) -> Result<(), KasseError> {
    let store = LedgerStore::open(&db)?;
    match store.create_member("Administrator", admin_credential.as_deref(), Some("000000"), true) {
        Ok(member) => info!(member_id = member.id, "administrator created"),
        Err(KasseError::DuplicateName { .. }) => info!("administrator already exists"),
        Err(e) => return Err(e),
    }
    info!(db = %db.display(), "database ready");
    Ok(())
}

async fn serve(db: PathBuf, listen: String, grams_per_cup: u32) -> Result<(), KasseError> {
    let store = Arc::new(LedgerStore::open(&db)?);
    let state = Arc::new(AppState {
        booking: Arc::new(BookingService::new(Arc::clone(&store))),
        forecast: Arc::new(ForecastEngine::new(Arc::clone(&store), grams_per_cup)),
        store,
    });
    api::serve(state, &listen).await
}

async fn kiosk(server: String, poll_interval_ms: u64) -> Result<(), KasseError> {
    let api = HttpBookingApi::new(server)?;
    let reader = LineReader::spawn();
    let terminal = Terminal::new(
        reader,
        api,
        KioskConfig::default(),
        Duration::from_millis(poll_interval_ms),
    );
    terminal.run().await
}
