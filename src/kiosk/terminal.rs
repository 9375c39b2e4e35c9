//! Kiosk terminal control loop
//!
//! Owns the session machine and wires it to the card reader and the ledger
//! client. The loop ticks on a fixed interval: fire due timers, poll the
//! reader, dispatch lookups and bookings. Outbound calls are bounded by the
//! client's request timeout, so a dead ledger service slows one tick, never
//! the terminal. No failure here is fatal; every error path ends with the
//! machine back at idle and a transient notice on the display.
//!
//! The product buttons of the touch UI are out of scope; in this terminal
//! a line of input selects from the fixed menu while a session is open
//! ("1"/"2" to book, "q" to cancel) and is treated as a card UID otherwise.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::client::BookingApi;
use super::reader::{CardReader, ReadError};
use super::session::{CardOutcome, KioskConfig, SessionMachine};
use crate::types::KasseError;

/// One kiosk terminal
pub struct Terminal<R: CardReader, A: BookingApi> {
    machine: SessionMachine,
    reader: R,
    api: A,
    poll_interval: Duration,
}

fn menu(choice: &str) -> Option<(&'static str, Decimal)> {
    match choice {
        "1" => Some(("Kaffee Schwarz", Decimal::new(40, 2))),
        "2" => Some(("Kaffee Decaf", Decimal::new(40, 2))),
        _ => None,
    }
}

impl<R: CardReader, A: BookingApi> Terminal<R, A> {
    pub fn new(reader: R, api: A, cfg: KioskConfig, poll_interval: Duration) -> Self {
        Terminal {
            machine: SessionMachine::new(cfg),
            reader,
            api,
            poll_interval,
        }
    }

    /// Run the terminal until the process ends.
    pub async fn run(mut self) -> Result<(), KasseError> {
        self.show_idle();
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            self.tick(Instant::now()).await;
        }
    }

    /// One iteration of the control loop (separated for testing).
    async fn tick(&mut self, now: Instant) {
        if self.machine.poll(now) {
            self.show_idle();
        }

        match self.reader.read_uid() {
            Ok(input) => self.handle_input(input.as_str(), now).await,
            Err(ReadError::NoCard) => {}
            Err(ReadError::Transport(message)) => {
                // Reader glitches are routine; retry on the next tick.
                debug!(%message, "card reader transport error");
            }
        }
    }

    async fn handle_input(&mut self, input: &str, now: Instant) {
        if self.machine.is_authenticated() {
            self.handle_selection(input.trim(), now).await;
            return;
        }
        match self.machine.on_card(input, now) {
            CardOutcome::Lookup(uid) => self.authenticate(&uid, now).await,
            CardOutcome::Ignored => {}
        }
    }

    async fn authenticate(&mut self, uid: &str, now: Instant) {
        match self.api.check_card(uid).await {
            Ok(member) => {
                println!("Hallo {} — Saldo: {} €", member.name, member.balance);
                println!("[1] Kaffee Schwarz (0.40 €)  [2] Kaffee Decaf (0.40 €)  [q] Abbrechen");
                self.machine.lookup_succeeded(member, now);
            }
            Err(KasseError::AuthenticationFailed { card_uid }) => {
                println!("Karte unbekannt! UID: {card_uid}");
            }
            Err(error) => {
                warn!(%error, "card lookup failed");
                println!("Server Fehler!");
            }
        }
    }

    async fn handle_selection(&mut self, input: &str, now: Instant) {
        if matches!(input, "q" | "c") {
            self.machine.cancel();
            self.show_idle();
            return;
        }
        let Some((product, price)) = menu(input) else {
            return;
        };
        let Some(ticket) = self.machine.select_product(product, price) else {
            return;
        };

        match self
            .api
            .book(ticket.member_id, &ticket.product, ticket.price)
            .await
        {
            Ok(new_balance) => {
                println!("✅ {} — Rest: {} €", ticket.product, new_balance);
                self.machine.booking_succeeded(new_balance, now);
            }
            Err(error) => {
                warn!(%error, "booking failed");
                println!("Buchungsfehler!");
                self.machine.booking_failed(now);
            }
        }
    }

    fn show_idle(&self) {
        println!("Bitte Chip vorhalten...");
    }
}
