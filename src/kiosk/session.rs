//! Kiosk session state machine
//!
//! One physical terminal owns one `SessionMachine` value and drives it from
//! its polling loop. The machine is deliberately free of I/O: card reads,
//! lookups, bookings and the passage of time arrive as explicit calls with
//! explicit `Instant`s, which makes every transition deterministic under
//! test.
//!
//! States: Idle -> Authenticated -> Idle. A cooldown window time-gates card
//! reads after any authentication attempt so a card held against the reader
//! does not retrigger; it never blocks the authenticated UI. Timers are
//! epoch-guarded handles: arming bumps the epoch, a fired timer with a stale
//! epoch is a no-op, so a cancelled timeout can never cause a double
//! transition.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::types::{normalize_card_uid, MemberId, MemberSnapshot};

/// Timing configuration of one terminal
#[derive(Debug, Clone)]
pub struct KioskConfig {
    /// Window during which repeated card reads are ignored
    pub cooldown: Duration,

    /// How long an untouched authenticated session stays open
    pub auth_timeout: Duration,

    /// How long the confirmation (or failure) screen shows before
    /// returning to idle
    pub confirm_delay: Duration,
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            cooldown: Duration::from_secs(2),
            auth_timeout: Duration::from_secs(20),
            confirm_delay: Duration::from_secs(2),
        }
    }
}

/// What the terminal should do with a card read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    /// Probe the ledger for this normalized UID
    Lookup(String),

    /// Swallowed: cooldown active or a session is already open
    Ignored,
}

/// A purchase the terminal may dispatch to the booking service
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseTicket {
    pub member_id: MemberId,
    pub product: String,
    pub price: Decimal,
}

#[derive(Debug)]
enum State {
    Idle,
    Authenticated {
        member: MemberSnapshot,
        /// Re-entrancy guard: once a purchase is dispatched, no second
        /// selection is accepted until the machine returns to idle.
        purchase_in_flight: bool,
    },
}

/// The per-terminal session state machine
pub struct SessionMachine {
    cfg: KioskConfig,
    state: State,
    cooldown_until: Option<Instant>,
    timer: Option<(Instant, u64)>,
    epoch: u64,
}

impl SessionMachine {
    pub fn new(cfg: KioskConfig) -> Self {
        SessionMachine {
            cfg,
            state: State::Idle,
            cooldown_until: None,
            timer: None,
            epoch: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, State::Authenticated { .. })
    }

    /// The authenticated member, if any.
    pub fn member(&self) -> Option<&MemberSnapshot> {
        match &self.state {
            State::Authenticated { member, .. } => Some(member),
            State::Idle => None,
        }
    }

    /// Feed a raw card read into the machine.
    ///
    /// Opens the cooldown window on every accepted read, before the lookup
    /// outcome is known, so a held card triggers exactly once per window.
    pub fn on_card(&mut self, raw_uid: &str, now: Instant) -> CardOutcome {
        if self.is_authenticated() {
            return CardOutcome::Ignored;
        }
        if let Some(until) = self.cooldown_until {
            if now < until {
                return CardOutcome::Ignored;
            }
        }
        self.cooldown_until = Some(now + self.cfg.cooldown);
        CardOutcome::Lookup(normalize_card_uid(raw_uid))
    }

    /// A card lookup came back positive: open the session and arm the
    /// authentication timeout. Ignored unless the machine is idle.
    pub fn lookup_succeeded(&mut self, member: MemberSnapshot, now: Instant) {
        if !self.is_idle() {
            return;
        }
        self.state = State::Authenticated {
            member,
            purchase_in_flight: false,
        };
        self.arm(self.cfg.auth_timeout, now);
    }

    /// Ask to dispatch a purchase for the authenticated member.
    ///
    /// Returns `None` when no session is open or a purchase is already in
    /// flight. Accepting a selection disarms the authentication timeout;
    /// the terminal must follow up with `booking_succeeded` or
    /// `booking_failed`.
    pub fn select_product(&mut self, product: &str, price: Decimal) -> Option<PurchaseTicket> {
        let member_id = match &mut self.state {
            State::Authenticated {
                member,
                purchase_in_flight,
            } if !*purchase_in_flight => {
                *purchase_in_flight = true;
                member.id
            }
            _ => return None,
        };
        self.timer = None;
        Some(PurchaseTicket {
            member_id,
            product: product.to_string(),
            price,
        })
    }

    /// The dispatched purchase was booked: show the confirmation and arm
    /// the short auto-return timer.
    pub fn booking_succeeded(&mut self, new_balance: Decimal, now: Instant) {
        if let State::Authenticated { member, .. } = &mut self.state {
            member.balance = new_balance;
        }
        self.arm(self.cfg.confirm_delay, now);
    }

    /// The dispatched purchase failed (service unreachable, rejected):
    /// nothing was recorded; return to idle after the notice delay.
    pub fn booking_failed(&mut self, now: Instant) {
        self.arm(self.cfg.confirm_delay, now);
    }

    /// Explicit cancel: back to idle immediately, pending timer disarmed.
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Timer callback. Returns whether a transition to idle happened;
    /// stale epochs (cancelled or superseded timers) are no-ops.
    pub fn on_timer(&mut self, epoch: u64) -> bool {
        match self.timer {
            Some((_, armed)) if armed == epoch => {
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Fire a due timer from the polling loop. Returns whether the machine
    /// returned to idle on this tick.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.timer {
            Some((deadline, epoch)) if now >= deadline => self.on_timer(epoch),
            _ => false,
        }
    }

    fn arm(&mut self, after: Duration, now: Instant) {
        self.epoch += 1;
        self.timer = Some((now + after, self.epoch));
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.timer = None;
    }
}
