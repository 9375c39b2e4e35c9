//! HTTP client to the ledger service
//!
//! The kiosk never talks to the store directly; everything goes over the
//! HTTP API through the `BookingApi` trait. Every request carries a bounded
//! timeout so a dead server can never stall the card polling loop for long.
//! Connectivity failures map to `ServiceUnavailable`, an unknown card to
//! `AuthenticationFailed` -- the terminal tells them apart to pick the right
//! transient notice.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::api::dto::{BookRequest, BookResponse, CardCheckResponse, ErrorBody};
use crate::types::{KasseError, MemberId, MemberSnapshot};

/// Bound on every outbound request from the terminal.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// The slice of the ledger service a kiosk needs
pub trait BookingApi {
    /// Resolve a normalized card UID to a member snapshot.
    fn check_card(
        &self,
        uid: &str,
    ) -> impl std::future::Future<Output = Result<MemberSnapshot, KasseError>> + Send;

    /// Book a purchase; returns the balance after booking.
    fn book(
        &self,
        member_id: MemberId,
        product: &str,
        price: Decimal,
    ) -> impl std::future::Future<Output = Result<Decimal, KasseError>> + Send;
}

/// reqwest-backed implementation against the axum service
pub struct HttpBookingApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBookingApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, KasseError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| KasseError::service_unavailable(e.to_string()))?;
        let base_url: String = base_url.into();
        Ok(HttpBookingApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl BookingApi for HttpBookingApi {
    async fn check_card(&self, uid: &str) -> Result<MemberSnapshot, KasseError> {
        let url = format!("{}/api/check_card/{uid}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| KasseError::service_unavailable(e.to_string()))?;
        let body: CardCheckResponse = response
            .json()
            .await
            .map_err(|e| KasseError::service_unavailable(e.to_string()))?;

        match body {
            CardCheckResponse::Ok {
                member_id,
                name,
                balance,
            } => Ok(MemberSnapshot {
                id: member_id,
                name,
                balance,
            }),
            CardCheckResponse::Unknown { uid } => Err(KasseError::authentication_failed(&uid)),
        }
    }

    async fn book(
        &self,
        member_id: MemberId,
        product: &str,
        price: Decimal,
    ) -> Result<Decimal, KasseError> {
        let url = format!("{}/api/book", self.base_url);
        let request = BookRequest {
            member_id,
            product: product.to_string(),
            price,
        };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| KasseError::service_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(e) => e.to_string(),
            };
            return Err(KasseError::service_unavailable(message));
        }

        let body: BookResponse = response
            .json()
            .await
            .map_err(|e| KasseError::service_unavailable(e.to_string()))?;
        Ok(body.new_balance)
    }
}
