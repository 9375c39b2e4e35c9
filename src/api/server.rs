//! HTTP service boundary
//!
//! Exposes the two kiosk endpoints (`check_card`, `book`) and the
//! administrative surface consumed by the web UI. Authentication for the
//! admin routes is delegated to the session layer in front of this service;
//! handlers run with an administrator actor, and the booking service still
//! enforces privilege so nothing below this layer trusts the transport.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info};

use crate::api::dto::{
    BeanDeliveryRequest, BookRequest, BookResponse, BookingOutcome, CardCheckResponse,
    CreateMemberRequest, DepositRequest, EditMemberRequest, ErrorBody, HistoryQuery, MemberView,
    ReimburseRequest,
};
use crate::core::{Actor, BookingService, ForecastEngine};
use crate::store::LedgerStore;
use crate::types::{normalize_card_uid, KasseError, MemberId};

/// History responses are capped regardless of what the client asks for.
const MAX_HISTORY_LIMIT: u32 = 50;

/// Shared state for axum handlers.
pub struct AppState {
    pub booking: Arc<BookingService>,
    pub forecast: Arc<ForecastEngine>,
    pub store: Arc<LedgerStore>,
}

/// Start the HTTP service on the given address.
pub async fn serve(state: Arc<AppState>, listen: &str) -> Result<(), KasseError> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listen, "ledger API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/check_card/:uid", get(check_card))
        .route("/api/book", post(book))
        .route("/api/admin/members", get(list_members).post(create_member))
        .route(
            "/api/admin/members/:id",
            put(edit_member).delete(delete_member),
        )
        .route("/api/admin/deposit", post(deposit))
        .route("/api/admin/beans", get(list_deliveries).post(record_delivery))
        .route("/api/admin/reimburse", post(reimburse))
        .route("/api/history", get(history))
        .route("/api/stats", get(stats))
        .route("/api/finances", get(finances))
        .with_state(state)
}

/// KasseError wrapper carrying the HTTP mapping.
pub struct ApiError(KasseError);

impl From<KasseError> for ApiError {
    fn from(error: KasseError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            KasseError::UnknownMember { .. } => StatusCode::NOT_FOUND,
            KasseError::DuplicateName { .. } | KasseError::DuplicateCard { .. } => {
                StatusCode::CONFLICT
            }
            KasseError::InvalidAmount { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            KasseError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            status: "error".to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Kiosk endpoints
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn check_card(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<CardCheckResponse>, ApiError> {
    let normalized = normalize_card_uid(&uid);
    let response = match state.store.find_by_card(&normalized)? {
        Some(member) => CardCheckResponse::Ok {
            member_id: member.id,
            name: member.name,
            balance: member.balance,
        },
        None => CardCheckResponse::Unknown { uid: normalized },
    };
    Ok(Json(response))
}

async fn book(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let (_, new_balance) =
        state
            .booking
            .purchase(request.member_id, &request.product, request.price)?;
    Ok(Json(BookResponse::success(new_balance)))
}

// ============================================================================
// Admin surface
// ============================================================================

async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    let members = state
        .store
        .list_members()?
        .into_iter()
        .map(MemberView::from)
        .collect();
    Ok(Json(members))
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<MemberView>), ApiError> {
    let member = state.booking.create_member(
        &Actor::administrator(),
        &request.name,
        request.credential_hash.as_deref(),
        request.card_uid.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(MemberView::from(member))))
}

async fn edit_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<MemberId>,
    Json(request): Json<EditMemberRequest>,
) -> Result<Json<MemberView>, ApiError> {
    let member = state.booking.edit_member(
        &Actor::administrator(),
        member_id,
        &request.name,
        request.card_uid.as_deref(),
        request.balance,
    )?;
    Ok(Json(MemberView::from(member)))
}

async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<MemberId>,
) -> Result<StatusCode, ApiError> {
    state
        .booking
        .delete_member(&Actor::administrator(), member_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<BookingOutcome>, ApiError> {
    let (entry_id, new_balance) =
        state
            .booking
            .deposit(&Actor::administrator(), request.member_id, request.amount)?;
    Ok(Json(BookingOutcome {
        entry_id,
        new_balance,
    }))
}

async fn record_delivery(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BeanDeliveryRequest>,
) -> Result<Json<BookingOutcome>, ApiError> {
    let (entry_id, new_balance) = state.booking.record_bean_delivery(
        &Actor::administrator(),
        request.member_id,
        request.grams,
        request.unit_price,
        &request.variety,
    )?;
    Ok(Json(BookingOutcome {
        entry_id,
        new_balance,
    }))
}

async fn list_deliveries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<crate::types::BeanDelivery>>, ApiError> {
    Ok(Json(state.store.recent_deliveries(MAX_HISTORY_LIMIT)?))
}

async fn reimburse(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReimburseRequest>,
) -> Result<Json<BookingOutcome>, ApiError> {
    let (entry_id, new_balance) = state.booking.reimburse(
        &Actor::administrator(),
        request.member_id,
        request.amount,
        &request.category,
    )?;
    Ok(Json(BookingOutcome {
        entry_id,
        new_balance,
    }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<crate::types::HistoryEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(MAX_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    Ok(Json(state.store.history(query.member_id, limit)?))
}

async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<crate::core::ForecastStats>, ApiError> {
    Ok(Json(state.forecast.stats(Utc::now())?))
}

async fn finances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<crate::core::FinancialHealth>, ApiError> {
    Ok(Json(state.forecast.financial_health()?))
}
