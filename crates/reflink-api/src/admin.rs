use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use reflink_core::{CommissionStatus, PayoutStatus};
use reflink_types::api::{Claims, CommissionResponse, PayoutResponse};

use crate::auth::AppState;
use crate::commissions::commission_response;
use crate::payouts::payout_response;

/// Validate and apply a commission status change. The transition is checked
/// against the stored status first, and the write is guarded on that same
/// status, so a concurrent admin action loses cleanly with a 409.
async fn transition_commission(
    state: AppState,
    id: Uuid,
    to: CommissionStatus,
) -> Result<CommissionResponse, StatusCode> {
    let db = state.clone();

    let row = tokio::task::spawn_blocking(move || {
        let id = id.to_string();
        let row = db
            .db
            .get_commission(&id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let from = CommissionStatus::parse(&row.status)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        from.transition(to).map_err(|_| StatusCode::CONFLICT)?;

        let updated = db
            .db
            .set_commission_status(&id, from.as_str(), to.as_str())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if !updated {
            return Err(StatusCode::CONFLICT);
        }

        db.db
            .get_commission(&id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    Ok(commission_response(row))
}

pub async fn approve_commission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let res = transition_commission(state, id, CommissionStatus::Approved).await?;
    Ok(Json(res))
}

pub async fn void_commission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let res = transition_commission(state, id, CommissionStatus::Voided).await?;
    Ok(Json(res))
}

pub async fn list_all_payouts(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();

    let rows = tokio::task::spawn_blocking(move || db.db.get_all_payouts())
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let payouts: Vec<PayoutResponse> = rows.into_iter().map(payout_response).collect();
    Ok(Json(payouts))
}

async fn transition_payout(
    state: AppState,
    id: Uuid,
    to: PayoutStatus,
) -> Result<PayoutResponse, StatusCode> {
    let db = state.clone();

    let row = tokio::task::spawn_blocking(move || {
        let id = id.to_string();
        let row = db
            .db
            .get_payout(&id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let from = PayoutStatus::parse(&row.status)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        from.transition(to).map_err(|_| StatusCode::CONFLICT)?;

        let applied = match to {
            // Settlement also flips the covered commissions, atomically.
            PayoutStatus::Paid => db.db.mark_payout_paid(&id),
            _ => db.db.set_payout_status(&id, from.as_str(), to.as_str()),
        }
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if !applied {
            return Err(StatusCode::CONFLICT);
        }

        db.db
            .get_payout(&id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    Ok(payout_response(row))
}

pub async fn approve_payout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let res = transition_payout(state, id, PayoutStatus::Approved).await?;
    Ok(Json(res))
}

pub async fn reject_payout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let res = transition_payout(state, id, PayoutStatus::Rejected).await?;
    Ok(Json(res))
}

pub async fn pay_payout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let res = transition_payout(state, id, PayoutStatus::Paid).await?;
    Ok(Json(res))
}
