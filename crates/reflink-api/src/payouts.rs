use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use reflink_core::PayoutStatus;
use reflink_db::models::PayoutRow;
use reflink_types::api::{BalanceResponse, Claims, PayoutResponse, RequestPayoutRequest};

use crate::auth::AppState;
use crate::time::{parse_db_timestamp, parse_db_uuid};

pub(crate) fn payout_response(row: PayoutRow) -> PayoutResponse {
    PayoutResponse {
        id: parse_db_uuid(&row.id, "payout"),
        user_id: parse_db_uuid(&row.user_id, "payout"),
        amount_cents: row.amount_cents,
        status: row.status,
        created_at: parse_db_timestamp(&row.created_at, "payout"),
    }
}

pub async fn request_payout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RequestPayoutRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.amount_cents <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let payout_id = Uuid::new_v4();
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let amount = req.amount_cents;
    let created_at = chrono::Utc::now();

    let ts = created_at.to_rfc3339();
    let covered = tokio::task::spawn_blocking(move || {
        db.db.insert_payout_if_covered(&payout_id.to_string(), &user_id, amount, &ts)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !covered {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    Ok((
        StatusCode::CREATED,
        Json(PayoutResponse {
            id: payout_id,
            user_id: claims.sub,
            amount_cents: req.amount_cents,
            status: PayoutStatus::Requested.as_str().to_string(),
            created_at,
        }),
    ))
}

pub async fn list_payouts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.get_payouts_by_user(&user_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let payouts: Vec<PayoutResponse> = rows.into_iter().map(payout_response).collect();

    Ok(Json(payouts))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let available_cents = tokio::task::spawn_blocking(move || db.db.available_balance_cents(&user_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(BalanceResponse {
        user_id: claims.sub,
        available_cents,
    }))
}
