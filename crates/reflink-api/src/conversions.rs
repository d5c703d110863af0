use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use reflink_core::{CommissionStatus, split_commission, window_active};
use reflink_db::Database;
use reflink_db::models::CommissionRow;
use reflink_types::api::{Claims, CommissionResponse, RecordConversionRequest};

use crate::auth::AppState;
use crate::commissions::commission_response;
use crate::time::parse_db_timestamp;

/// Record a tracked conversion: resolve the link code, decide whether the
/// link owner's referral window is active right now, split the gross amount
/// and persist the pending commission.
pub async fn record_conversion(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<RecordConversionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Non-positive amounts are rejected at the boundary; the split itself
    // would clamp them, but a zero commission row is never worth storing.
    if req.gross_cents <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.clone();
    let code = req.code.clone();
    let gross_cents = req.gross_cents;

    let row = tokio::task::spawn_blocking(move || {
        let link = db
            .db
            .get_link_by_code(&code)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let referrer = active_referrer(&db.db, &link.owner_id);
        let split = split_commission(gross_cents, referrer.is_some());

        let row = CommissionRow {
            id: Uuid::new_v4().to_string(),
            earner_id: link.owner_id,
            referrer_id: referrer,
            link_id: link.id,
            gross_cents,
            earner_cents: split.earner_cents,
            referrer_cents: split.referrer_cents,
            platform_cents: split.platform_cents,
            bonus_applied: split.bonus_applied,
            status: CommissionStatus::Pending.as_str().to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        db.db
            .insert_commission(&row)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>(row)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })??;

    let res: CommissionResponse = commission_response(row);
    Ok((StatusCode::CREATED, Json(res)))
}

/// The earner's referrer, if a referral window is open at this instant.
/// A failed lookup is treated as no active window — the conservative
/// default: the bonus is withheld, never granted by accident.
fn active_referrer(db: &Database, earner_id: &str) -> Option<String> {
    let window = match db.get_window_for_invitee(earner_id) {
        Ok(w) => w?,
        Err(e) => {
            warn!("Referral window lookup failed for {}: {}", earner_id, e);
            return None;
        }
    };

    let starts_at = parse_db_timestamp(&window.starts_at, "referral window");
    let expires_at = parse_db_timestamp(&window.expires_at, "referral window");

    if window_active(starts_at, expires_at, Utc::now()) {
        Some(window.referrer_id)
    } else {
        None
    }
}
