use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use reflink_core::split_commission;
use reflink_db::models::CommissionRow;
use reflink_types::api::{Claims, CommissionResponse};

use crate::auth::AppState;
use crate::time::{parse_db_timestamp, parse_db_uuid};

pub(crate) fn commission_response(row: CommissionRow) -> CommissionResponse {
    CommissionResponse {
        id: parse_db_uuid(&row.id, "commission"),
        earner_id: parse_db_uuid(&row.earner_id, "commission"),
        referrer_id: row.referrer_id.as_deref().map(|r| parse_db_uuid(r, "commission")),
        gross_cents: row.gross_cents,
        earner_cents: row.earner_cents,
        referrer_cents: row.referrer_cents,
        platform_cents: row.platform_cents,
        bonus_applied: row.bonus_applied,
        status: row.status,
        created_at: parse_db_timestamp(&row.created_at, "commission"),
    }
}

pub async fn list_commissions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let earner_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.get_commissions_by_earner(&earner_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let commissions: Vec<CommissionResponse> = rows.into_iter().map(commission_response).collect();

    Ok(Json(commissions))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub gross_cents: i64,
    #[serde(default)]
    pub referral_active: bool,
}

/// Diagnostic endpoint: run the split calculator without touching the
/// database. Used by admin tooling to sanity-check amounts.
pub async fn preview_split(
    Extension(_claims): Extension<Claims>,
    Query(query): Query<PreviewQuery>,
) -> impl IntoResponse {
    Json(split_commission(query.gross_cents, query.referral_active))
}
