use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::error;
use uuid::Uuid;

use reflink_types::api::{Claims, CreateLinkRequest, LinkResponse};

use crate::auth::AppState;
use crate::time::{parse_db_timestamp, parse_db_uuid};

/// 6 random bytes -> 8 url-safe characters. Collisions surface as a UNIQUE
/// violation on insert, which `create_link` reports distinctly so the
/// handler can retry with a fresh code.
fn generate_code() -> String {
    let bytes: [u8; 6] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn create_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.merchant.is_empty() || req.merchant.len() > 64 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let link_id = Uuid::new_v4();
    let owner_id = claims.sub.to_string();
    let created_at = chrono::Utc::now();

    let db = state.clone();
    let merchant = req.merchant.clone();
    let ts = created_at.to_rfc3339();
    let code = tokio::task::spawn_blocking(move || {
        // One retry with a fresh code if the first one collides; any other
        // failure propagates immediately.
        for _ in 0..2 {
            let code = generate_code();
            if db.db.create_link(&link_id.to_string(), &owner_id, &code, &merchant, &ts)? {
                return Ok(Some(code));
            }
        }
        Ok::<_, anyhow::Error>(None)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse {
            id: link_id,
            owner_id: claims.sub,
            code,
            merchant: req.merchant,
            created_at,
        }),
    ))
}

pub async fn list_links(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let owner_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.get_links_by_owner(&owner_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let links: Vec<LinkResponse> = rows
        .into_iter()
        .map(|row| LinkResponse {
            id: parse_db_uuid(&row.id, "link"),
            owner_id: claims.sub,
            code: row.code,
            merchant: row.merchant,
            created_at: parse_db_timestamp(&row.created_at, "link"),
        })
        .collect();

    Ok(Json(links))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_url_safe_and_short() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 8);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }
}
