use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// The role carried in the token is the only authorization source. Handlers
/// never consult anything else to decide admin access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// JWT claims shared by the REST middleware and token issuance. Canonical
/// definition lives here in reflink-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Link code of the inviter; opens a referral window when present.
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Links --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLinkRequest {
    pub merchant: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub code: String,
    pub merchant: String,
    pub created_at: DateTime<Utc>,
}

// -- Conversions / commissions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordConversionRequest {
    pub code: String,
    pub gross_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub id: Uuid,
    pub earner_id: Uuid,
    pub referrer_id: Option<Uuid>,
    pub gross_cents: i64,
    pub earner_cents: i64,
    pub referrer_cents: i64,
    pub platform_cents: i64,
    pub bonus_applied: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// -- Payouts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestPayoutRequest {
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub available_cents: i64,
}
