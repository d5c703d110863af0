/// Database row types — these map directly to SQLite rows.
/// Distinct from reflink-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct LinkRow {
    pub id: String,
    pub owner_id: String,
    pub code: String,
    pub merchant: String,
    pub created_at: String,
}

pub struct WindowRow {
    pub id: String,
    pub referrer_id: String,
    pub invitee_id: String,
    pub starts_at: String,
    pub expires_at: String,
}

pub struct CommissionRow {
    pub id: String,
    pub earner_id: String,
    pub referrer_id: Option<String>,
    pub link_id: String,
    pub gross_cents: i64,
    pub earner_cents: i64,
    pub referrer_cents: i64,
    pub platform_cents: i64,
    pub bonus_applied: bool,
    pub status: String,
    pub created_at: String,
}

pub struct PayoutRow {
    pub id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: String,
}
