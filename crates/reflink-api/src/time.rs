use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// Parse a stored timestamp. SQLite's `datetime('now')` default writes
/// "YYYY-MM-DD HH:MM:SS" without a timezone; values written by the API are
/// RFC 3339. Accept both, treating the naive form as UTC.
pub(crate) fn parse_db_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

/// Parse a stored uuid, logging and falling back to nil on corruption.
pub(crate) fn parse_db_uuid(raw: &str, context: &str) -> uuid::Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}' on {}: {}", raw, context, e);
        uuid::Uuid::default()
    })
}
