use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'user',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS referral_links (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            code        TEXT NOT NULL UNIQUE,
            merchant    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_links_owner
            ON referral_links(owner_id);

        -- One inviter per user. The pair is looked up by invitee at
        -- conversion time to decide whether the bonus split applies.
        CREATE TABLE IF NOT EXISTS referral_windows (
            id           TEXT PRIMARY KEY,
            referrer_id  TEXT NOT NULL REFERENCES users(id),
            invitee_id   TEXT NOT NULL UNIQUE REFERENCES users(id),
            starts_at    TEXT NOT NULL,
            expires_at   TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- The split is computed once at conversion time and persisted with
        -- the commission, so later rate changes never rewrite history.
        CREATE TABLE IF NOT EXISTS commissions (
            id              TEXT PRIMARY KEY,
            earner_id       TEXT NOT NULL REFERENCES users(id),
            referrer_id     TEXT REFERENCES users(id),
            link_id         TEXT NOT NULL REFERENCES referral_links(id),
            gross_cents     INTEGER NOT NULL,
            earner_cents    INTEGER NOT NULL,
            referrer_cents  INTEGER NOT NULL,
            platform_cents  INTEGER NOT NULL,
            bonus_applied   INTEGER NOT NULL DEFAULT 0,
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_commissions_earner
            ON commissions(earner_id, status);

        CREATE TABLE IF NOT EXISTS payouts (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL REFERENCES users(id),
            amount_cents  INTEGER NOT NULL,
            status        TEXT NOT NULL DEFAULT 'requested',
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_payouts_user
            ON payouts(user_id, status);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
