use crate::Database;
use crate::models::{CommissionRow, LinkRow, PayoutRow, UserRow, WindowRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, role),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Startup bootstrap: flip an existing account to admin. Returns false
    /// if no such user exists yet.
    pub fn promote_to_admin(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET role = 'admin' WHERE username = ?1",
                [username],
            )?;
            Ok(n == 1)
        })
    }

    // -- Referral links --

    /// Returns false when the generated code collides with an existing one,
    /// so the caller can retry with a fresh code. Every other failure is a
    /// real error.
    pub fn create_link(&self, id: &str, owner_id: &str, code: &str, merchant: &str, created_at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO referral_links (id, owner_id, code, merchant, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, owner_id, code, merchant, created_at),
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_code_collision(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_link_by_code(&self, code: &str) -> Result<Option<LinkRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, code, merchant, created_at FROM referral_links WHERE code = ?1",
            )?;
            stmt.query_row([code], map_link).optional()
        })
    }

    pub fn get_links_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, code, merchant, created_at
                 FROM referral_links WHERE owner_id = ?1
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([owner_id], map_link)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Referral windows --

    /// Opens the window for an invitee. A user has at most one inviter; a
    /// second insert for the same invitee is ignored. Returns true if the
    /// window was created.
    pub fn create_referral_window(
        &self,
        id: &str,
        referrer_id: &str,
        invitee_id: &str,
        starts_at: &str,
        expires_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO referral_windows (id, referrer_id, invitee_id, starts_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, referrer_id, invitee_id, starts_at, expires_at),
            )?;
            Ok(n == 1)
        })
    }

    pub fn get_window_for_invitee(&self, invitee_id: &str) -> Result<Option<WindowRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, referrer_id, invitee_id, starts_at, expires_at
                 FROM referral_windows WHERE invitee_id = ?1",
            )?;
            stmt.query_row([invitee_id], |row| {
                Ok(WindowRow {
                    id: row.get(0)?,
                    referrer_id: row.get(1)?,
                    invitee_id: row.get(2)?,
                    starts_at: row.get(3)?,
                    expires_at: row.get(4)?,
                })
            })
            .optional()
        })
    }

    // -- Commissions --

    pub fn insert_commission(&self, c: &CommissionRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO commissions
                   (id, earner_id, referrer_id, link_id, gross_cents,
                    earner_cents, referrer_cents, platform_cents, bonus_applied, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    c.id,
                    c.earner_id,
                    c.referrer_id,
                    c.link_id,
                    c.gross_cents,
                    c.earner_cents,
                    c.referrer_cents,
                    c.platform_cents,
                    c.bonus_applied,
                    c.status,
                    c.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_commission(&self, id: &str) -> Result<Option<CommissionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMISSION_SELECT} WHERE id = ?1"))?;
            stmt.query_row([id], map_commission).optional()
        })
    }

    pub fn get_commissions_by_earner(&self, earner_id: &str) -> Result<Vec<CommissionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMISSION_SELECT} WHERE earner_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([earner_id], map_commission)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Guarded status write: only applies when the stored status still
    /// matches what the caller validated the transition from.
    pub fn set_commission_status(&self, id: &str, from: &str, to: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE commissions SET status = ?1 WHERE id = ?2 AND status = ?3",
                (to, id, from),
            )?;
            Ok(n == 1)
        })
    }

    /// Ledger balance: approved or paid commission credits (earner and
    /// referrer side) minus every payout that is not rejected.
    pub fn available_balance_cents(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| balance_cents(conn, user_id))
    }

    // -- Payouts --

    pub fn insert_payout(&self, id: &str, user_id: &str, amount_cents: i64, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO payouts (id, user_id, amount_cents, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, amount_cents, created_at),
            )?;
            Ok(())
        })
    }

    /// Insert a payout request only if the user's available balance covers
    /// it. Check and insert run under one connection lock, so two racing
    /// requests cannot both spend the same approved cents. Returns false
    /// when the balance is insufficient.
    pub fn insert_payout_if_covered(
        &self,
        id: &str,
        user_id: &str,
        amount_cents: i64,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let balance = balance_cents(conn, user_id)?;
            if amount_cents > balance {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO payouts (id, user_id, amount_cents, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, amount_cents, created_at),
            )?;
            Ok(true)
        })
    }

    pub fn get_payout(&self, id: &str) -> Result<Option<PayoutRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PAYOUT_SELECT} WHERE id = ?1"))?;
            stmt.query_row([id], map_payout).optional()
        })
    }

    pub fn get_payouts_by_user(&self, user_id: &str) -> Result<Vec<PayoutRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PAYOUT_SELECT} WHERE user_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_payout)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_all_payouts(&self) -> Result<Vec<PayoutRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PAYOUT_SELECT} ORDER BY created_at DESC"))?;
            let rows = stmt
                .query_map([], map_payout)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_payout_status(&self, id: &str, from: &str, to: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE payouts SET status = ?1 WHERE id = ?2 AND status = ?3",
                (to, id, from),
            )?;
            Ok(n == 1)
        })
    }

    /// Settle an approved payout: mark it paid and flip the recipient's
    /// approved earner-side commissions to paid, atomically. Returns false
    /// if the payout is missing or not in the approved state.
    pub fn mark_payout_paid(&self, payout_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let user_id: String = match tx
                .query_row(
                    "SELECT user_id FROM payouts WHERE id = ?1 AND status = 'approved'",
                    [payout_id],
                    |row| row.get(0),
                )
                .optional()?
            {
                Some(uid) => uid,
                None => return Ok(false),
            };

            tx.execute(
                "UPDATE payouts SET status = 'paid' WHERE id = ?1",
                [payout_id],
            )?;
            tx.execute(
                "UPDATE commissions SET status = 'paid' WHERE earner_id = ?1 AND status = 'approved'",
                [&user_id],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }
}

fn is_code_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("referral_links.code")
        }
        _ => false,
    }
}

fn balance_cents(conn: &Connection, user_id: &str) -> Result<i64> {
    let earned: i64 = conn.query_row(
        "SELECT COALESCE(SUM(earner_cents), 0) FROM commissions
         WHERE earner_id = ?1 AND status IN ('approved', 'paid')",
        [user_id],
        |row| row.get(0),
    )?;
    let referred: i64 = conn.query_row(
        "SELECT COALESCE(SUM(referrer_cents), 0) FROM commissions
         WHERE referrer_id = ?1 AND status IN ('approved', 'paid')",
        [user_id],
        |row| row.get(0),
    )?;
    let paid_out: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payouts
         WHERE user_id = ?1 AND status != 'rejected'",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(earned + referred - paid_out)
}

const COMMISSION_SELECT: &str =
    "SELECT id, earner_id, referrer_id, link_id, gross_cents,
            earner_cents, referrer_cents, platform_cents, bonus_applied, status, created_at
     FROM commissions";

const PAYOUT_SELECT: &str =
    "SELECT id, user_id, amount_cents, status, created_at FROM payouts";

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant at every call site, never user input.
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, role, created_at FROM users WHERE {column} = ?1"
    ))?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    })
    .optional()
}

fn map_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok(LinkRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        code: row.get(2)?,
        merchant: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_commission(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommissionRow> {
    Ok(CommissionRow {
        id: row.get(0)?,
        earner_id: row.get(1)?,
        referrer_id: row.get(2)?,
        link_id: row.get(3)?,
        gross_cents: row.get(4)?,
        earner_cents: row.get(5)?,
        referrer_cents: row.get(6)?,
        platform_cents: row.get(7)?,
        bonus_applied: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn map_payout(row: &rusqlite::Row<'_>) -> rusqlite::Result<PayoutRow> {
    Ok(PayoutRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount_cents: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "hash", "user").unwrap();
        id
    }

    fn seed_link(db: &Database, owner_id: &str, code: &str) -> String {
        let id = Uuid::new_v4().to_string();
        assert!(db.create_link(&id, owner_id, code, "acme", &Utc::now().to_rfc3339()).unwrap());
        id
    }

    fn pending_commission(earner_id: &str, referrer_id: Option<&str>, link_id: &str) -> CommissionRow {
        CommissionRow {
            id: Uuid::new_v4().to_string(),
            earner_id: earner_id.to_string(),
            referrer_id: referrer_id.map(str::to_string),
            link_id: link_id.to_string(),
            gross_cents: 1000,
            earner_cents: 800,
            referrer_cents: 50,
            platform_cents: 150,
            bonus_applied: true,
            status: "pending".to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn user_roundtrip_with_role() {
        let db = db();
        let id = seed_user(&db, "alice");

        let row = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.role, "user");
        assert!(db.get_user_by_username("bob").unwrap().is_none());

        assert!(db.promote_to_admin("alice").unwrap());
        assert!(!db.promote_to_admin("bob").unwrap());
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().role, "admin");
    }

    #[test]
    fn link_lookup_by_code_and_owner() {
        let db = db();
        let owner = seed_user(&db, "alice");
        seed_link(&db, &owner, "a1b2c3");
        seed_link(&db, &owner, "d4e5f6");

        let link = db.get_link_by_code("a1b2c3").unwrap().unwrap();
        assert_eq!(link.owner_id, owner);
        assert_eq!(link.merchant, "acme");
        assert!(db.get_link_by_code("nope").unwrap().is_none());

        assert_eq!(db.get_links_by_owner(&owner).unwrap().len(), 2);
    }

    #[test]
    fn code_collision_is_distinguished_from_real_errors() {
        let db = db();
        let owner = seed_user(&db, "alice");
        seed_link(&db, &owner, "a1b2c3");

        // Duplicate code reports a collision the caller can retry.
        let inserted = db
            .create_link(&Uuid::new_v4().to_string(), &owner, "a1b2c3", "acme", &Utc::now().to_rfc3339())
            .unwrap();
        assert!(!inserted);

        // A foreign-key violation is not a collision and surfaces as an error.
        let res = db.create_link(
            &Uuid::new_v4().to_string(),
            "no-such-user",
            "zz99zz",
            "acme",
            &Utc::now().to_rfc3339(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn stored_timestamps_match_what_was_inserted() {
        let db = db();
        let owner = seed_user(&db, "alice");
        let ts = "2026-08-31T12:00:00+00:00";

        assert!(db.create_link("l1", &owner, "a1b2c3", "acme", ts).unwrap());
        assert_eq!(db.get_link_by_code("a1b2c3").unwrap().unwrap().created_at, ts);

        db.insert_payout("p1", &owner, 100, ts).unwrap();
        assert_eq!(db.get_payout("p1").unwrap().unwrap().created_at, ts);

        let link = seed_link(&db, &owner, "d4e5f6");
        let mut c = pending_commission(&owner, None, &link);
        c.created_at = ts.to_string();
        db.insert_commission(&c).unwrap();
        assert_eq!(db.get_commission(&c.id).unwrap().unwrap().created_at, ts);
    }

    #[test]
    fn one_inviter_per_user() {
        let db = db();
        let referrer = seed_user(&db, "alice");
        let other = seed_user(&db, "carol");
        let invitee = seed_user(&db, "bob");

        let now = Utc::now();
        let created = db
            .create_referral_window(
                &Uuid::new_v4().to_string(),
                &referrer,
                &invitee,
                &now.to_rfc3339(),
                &(now + Duration::days(90)).to_rfc3339(),
            )
            .unwrap();
        assert!(created);

        // Second inviter for the same invitee is ignored.
        let created = db
            .create_referral_window(
                &Uuid::new_v4().to_string(),
                &other,
                &invitee,
                &now.to_rfc3339(),
                &(now + Duration::days(90)).to_rfc3339(),
            )
            .unwrap();
        assert!(!created);

        let window = db.get_window_for_invitee(&invitee).unwrap().unwrap();
        assert_eq!(window.referrer_id, referrer);
        assert!(db.get_window_for_invitee(&referrer).unwrap().is_none());
    }

    #[test]
    fn commission_status_writes_are_guarded() {
        let db = db();
        let earner = seed_user(&db, "alice");
        let link = seed_link(&db, &earner, "a1b2c3");
        let c = pending_commission(&earner, None, &link);
        db.insert_commission(&c).unwrap();

        // Stale `from` does not apply.
        assert!(!db.set_commission_status(&c.id, "approved", "paid").unwrap());
        assert!(db.set_commission_status(&c.id, "pending", "approved").unwrap());

        let row = db.get_commission(&c.id).unwrap().unwrap();
        assert_eq!(row.status, "approved");
        assert!(row.bonus_applied);
    }

    #[test]
    fn balance_counts_both_sides_and_subtracts_payouts() {
        let db = db();
        let earner = seed_user(&db, "alice");
        let referrer = seed_user(&db, "bob");
        let link = seed_link(&db, &earner, "a1b2c3");

        let c = pending_commission(&earner, Some(&referrer), &link);
        db.insert_commission(&c).unwrap();

        // Pending commissions are not spendable.
        assert_eq!(db.available_balance_cents(&earner).unwrap(), 0);

        db.set_commission_status(&c.id, "pending", "approved").unwrap();
        assert_eq!(db.available_balance_cents(&earner).unwrap(), 800);
        assert_eq!(db.available_balance_cents(&referrer).unwrap(), 50);

        db.insert_payout("p1", &earner, 300, &Utc::now().to_rfc3339()).unwrap();
        assert_eq!(db.available_balance_cents(&earner).unwrap(), 500);

        // Rejected payouts release the hold.
        db.set_payout_status("p1", "requested", "rejected").unwrap();
        assert_eq!(db.available_balance_cents(&earner).unwrap(), 800);
    }

    #[test]
    fn paying_a_payout_settles_approved_commissions() {
        let db = db();
        let earner = seed_user(&db, "alice");
        let link = seed_link(&db, &earner, "a1b2c3");

        let c = pending_commission(&earner, None, &link);
        db.insert_commission(&c).unwrap();
        db.set_commission_status(&c.id, "pending", "approved").unwrap();

        db.insert_payout("p1", &earner, 800, &Utc::now().to_rfc3339()).unwrap();

        // Only approved payouts can be settled.
        assert!(!db.mark_payout_paid("p1").unwrap());

        db.set_payout_status("p1", "requested", "approved").unwrap();
        assert!(db.mark_payout_paid("p1").unwrap());

        assert_eq!(db.get_payout("p1").unwrap().unwrap().status, "paid");
        assert_eq!(db.get_commission(&c.id).unwrap().unwrap().status, "paid");
        // Credit stays on the paid commission, debit on the paid payout.
        assert_eq!(db.available_balance_cents(&earner).unwrap(), 0);
    }

    #[test]
    fn guarded_payout_insert_respects_balance() {
        let db = db();
        let earner = seed_user(&db, "alice");
        let link = seed_link(&db, &earner, "a1b2c3");

        let c = pending_commission(&earner, None, &link);
        db.insert_commission(&c).unwrap();
        db.set_commission_status(&c.id, "pending", "approved").unwrap();

        // 800 approved; 900 does not fit, 800 does, then nothing is left.
        let ts = Utc::now().to_rfc3339();
        assert!(!db.insert_payout_if_covered("p1", &earner, 900, &ts).unwrap());
        assert!(db.insert_payout_if_covered("p2", &earner, 800, &ts).unwrap());
        assert!(!db.insert_payout_if_covered("p3", &earner, 1, &ts).unwrap());
        assert_eq!(db.get_payouts_by_user(&earner).unwrap().len(), 1);
    }

    #[test]
    fn payout_listings() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let ts = Utc::now().to_rfc3339();
        db.insert_payout("p1", &alice, 100, &ts).unwrap();
        db.insert_payout("p2", &bob, 200, &ts).unwrap();

        assert_eq!(db.get_payouts_by_user(&alice).unwrap().len(), 1);
        assert_eq!(db.get_all_payouts().unwrap().len(), 2);
        assert_eq!(db.get_payout("p2").unwrap().unwrap().amount_cents, 200);
        assert!(db.get_payout("p3").unwrap().is_none());
    }
}
