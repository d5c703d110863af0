use chrono::{DateTime, Utc};

/// Whether a referral window is active at `now`. The start bound is
/// inclusive, the expiry exclusive.
pub fn window_active(starts_at: DateTime<Utc>, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    starts_at <= now && now < expires_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn active_inside_bounds() {
        let now = Utc::now();
        assert!(window_active(now - Duration::days(1), now + Duration::days(89), now));
    }

    #[test]
    fn inactive_after_expiry() {
        let now = Utc::now();
        assert!(!window_active(now - Duration::days(91), now - Duration::days(1), now));
    }

    #[test]
    fn inactive_before_start() {
        let now = Utc::now();
        assert!(!window_active(now + Duration::hours(1), now + Duration::days(90), now));
    }

    #[test]
    fn expiry_instant_is_inactive() {
        let now = Utc::now();
        assert!(!window_active(now - Duration::days(90), now, now));
    }

    #[test]
    fn start_instant_is_active() {
        let now = Utc::now();
        assert!(window_active(now, now + Duration::days(90), now));
    }
}
