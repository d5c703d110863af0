use serde::{Deserialize, Serialize};

/// Platform margin in basis points (out of 10000).
pub const PLATFORM_FEE_BPS: i64 = 1500;

/// Referral bonus in basis points, carved out of the earner's share.
pub const REFERRAL_BONUS_BPS: i64 = 500;

pub const BPS_DENOMINATOR: i64 = 10_000;

/// Three-way division of a gross commission amount. Derived, never stored
/// independently of the commission row it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub earner_cents: i64,
    pub referrer_cents: i64,
    pub platform_cents: i64,
    pub bonus_applied: bool,
}

impl Split {
    pub const ZERO: Split = Split {
        earner_cents: 0,
        referrer_cents: 0,
        platform_cents: 0,
        bonus_applied: false,
    };

    pub fn total_cents(&self) -> i64 {
        self.earner_cents + self.referrer_cents + self.platform_cents
    }
}

/// Split a gross commission (smallest currency unit) between earner,
/// referrer, and platform.
///
/// The platform cut is taken first; the referral bonus, when a window is
/// active, comes out of the earner's remainder and never touches the
/// platform's share. Both cuts truncate toward zero independently, so the
/// three shares can undershoot the gross amount by up to two cents. The
/// earner absorbs that remainder via subtraction, which means the shortfall
/// only appears relative to the naive percentage sums, never as money lost
/// from the gross.
///
/// Non-positive input is clamped to the all-zero split.
pub fn split_commission(gross_cents: i64, referral_active: bool) -> Split {
    if gross_cents <= 0 {
        return Split::ZERO;
    }

    let platform_cents = bps_cut(gross_cents, PLATFORM_FEE_BPS);
    let mut earner_cents = gross_cents - platform_cents;

    let (referrer_cents, bonus_applied) = if referral_active {
        let cut = bps_cut(gross_cents, REFERRAL_BONUS_BPS);
        earner_cents = (earner_cents - cut).max(0);
        (cut, true)
    } else {
        (0, false)
    };

    Split {
        earner_cents,
        referrer_cents,
        platform_cents,
        bonus_applied,
    }
}

/// Truncating bps cut, widened to i128 so the intermediate product cannot
/// overflow for any i64 gross amount. The result is at most `gross`, so the
/// narrowing cast is lossless.
fn bps_cut(gross_cents: i64, bps: i64) -> i64 {
    (gross_cents as i128 * bps as i128 / BPS_DENOMINATOR as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_thousand_without_bonus() {
        let s = split_commission(1000, false);
        assert_eq!(s.platform_cents, 150);
        assert_eq!(s.earner_cents, 850);
        assert_eq!(s.referrer_cents, 0);
        assert!(!s.bonus_applied);
        assert_eq!(s.total_cents(), 1000);
    }

    #[test]
    fn round_thousand_with_bonus() {
        let s = split_commission(1000, true);
        assert_eq!(s.platform_cents, 150);
        assert_eq!(s.referrer_cents, 50);
        assert_eq!(s.earner_cents, 800);
        assert!(s.bonus_applied);
        assert_eq!(s.total_cents(), 1000);
    }

    #[test]
    fn truncating_amount_with_bonus() {
        // 455 * 15% = 68.25, 455 * 5% = 22.75 — both truncate.
        let s = split_commission(455, true);
        assert_eq!(s.platform_cents, 68);
        assert_eq!(s.referrer_cents, 22);
        assert_eq!(s.earner_cents, 365);
        assert_eq!(s.total_cents(), 455);
    }

    #[test]
    fn zero_gross_is_all_zero() {
        assert_eq!(split_commission(0, false), Split::ZERO);
        assert_eq!(split_commission(0, true), Split::ZERO);
    }

    #[test]
    fn negative_gross_clamps_to_zero() {
        let s = split_commission(-250, true);
        assert_eq!(s, Split::ZERO);
        assert!(!s.bonus_applied);
    }

    #[test]
    fn bonus_never_reduces_platform_share() {
        for gross in [1, 7, 99, 455, 1000, 12_345, 1_000_000] {
            let without = split_commission(gross, false);
            let with = split_commission(gross, true);
            assert_eq!(with.platform_cents, without.platform_cents);
            assert_eq!(with.platform_cents, gross * 15 / 100);
        }
    }

    #[test]
    fn shares_never_exceed_gross_and_shortfall_is_bounded() {
        for gross in 0..5000 {
            for active in [false, true] {
                let s = split_commission(gross, active);
                let total = s.total_cents();
                assert!(total <= gross, "gross={gross} active={active}");
                // Two independent floors can each drop less than one cent.
                assert!(gross - total <= 2, "gross={gross} active={active}");
                assert!(s.earner_cents >= 0);
            }
        }
    }

    #[test]
    fn inactive_window_means_no_referrer_cut() {
        for gross in [1, 19, 455, 10_000] {
            let s = split_commission(gross, false);
            assert_eq!(s.referrer_cents, 0);
            assert_eq!(s.earner_cents, gross - s.platform_cents);
            assert!(!s.bonus_applied);
        }
    }

    #[test]
    fn active_window_cut_comes_from_earner() {
        for gross in [20, 455, 999, 10_000] {
            let s = split_commission(gross, true);
            assert_eq!(s.referrer_cents, gross * 5 / 100);
            assert_eq!(
                s.earner_cents,
                (gross - s.platform_cents - s.referrer_cents).max(0)
            );
        }
    }

    #[test]
    fn huge_amounts_do_not_overflow() {
        for gross in [i64::MAX, i64::MAX - 1, 6_148_914_691_236_517_205] {
            let s = split_commission(gross, true);
            assert!(s.platform_cents >= 0);
            assert!(s.referrer_cents >= 0);
            assert!(s.earner_cents >= 0);
            assert!(s.total_cents() <= gross);
            assert!(gross - s.total_cents() <= 2);
            assert_eq!(s.platform_cents, (gross as i128 * 15 / 100) as i64);
        }
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = split_commission(4242, true);
        let b = split_commission(4242, true);
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_amounts_round_to_nothing() {
        // Below 7 cents the 15% cut truncates to zero and the earner keeps it all.
        let s = split_commission(6, true);
        assert_eq!(s.platform_cents, 0);
        assert_eq!(s.referrer_cents, 0);
        assert_eq!(s.earner_cents, 6);
        assert!(s.bonus_applied);
    }
}
