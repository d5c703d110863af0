use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    Invalid { from: &'static str, to: &'static str },
    #[error("unknown status '{0}'")]
    Unknown(String),
}

/// Commission lifecycle. `Paid` and `Voided` are terminal; a paid commission
/// is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Voided,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Voided => "voided",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TransitionError> {
        match s {
            "pending" => Ok(CommissionStatus::Pending),
            "approved" => Ok(CommissionStatus::Approved),
            "paid" => Ok(CommissionStatus::Paid),
            "voided" => Ok(CommissionStatus::Voided),
            other => Err(TransitionError::Unknown(other.to_string())),
        }
    }

    /// Validate a status change before it reaches the database.
    pub fn transition(self, to: CommissionStatus) -> Result<CommissionStatus, TransitionError> {
        use CommissionStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Voided) | (Approved, Paid) | (Approved, Voided) => {
                Ok(to)
            }
            (from, to) => Err(TransitionError::Invalid {
                from: from.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

/// Payout lifecycle: requested -> approved -> paid, or rejected while still
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Requested,
    Approved,
    Paid,
    Rejected,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Requested => "requested",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TransitionError> {
        match s {
            "requested" => Ok(PayoutStatus::Requested),
            "approved" => Ok(PayoutStatus::Approved),
            "paid" => Ok(PayoutStatus::Paid),
            "rejected" => Ok(PayoutStatus::Rejected),
            other => Err(TransitionError::Unknown(other.to_string())),
        }
    }

    pub fn transition(self, to: PayoutStatus) -> Result<PayoutStatus, TransitionError> {
        use PayoutStatus::*;
        match (self, to) {
            (Requested, Approved) | (Requested, Rejected) | (Approved, Paid) => Ok(to),
            (from, to) => Err(TransitionError::Invalid {
                from: from.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_happy_path() {
        let s = CommissionStatus::Pending;
        let s = s.transition(CommissionStatus::Approved).unwrap();
        let s = s.transition(CommissionStatus::Paid).unwrap();
        assert_eq!(s, CommissionStatus::Paid);
    }

    #[test]
    fn paid_commission_is_immutable() {
        for to in [
            CommissionStatus::Pending,
            CommissionStatus::Approved,
            CommissionStatus::Voided,
        ] {
            assert!(CommissionStatus::Paid.transition(to).is_err());
        }
    }

    #[test]
    fn void_from_pending_and_approved_only() {
        assert!(CommissionStatus::Pending.transition(CommissionStatus::Voided).is_ok());
        assert!(CommissionStatus::Approved.transition(CommissionStatus::Voided).is_ok());
        assert!(CommissionStatus::Voided.transition(CommissionStatus::Approved).is_err());
    }

    #[test]
    fn cannot_pay_pending_commission() {
        assert_eq!(
            CommissionStatus::Pending.transition(CommissionStatus::Paid),
            Err(TransitionError::Invalid { from: "pending", to: "paid" })
        );
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [
            CommissionStatus::Pending,
            CommissionStatus::Approved,
            CommissionStatus::Paid,
            CommissionStatus::Voided,
        ] {
            assert_eq!(CommissionStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(CommissionStatus::parse("shipped").is_err());
    }

    #[test]
    fn payout_rejection_is_terminal() {
        let s = PayoutStatus::Requested;
        let s = s.transition(PayoutStatus::Rejected).unwrap();
        assert!(s.transition(PayoutStatus::Approved).is_err());
        assert!(s.transition(PayoutStatus::Paid).is_err());
    }

    #[test]
    fn payout_must_be_approved_before_paid() {
        assert!(PayoutStatus::Requested.transition(PayoutStatus::Paid).is_err());
        let s = PayoutStatus::Requested.transition(PayoutStatus::Approved).unwrap();
        assert!(s.transition(PayoutStatus::Paid).is_ok());
    }
}
