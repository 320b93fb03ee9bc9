//! Check-in admission rules.
//!
//! Pure decision logic over a member's current standing. Callers load
//! the standing from storage, pass the clock in, and persist the ledger
//! event only when admission succeeds. Date comparisons use the server's
//! local calendar day, matching how the front desk reasons about "today".

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How an attendance event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInMethod {
    /// Staff keyed the register number in at the desk.
    Manual,
    /// Member self-served with the QR kiosk and their register number.
    QrSelf,
    /// Face recognition, local or remote backend.
    Face,
    /// Telegram bot check-in.
    Telegram,
}

impl CheckInMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInMethod::Manual => "manual",
            CheckInMethod::QrSelf => "qr_self",
            CheckInMethod::Face => "face",
            CheckInMethod::Telegram => "telegram",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(CheckInMethod::Manual),
            "qr_self" => Some(CheckInMethod::QrSelf),
            "face" => Some(CheckInMethod::Face),
            "telegram" => Some(CheckInMethod::Telegram),
            _ => None,
        }
    }
}

/// A member's standing at the moment of a check-in attempt.
#[derive(Debug, Clone)]
pub struct MemberStanding {
    pub reg_no: u32,
    pub name: String,
    pub phone: String,
    pub pack_type: String,
    /// Membership expiry. `None` never expires.
    pub due_date: Option<NaiveDate>,
    pub last_check_in: Option<DateTime<Utc>>,
    /// Enrolled under the tenant's active recognition backend.
    pub face_enrolled: bool,
}

/// Why a check-in attempt was refused. Each variant carries what the
/// boundary needs to answer the kiosk and alert staff; none of them is
/// a server fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckInRefusal {
    /// Carries contact details so an external notifier can alert staff.
    #[error("membership for {name} (reg {reg_no}) expired on {due_date}")]
    MembershipExpired {
        name: String,
        reg_no: u32,
        phone: String,
        due_date: NaiveDate,
    },
    /// Member is enrolled in face recognition; a bare register number
    /// must not bypass the stronger factor.
    #[error("face check-in required for {name} (reg {reg_no})")]
    FaceRequired { name: String, reg_no: u32 },
    #[error("already checked in today at {at}")]
    AlreadyCheckedIn { at: DateTime<Utc> },
}

/// Decide whether a member may check in right now.
///
/// Order matters: an expired membership wins over everything so staff
/// get the renewal conversation even for face-enrolled members.
pub fn evaluate(
    standing: &MemberStanding,
    method: CheckInMethod,
    now: DateTime<Utc>,
) -> Result<(), CheckInRefusal> {
    let today = local_date(now);

    if let Some(due) = standing.due_date {
        if due < today {
            return Err(CheckInRefusal::MembershipExpired {
                name: standing.name.clone(),
                reg_no: standing.reg_no,
                phone: standing.phone.clone(),
                due_date: due,
            });
        }
    }

    if method == CheckInMethod::QrSelf && standing.face_enrolled {
        return Err(CheckInRefusal::FaceRequired {
            name: standing.name.clone(),
            reg_no: standing.reg_no,
        });
    }

    if let Some(last) = standing.last_check_in {
        if local_date(last) == today {
            return Err(CheckInRefusal::AlreadyCheckedIn { at: last });
        }
    }

    Ok(())
}

/// Whether "remove today's check-in" applies: only a check-in recorded
/// earlier on the current local calendar day may be undone.
pub fn undo_allowed(last_check_in: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_check_in {
        Some(last) => local_date(last) == local_date(now),
        None => false,
    }
}

/// Calendar-month bucket index (0 = January) for attendance aggregates.
pub fn month_index(at: DateTime<Utc>) -> usize {
    at.with_timezone(&Local).month0() as usize
}

fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// Fixed local noon, so "same day" assertions never straddle midnight.
    fn noon() -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn today() -> NaiveDate {
        local_date(noon())
    }

    fn standing() -> MemberStanding {
        MemberStanding {
            reg_no: 12,
            name: "Asha Pillai".into(),
            phone: "9876543210".into(),
            pack_type: "quarterly".into(),
            due_date: None,
            last_check_in: None,
            face_enrolled: false,
        }
    }

    #[test]
    fn test_admits_member_in_good_standing() {
        assert!(evaluate(&standing(), CheckInMethod::Manual, noon()).is_ok());
    }

    #[test]
    fn test_due_yesterday_refused() {
        let mut s = standing();
        s.due_date = Some(today() - Duration::days(1));
        match evaluate(&s, CheckInMethod::Manual, noon()) {
            Err(CheckInRefusal::MembershipExpired { reg_no, phone, .. }) => {
                assert_eq!(reg_no, 12);
                assert_eq!(phone, "9876543210");
            }
            other => panic!("expected expiry refusal, got {other:?}"),
        }
    }

    #[test]
    fn test_due_today_admitted() {
        let mut s = standing();
        s.due_date = Some(today());
        assert!(evaluate(&s, CheckInMethod::Manual, noon()).is_ok());
    }

    #[test]
    fn test_due_in_future_admitted() {
        let mut s = standing();
        s.due_date = Some(today() + Duration::days(30));
        assert!(evaluate(&s, CheckInMethod::QrSelf, noon()).is_ok());
    }

    #[test]
    fn test_qr_refused_when_face_enrolled() {
        let mut s = standing();
        s.face_enrolled = true;
        assert!(matches!(
            evaluate(&s, CheckInMethod::QrSelf, noon()),
            Err(CheckInRefusal::FaceRequired { .. })
        ));
    }

    #[test]
    fn test_face_and_manual_allowed_when_face_enrolled() {
        let mut s = standing();
        s.face_enrolled = true;
        assert!(evaluate(&s, CheckInMethod::Face, noon()).is_ok());
        assert!(evaluate(&s, CheckInMethod::Manual, noon()).is_ok());
    }

    #[test]
    fn test_expiry_wins_over_face_gate() {
        let mut s = standing();
        s.face_enrolled = true;
        s.due_date = Some(today() - Duration::days(3));
        assert!(matches!(
            evaluate(&s, CheckInMethod::QrSelf, noon()),
            Err(CheckInRefusal::MembershipExpired { .. })
        ));
    }

    #[test]
    fn test_second_check_in_same_day_refused() {
        let mut s = standing();
        s.last_check_in = Some(noon() - Duration::minutes(40));
        assert!(matches!(
            evaluate(&s, CheckInMethod::Manual, noon()),
            Err(CheckInRefusal::AlreadyCheckedIn { .. })
        ));
    }

    #[test]
    fn test_yesterday_check_in_does_not_block() {
        let mut s = standing();
        s.last_check_in = Some(noon() - Duration::days(1));
        assert!(evaluate(&s, CheckInMethod::Manual, noon()).is_ok());
    }

    #[test]
    fn test_undo_window() {
        assert!(undo_allowed(Some(noon() - Duration::minutes(5)), noon()));
        assert!(!undo_allowed(Some(noon() - Duration::days(1)), noon()));
        assert!(!undo_allowed(None, noon()));
    }

    #[test]
    fn test_method_round_trip() {
        for m in [
            CheckInMethod::Manual,
            CheckInMethod::QrSelf,
            CheckInMethod::Face,
            CheckInMethod::Telegram,
        ] {
            assert_eq!(CheckInMethod::parse(m.as_str()), Some(m));
        }
        assert_eq!(CheckInMethod::parse("carrier-pigeon"), None);
    }
}
