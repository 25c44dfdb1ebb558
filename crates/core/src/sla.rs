//! SLA clock: urgency-tiered deadlines and breach computation.
//!
//! Everything in this module is a pure deterministic function of its inputs —
//! no state, no side effects, no ambient clock — so it can be unit-tested
//! against frozen timestamps. Urgency-tiered deadlines encode clinical triage
//! priority: a critical request has the tightest window.
//!
//! Breach detection is computed on read; there is no polling daemon in the
//! engine. An external collaborator may poll and acknowledge breaches via
//! `record_sla_breach`, which is where the mandatory delay reason is captured.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::request::{OrganRequest, UrgencyLevel};

/// Maximum allowed hours from request creation to match, per urgency tier.
pub fn deadline_hours(urgency: UrgencyLevel) -> i64 {
    match urgency {
        UrgencyLevel::Critical => 24,
        UrgencyLevel::High => 48,
        UrgencyLevel::Medium => 72,
        UrgencyLevel::Low => 168,
    }
}

/// Absolute SLA deadline for a request created at `created_at`.
pub fn deadline(created_at: DateTime<Utc>, urgency: UrgencyLevel) -> DateTime<Utc> {
    created_at + Duration::hours(deadline_hours(urgency))
}

/// Time left before the SLA deadline, clamped at zero (never negative).
pub fn remaining(
    created_at: DateTime<Utc>,
    urgency: UrgencyLevel,
    now: DateTime<Utc>,
) -> Duration {
    let left = deadline(created_at, urgency) - now;
    left.max(Duration::zero())
}

/// Whether the SLA is breached: the deadline has passed, or a breach has been
/// explicitly acknowledged.
pub fn is_breached(remaining: Duration, explicit_breach: bool) -> bool {
    remaining <= Duration::zero() || explicit_breach
}

/// Read model for a request's SLA position, computed on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlaStatus {
    pub deadline: DateTime<Utc>,
    /// Whole seconds left; zero once the deadline has passed.
    pub remaining_seconds: i64,
    pub breached: bool,
    pub breached_at: Option<DateTime<Utc>>,
    pub delay_reason: Option<String>,
}

impl SlaStatus {
    /// Computes the SLA position of `request` as of `now`.
    pub fn of(request: &OrganRequest, now: DateTime<Utc>) -> Self {
        let left = remaining(request.created_at, request.urgency, now);
        SlaStatus {
            deadline: deadline(request.created_at, request.urgency),
            remaining_seconds: left.num_seconds(),
            breached: is_breached(left, request.sla_breached_at.is_some()),
            breached_at: request.sla_breached_at,
            delay_reason: request.sla_delay_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_deadline_hours_per_tier() {
        assert_eq!(deadline_hours(UrgencyLevel::Critical), 24);
        assert_eq!(deadline_hours(UrgencyLevel::High), 48);
        assert_eq!(deadline_hours(UrgencyLevel::Medium), 72);
        assert_eq!(deadline_hours(UrgencyLevel::Low), 168);
    }

    #[test]
    fn test_critical_window_before_and_after_deadline() {
        // Created at T0 with urgency critical: ~1h left at T0+23h, breached
        // at T0+25h with remaining clamped to zero.
        let at_23h = t0() + Duration::hours(23);
        let left = remaining(t0(), UrgencyLevel::Critical, at_23h);
        assert_eq!(left, Duration::hours(1));
        assert!(!is_breached(left, false));

        let at_25h = t0() + Duration::hours(25);
        let left = remaining(t0(), UrgencyLevel::Critical, at_25h);
        assert_eq!(left, Duration::zero());
        assert!(is_breached(left, false));
    }

    #[test]
    fn test_remaining_is_monotonically_non_increasing() {
        for urgency in [
            UrgencyLevel::Low,
            UrgencyLevel::Medium,
            UrgencyLevel::High,
            UrgencyLevel::Critical,
        ] {
            let mut previous = remaining(t0(), urgency, t0());
            for hour in 1..200 {
                let now = t0() + Duration::hours(hour);
                let current = remaining(t0(), urgency, now);
                assert!(
                    current <= previous,
                    "remaining grew between hours {} and {} for {urgency}",
                    hour - 1,
                    hour
                );
                assert!(current >= Duration::zero());
                previous = current;
            }
            // Clamps at exactly zero, never negative.
            assert_eq!(previous, Duration::zero());
        }
    }

    #[test]
    fn test_explicit_breach_flag_overrides_remaining() {
        let left = remaining(t0(), UrgencyLevel::Low, t0() + Duration::hours(1));
        assert!(left > Duration::zero());
        assert!(is_breached(left, true));
        assert!(!is_breached(left, false));
    }

    #[test]
    fn test_exactly_at_deadline_is_breached() {
        let at_deadline = t0() + Duration::hours(24);
        let left = remaining(t0(), UrgencyLevel::Critical, at_deadline);
        assert_eq!(left, Duration::zero());
        assert!(is_breached(left, false));
    }
}
