//! Candidate application entity.
//!
//! Applications are append-only intake: once one reaches a terminal decision
//! (`accepted` or `rejected`) its status never changes again, and at most one
//! application per request is ever `accepted`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tmc_types::{CompatibilityScore, NonEmptyText};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        };
        write!(f, "{name}")
    }
}

/// Surgery scheduling details, set on an application only when it is
/// accepted by the match authorizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurgeryDetails {
    pub scheduled_date: String,
    pub surgeon_name: String,
    pub operating_room: String,
}

/// A candidate donor/user's submission against an organ request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub request_id: Uuid,
    /// Candidate reference only. Confidential medical data lives in an
    /// external store keyed by this id and is never read here.
    pub candidate_id: NonEmptyText,
    pub submitted_at: DateTime<Utc>,
    /// Store-assigned intake sequence; tie-breaker for deterministic
    /// submission ordering.
    pub sequence: u64,
    /// Opaque advisory score from the external matching collaborator.
    pub compatibility_score: CompatibilityScore,
    pub status: ApplicationStatus,
    /// Present only once the application has been accepted.
    pub surgery_details: Option<SurgeryDetails>,
    /// Present only once the application has been rejected.
    pub rejection_reason: Option<String>,
}

impl Application {
    pub(crate) fn submit(
        request_id: Uuid,
        candidate_id: NonEmptyText,
        score: CompatibilityScore,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Application {
            id: Uuid::new_v4(),
            request_id,
            candidate_id,
            submitted_at: now,
            sequence,
            compatibility_score: score,
            status: ApplicationStatus::Pending,
            surgery_details: None,
            rejection_reason: None,
        }
    }
}
