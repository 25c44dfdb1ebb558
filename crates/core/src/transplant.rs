//! Transplant entity and outcome record.
//!
//! A transplant is created exclusively by the match authorizer and finalized
//! exclusively by the outcome recorder. Its status moves strictly forward
//! (`scheduled → in-progress → completed`), mirroring the real operational
//! checkpoints of surgery start and surgery completion.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransplantStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl TransplantStatus {
    /// The only status this one may advance to, if any.
    pub fn successor(&self) -> Option<TransplantStatus> {
        match self {
            TransplantStatus::Scheduled => Some(TransplantStatus::InProgress),
            TransplantStatus::InProgress => Some(TransplantStatus::Completed),
            TransplantStatus::Completed => None,
        }
    }
}

impl std::fmt::Display for TransplantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransplantStatus::Scheduled => "scheduled",
            TransplantStatus::InProgress => "in-progress",
            TransplantStatus::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for TransplantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(TransplantStatus::Scheduled),
            "in-progress" => Ok(TransplantStatus::InProgress),
            "completed" => Ok(TransplantStatus::Completed),
            other => Err(format!(
                "unknown transplant status '{other}' (expected scheduled, in-progress or completed)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurvivalStatus {
    Alive,
    Critical,
    Deceased,
}

impl std::str::FromStr for SurvivalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alive" => Ok(SurvivalStatus::Alive),
            "critical" => Ok(SurvivalStatus::Critical),
            "deceased" => Ok(SurvivalStatus::Deceased),
            other => Err(format!(
                "unknown survival status '{other}' (expected alive, critical or deceased)"
            )),
        }
    }
}

impl std::fmt::Display for SurvivalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SurvivalStatus::Alive => "alive",
            SurvivalStatus::Critical => "critical",
            SurvivalStatus::Deceased => "deceased",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganFunction {
    Good,
    Fair,
    Poor,
    Failed,
}

impl std::str::FromStr for OrganFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(OrganFunction::Good),
            "fair" => Ok(OrganFunction::Fair),
            "poor" => Ok(OrganFunction::Poor),
            "failed" => Ok(OrganFunction::Failed),
            other => Err(format!(
                "unknown organ function '{other}' (expected good, fair, poor or failed)"
            )),
        }
    }
}

impl std::fmt::Display for OrganFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrganFunction::Good => "good",
            OrganFunction::Fair => "fair",
            OrganFunction::Poor => "poor",
            OrganFunction::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Terminal outcome of a transplant, recorded exactly once at completion.
///
/// Immutable once recorded: amendments require a new audit entry at the
/// collaborator level, never mutation of this record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransplantOutcome {
    pub success: bool,
    pub survival_status: SurvivalStatus,
    pub organ_function: OrganFunction,
    #[serde(default)]
    pub complications: BTreeSet<String>,
    #[serde(default)]
    pub follow_up_required: bool,
    pub notes: Option<String>,
}

/// The transplant record tying an accepted application to its organ request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transplant {
    pub id: Uuid,
    pub request_id: Uuid,
    pub application_id: Uuid,
    pub status: TransplantStatus,
    /// Set only when status becomes `completed`.
    pub outcome: Option<TransplantOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transplant {
    pub(crate) fn schedule(request_id: Uuid, application_id: Uuid, now: DateTime<Utc>) -> Self {
        Transplant {
            id: Uuid::new_v4(),
            request_id,
            application_id,
            status: TransplantStatus::Scheduled,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_is_strict() {
        assert_eq!(
            TransplantStatus::Scheduled.successor(),
            Some(TransplantStatus::InProgress)
        );
        assert_eq!(
            TransplantStatus::InProgress.successor(),
            Some(TransplantStatus::Completed)
        );
        assert_eq!(TransplantStatus::Completed.successor(), None);
    }
}
