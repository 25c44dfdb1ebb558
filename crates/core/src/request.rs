//! Organ request entity and its status graph.
//!
//! A request moves along `pending → eligibility-validated → matched →
//! in-progress → completed`, with `cancelled` reachable from every
//! non-terminal state. The lifecycle log is append-only: entries are never
//! reordered or deleted, so the log doubles as the request's audit trail of
//! stage changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient triage priority driving the SLA deadline.
///
/// Immutable after request creation: changing urgency retroactively would
/// corrupt the SLA history of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for UrgencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(UrgencyLevel::Low),
            "medium" => Ok(UrgencyLevel::Medium),
            "high" => Ok(UrgencyLevel::High),
            "critical" => Ok(UrgencyLevel::Critical),
            other => Err(format!(
                "unknown urgency level '{other}' (expected low, medium, high or critical)"
            )),
        }
    }
}

/// Current lifecycle state of an organ request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    EligibilityValidated,
    Matched,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Whether the request has reached a soft-terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// Whether new candidate applications may still be submitted.
    ///
    /// Intake closes as soon as the request is matched, cancelled or
    /// completed.
    pub fn accepts_applications(&self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::EligibilityValidated
        )
    }

    /// Whether an application on this request may still be authorized.
    pub fn is_matchable(&self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::EligibilityValidated
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::EligibilityValidated => "eligibility-validated",
            RequestStatus::Matched => "matched",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// One append-only entry in a request's lifecycle log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Stage label, e.g. `created`, `eligibility-validated`, `matched`.
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Input for creating a new organ request.
///
/// The patient snapshot is captured verbatim at creation time; the owning
/// hospital is a reference to an external collaborator and is immutable
/// afterwards.
#[derive(Clone, Debug, Deserialize)]
pub struct NewOrganRequest {
    pub hospital_id: String,
    pub patient_name: String,
    pub patient_age: u8,
    pub blood_type: String,
    pub organ_type: String,
    pub urgency: UrgencyLevel,
    pub medical_condition: String,
}

/// A patient's organ request, from creation through matching to outcome.
///
/// Requests are never hard-deleted; `completed` and `cancelled` are
/// soft-terminal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrganRequest {
    /// Internal identity.
    pub id: Uuid,
    /// Human-readable request code, e.g. `OR-550E8400`.
    pub code: String,
    /// Owning hospital reference. Immutable after creation.
    pub hospital_id: String,

    pub patient_name: String,
    pub patient_age: u8,
    pub blood_type: String,
    pub organ_type: String,
    pub urgency: UrgencyLevel,
    pub medical_condition: String,

    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set at most once, by `record_sla_breach`.
    pub sla_breached_at: Option<DateTime<Utc>>,
    /// Required once a breach has been acknowledged.
    pub sla_delay_reason: Option<String>,

    pub lifecycle_log: Vec<LifecycleEvent>,
}

impl OrganRequest {
    /// Builds a new `pending` request from validated intake data.
    pub(crate) fn create(input: NewOrganRequest, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let code = format!("OR-{}", &id.simple().to_string()[..8].to_uppercase());
        let mut request = OrganRequest {
            id,
            code,
            hospital_id: input.hospital_id,
            patient_name: input.patient_name,
            patient_age: input.patient_age,
            blood_type: input.blood_type,
            organ_type: input.organ_type,
            urgency: input.urgency,
            medical_condition: input.medical_condition,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            sla_breached_at: None,
            sla_delay_reason: None,
            lifecycle_log: Vec::new(),
        };
        request.log_stage("created", None, now);
        request
    }

    /// Appends a lifecycle event and bumps `updated_at`.
    pub(crate) fn log_stage(
        &mut self,
        stage: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.lifecycle_log.push(LifecycleEvent {
            stage: stage.to_owned(),
            timestamp: now,
            notes,
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_pending_with_created_event() {
        let now = Utc::now();
        let request = OrganRequest::create(
            NewOrganRequest {
                hospital_id: "hosp-1".into(),
                patient_name: "Amara Nwosu".into(),
                patient_age: 41,
                blood_type: "O-".into(),
                organ_type: "kidney".into(),
                urgency: UrgencyLevel::High,
                medical_condition: "end-stage renal disease".into(),
            },
            now,
        );

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.lifecycle_log.len(), 1);
        assert_eq!(request.lifecycle_log[0].stage, "created");
        assert!(request.code.starts_with("OR-"));
        assert_eq!(request.code.len(), 11);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(!RequestStatus::Matched.is_terminal());
        assert!(!RequestStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_application_intake_window() {
        assert!(RequestStatus::Pending.accepts_applications());
        assert!(RequestStatus::EligibilityValidated.accepts_applications());
        assert!(!RequestStatus::Matched.accepts_applications());
        assert!(!RequestStatus::Cancelled.accepts_applications());
        assert!(!RequestStatus::Completed.accepts_applications());
    }

    #[test]
    fn test_urgency_parse() {
        assert_eq!(
            " Critical ".parse::<UrgencyLevel>().unwrap(),
            UrgencyLevel::Critical
        );
        assert!("urgent".parse::<UrgencyLevel>().is_err());
    }
}
