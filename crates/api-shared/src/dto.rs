//! Wire DTOs for the REST surface.
//!
//! Each response type carries the full updated entity returned by the
//! engine's mutating calls, so clients never need a follow-up read after an
//! action. Enum-valued fields travel as their lowercase/kebab-case string
//! forms and are parsed back at the boundary.

use serde::{Deserialize, Serialize};
use tmc_core::{
    Application, AuthorizedMatch, LifecycleEvent, OrganRequest, SlaStatus, SurgeryDetails,
    Transplant, TransplantOutcome,
};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body returned by every non-2xx engine response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Error kind: `validation`, `not-found`, `conflict` or `invalid-state`.
    pub error: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRequestReq {
    pub hospital_id: String,
    pub patient_name: String,
    pub patient_age: u8,
    pub blood_type: String,
    pub organ_type: String,
    /// One of `low`, `medium`, `high`, `critical`.
    pub urgency: String,
    #[serde(default)]
    pub medical_condition: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LifecycleEventRes {
    pub stage: String,
    pub timestamp: String,
    pub notes: Option<String>,
}

impl From<&LifecycleEvent> for LifecycleEventRes {
    fn from(event: &LifecycleEvent) -> Self {
        LifecycleEventRes {
            stage: event.stage.clone(),
            timestamp: event.timestamp.to_rfc3339(),
            notes: event.notes.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrganRequestRes {
    pub id: String,
    pub code: String,
    pub hospital_id: String,
    pub patient_name: String,
    pub patient_age: u8,
    pub blood_type: String,
    pub organ_type: String,
    pub urgency: String,
    pub medical_condition: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub sla_breached_at: Option<String>,
    pub sla_delay_reason: Option<String>,
    pub lifecycle_log: Vec<LifecycleEventRes>,
}

impl From<&OrganRequest> for OrganRequestRes {
    fn from(request: &OrganRequest) -> Self {
        OrganRequestRes {
            id: request.id.to_string(),
            code: request.code.clone(),
            hospital_id: request.hospital_id.clone(),
            patient_name: request.patient_name.clone(),
            patient_age: request.patient_age,
            blood_type: request.blood_type.clone(),
            organ_type: request.organ_type.clone(),
            urgency: request.urgency.to_string(),
            medical_condition: request.medical_condition.clone(),
            status: request.status.to_string(),
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
            sla_breached_at: request.sla_breached_at.map(|t| t.to_rfc3339()),
            sla_delay_reason: request.sla_delay_reason.clone(),
            lifecycle_log: request.lifecycle_log.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SlaStatusRes {
    pub deadline: String,
    pub remaining_seconds: i64,
    pub breached: bool,
    pub breached_at: Option<String>,
    pub delay_reason: Option<String>,
}

impl From<&SlaStatus> for SlaStatusRes {
    fn from(status: &SlaStatus) -> Self {
        SlaStatusRes {
            deadline: status.deadline.to_rfc3339(),
            remaining_seconds: status.remaining_seconds,
            breached: status.breached,
            breached_at: status.breached_at.map(|t| t.to_rfc3339()),
            delay_reason: status.delay_reason.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SlaBreachReq {
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitApplicationReq {
    pub candidate_id: String,
    pub compatibility_score: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectApplicationReq {
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SurgeryDetailsDto {
    pub scheduled_date: String,
    pub surgeon_name: String,
    pub operating_room: String,
}

impl From<SurgeryDetailsDto> for SurgeryDetails {
    fn from(dto: SurgeryDetailsDto) -> Self {
        SurgeryDetails {
            scheduled_date: dto.scheduled_date,
            surgeon_name: dto.surgeon_name,
            operating_room: dto.operating_room,
        }
    }
}

impl From<&SurgeryDetails> for SurgeryDetailsDto {
    fn from(details: &SurgeryDetails) -> Self {
        SurgeryDetailsDto {
            scheduled_date: details.scheduled_date.clone(),
            surgeon_name: details.surgeon_name.clone(),
            operating_room: details.operating_room.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationRes {
    pub id: String,
    pub request_id: String,
    pub candidate_id: String,
    pub submitted_at: String,
    pub compatibility_score: f64,
    pub status: String,
    pub surgery_details: Option<SurgeryDetailsDto>,
    pub rejection_reason: Option<String>,
}

impl From<&Application> for ApplicationRes {
    fn from(application: &Application) -> Self {
        ApplicationRes {
            id: application.id.to_string(),
            request_id: application.request_id.to_string(),
            candidate_id: application.candidate_id.to_string(),
            submitted_at: application.submitted_at.to_rfc3339(),
            compatibility_score: application.compatibility_score.value(),
            status: application.status.to_string(),
            surgery_details: application.surgery_details.as_ref().map(Into::into),
            rejection_reason: application.rejection_reason.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListApplicationsRes {
    pub applications: Vec<ApplicationRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OutcomeDto {
    pub success: bool,
    /// One of `alive`, `critical`, `deceased`.
    pub survival_status: String,
    /// One of `good`, `fair`, `poor`, `failed`.
    pub organ_function: String,
    #[serde(default)]
    pub complications: Vec<String>,
    #[serde(default)]
    pub follow_up_required: bool,
    pub notes: Option<String>,
}

impl From<&TransplantOutcome> for OutcomeDto {
    fn from(outcome: &TransplantOutcome) -> Self {
        OutcomeDto {
            success: outcome.success,
            survival_status: outcome.survival_status.to_string(),
            organ_function: outcome.organ_function.to_string(),
            complications: outcome.complications.iter().cloned().collect(),
            follow_up_required: outcome.follow_up_required,
            notes: outcome.notes.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvanceTransplantReq {
    /// Target status; only the immediate successor is accepted.
    pub target: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransplantRes {
    pub id: String,
    pub request_id: String,
    pub application_id: String,
    pub status: String,
    pub outcome: Option<OutcomeDto>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Transplant> for TransplantRes {
    fn from(transplant: &Transplant) -> Self {
        TransplantRes {
            id: transplant.id.to_string(),
            request_id: transplant.request_id.to_string(),
            application_id: transplant.application_id.to_string(),
            status: transplant.status.to_string(),
            outcome: transplant.outcome.as_ref().map(Into::into),
            created_at: transplant.created_at.to_rfc3339(),
            updated_at: transplant.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizedMatchRes {
    pub request: OrganRequestRes,
    pub application: ApplicationRes,
    pub transplant: TransplantRes,
}

impl From<&AuthorizedMatch> for AuthorizedMatchRes {
    fn from(authorized: &AuthorizedMatch) -> Self {
        AuthorizedMatchRes {
            request: (&authorized.request).into(),
            application: (&authorized.application).into(),
            transplant: (&authorized.transplant).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_dto_round_trips_complications() {
        let mut complications = std::collections::BTreeSet::new();
        complications.insert("delayed graft function".to_string());
        let outcome = TransplantOutcome {
            success: true,
            survival_status: tmc_core::SurvivalStatus::Alive,
            organ_function: tmc_core::OrganFunction::Fair,
            complications,
            follow_up_required: true,
            notes: Some("monitor creatinine".into()),
        };

        let dto = OutcomeDto::from(&outcome);
        assert_eq!(dto.survival_status, "alive");
        assert_eq!(dto.organ_function, "fair");
        assert_eq!(dto.complications, vec!["delayed graft function"]);
    }
}
