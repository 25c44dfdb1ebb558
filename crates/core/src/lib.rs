//! # TMC Core
//!
//! Core business logic for the TMC organ-transplant coordination system: the
//! organ request lifecycle and matching engine.
//!
//! This crate owns:
//! - Request lifecycle state machine (`pending → eligibility-validated →
//!   matched → in-progress → completed`, with cancellation)
//! - SLA deadline computation and breach acknowledgement
//! - Candidate application intake and review
//! - Match authorization (the exactly-once accept/lock-out/transplant commit)
//! - Transplant progression and outcome recording
//!
//! **No API concerns**: HTTP servers and wire DTOs belong in `api-rest` and
//! `api-shared`. External collaborators (candidate directory, notification
//! delivery, audit storage) are consumed through the seams in
//! [`collaborators`]; the engine never owns them.

pub mod application;
pub mod authorizer;
pub mod collaborators;
pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod outcome;
pub mod registry;
pub mod request;
pub mod sla;
pub mod store;
pub mod transplant;

mod engine;

pub use application::{Application, ApplicationStatus, SurgeryDetails};
pub use authorizer::{AuthorizedMatch, MatchAuthorizer};
pub use collaborators::{
    AuditEntry, AuditSink, CandidateDirectory, CandidateProfile, EngineEvent, InMemoryDirectory,
    MemoryAuditSink, MemoryDispatcher, NotificationDispatcher, TracingAuditSink, TracingDispatcher,
};
pub use eligibility::{EligibilityPolicy, StandardEligibility};
pub use engine::MatchEngine;
pub use error::{EngineError, EngineResult, EntityKind};
pub use lifecycle::LifecycleService;
pub use outcome::OutcomeRecorder;
pub use registry::ApplicationRegistry;
pub use request::{LifecycleEvent, NewOrganRequest, OrganRequest, RequestStatus, UrgencyLevel};
pub use sla::SlaStatus;
pub use transplant::{
    OrganFunction, SurvivalStatus, Transplant, TransplantOutcome, TransplantStatus,
};

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use crate::collaborators::{InMemoryDirectory, MemoryAuditSink, MemoryDispatcher};
    use crate::eligibility::StandardEligibility;
    use crate::request::{NewOrganRequest, UrgencyLevel};
    use crate::{MatchEngine, SurgeryDetails};

    pub struct Harness {
        pub engine: MatchEngine,
        pub directory: Arc<InMemoryDirectory>,
        pub dispatcher: Arc<MemoryDispatcher>,
        pub audit: Arc<MemoryAuditSink>,
    }

    /// Engine wired to in-memory collaborators so tests can observe emitted
    /// events and audit entries.
    pub fn harness() -> Harness {
        let directory = Arc::new(InMemoryDirectory::new());
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = MatchEngine::new(
            directory.clone(),
            dispatcher.clone(),
            audit.clone(),
            Arc::new(StandardEligibility),
        );
        Harness {
            engine,
            directory,
            dispatcher,
            audit,
        }
    }

    pub fn sample_input() -> NewOrganRequest {
        NewOrganRequest {
            hospital_id: "hosp-1".into(),
            patient_name: "Amara Nwosu".into(),
            patient_age: 41,
            blood_type: "O-".into(),
            organ_type: "kidney".into(),
            urgency: UrgencyLevel::Critical,
            medical_condition: "end-stage renal disease".into(),
        }
    }

    pub fn surgery_details() -> SurgeryDetails {
        SurgeryDetails {
            scheduled_date: "2026-09-12T08:00:00Z".into(),
            surgeon_name: "Dr Okafor".into(),
            operating_room: "OR-3".into(),
        }
    }
}
