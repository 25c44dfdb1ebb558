//! Engine facade: wires the store to the collaborator seams and hands out
//! the per-component services.
//!
//! The engine is stateless regarding identity: every mutating operation takes
//! a caller-supplied actor id which is used for audit entries only. Every
//! mutating operation returns the full updated entity, so callers never need
//! a follow-up read to stay consistent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::Application;
use crate::authorizer::MatchAuthorizer;
use crate::collaborators::{
    AuditEntry, AuditSink, CandidateDirectory, EngineEvent, InMemoryDirectory,
    NotificationDispatcher, TracingAuditSink, TracingDispatcher,
};
use crate::eligibility::{EligibilityPolicy, StandardEligibility};
use crate::error::{EngineResult, EntityKind};
use crate::lifecycle::LifecycleService;
use crate::outcome::OutcomeRecorder;
use crate::registry::ApplicationRegistry;
use crate::request::OrganRequest;
use crate::sla::SlaStatus;
use crate::store::EngineStore;
use crate::transplant::Transplant;

pub(crate) struct EngineInner {
    pub(crate) store: EngineStore,
    pub(crate) directory: Arc<dyn CandidateDirectory>,
    pub(crate) dispatcher: Arc<dyn NotificationDispatcher>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) eligibility: Arc<dyn EligibilityPolicy>,
}

impl EngineInner {
    /// Emits one immutable audit entry for a state transition.
    pub(crate) fn emit_audit(&self, entity: EntityKind, entity_id: Uuid, action: &str, actor: &str) {
        self.audit.record(AuditEntry {
            entity_type: entity,
            entity_id: entity_id.to_string(),
            action: action.to_owned(),
            timestamp: Utc::now(),
            actor: actor.to_owned(),
        });
    }

    /// Fire-and-forget event emission; never blocks on delivery.
    pub(crate) fn emit_event(&self, event: EngineEvent) {
        self.dispatcher.dispatch(event);
    }
}

/// The organ request lifecycle and matching engine.
///
/// Cheap to clone; all clones share the same store and collaborators.
#[derive(Clone)]
pub struct MatchEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl MatchEngine {
    /// Builds an engine around explicit collaborator implementations.
    pub fn new(
        directory: Arc<dyn CandidateDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        audit: Arc<dyn AuditSink>,
        eligibility: Arc<dyn EligibilityPolicy>,
    ) -> Self {
        MatchEngine {
            inner: Arc::new(EngineInner {
                store: EngineStore::new(),
                directory,
                dispatcher,
                audit,
                eligibility,
            }),
        }
    }

    /// Builds an engine with tracing-backed collaborators, an empty in-memory
    /// candidate directory and the standard eligibility policy.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(InMemoryDirectory::new()),
            Arc::new(TracingDispatcher),
            Arc::new(TracingAuditSink),
            Arc::new(StandardEligibility),
        )
    }

    /// Request lifecycle state machine (create, validate, breach, cancel).
    pub fn lifecycle(&self) -> LifecycleService {
        LifecycleService::new(self.inner.clone())
    }

    /// Candidate application intake and review.
    pub fn registry(&self) -> ApplicationRegistry {
        ApplicationRegistry::new(self.inner.clone())
    }

    /// Match authorization (accept one application, lock out the rest).
    pub fn authorizer(&self) -> MatchAuthorizer {
        MatchAuthorizer::new(self.inner.clone())
    }

    /// Transplant progression and outcome recording.
    pub fn outcomes(&self) -> OutcomeRecorder {
        OutcomeRecorder::new(self.inner.clone())
    }

    // -- read surface --------------------------------------------------------

    pub fn request(&self, request_id: Uuid) -> EngineResult<OrganRequest> {
        self.inner.store.read_request(request_id)
    }

    pub fn application(&self, application_id: Uuid) -> EngineResult<Application> {
        self.inner.store.read_application(application_id)
    }

    pub fn transplant(&self, transplant_id: Uuid) -> EngineResult<Transplant> {
        self.inner.store.read_transplant(transplant_id)
    }

    /// Transplants referencing one request (zero or one under the
    /// exactly-once authorize invariant).
    pub fn transplants_for(&self, request_id: Uuid) -> Vec<Transplant> {
        self.inner.store.transplants_for(request_id)
    }

    /// SLA position of a request as of `now`, computed on read.
    pub fn sla_status(&self, request_id: Uuid, now: DateTime<Utc>) -> EngineResult<SlaStatus> {
        let request = self.inner.store.read_request(request_id)?;
        Ok(SlaStatus::of(&request, now))
    }
}
