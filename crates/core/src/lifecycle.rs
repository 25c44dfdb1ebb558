//! Request lifecycle state machine.
//!
//! Owns the request's status and lifecycle event log. All mutating operations
//! run under the request's serialization lock; each returns the full updated
//! entity.

use std::sync::Arc;

use chrono::Utc;
use tmc_types::NonEmptyText;
use uuid::Uuid;

use crate::collaborators::{CandidateDirectory, EngineEvent};
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::request::{NewOrganRequest, OrganRequest, RequestStatus};
use crate::ApplicationStatus;

pub struct LifecycleService {
    inner: Arc<EngineInner>,
}

impl LifecycleService {
    pub(crate) fn new(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    /// Creates a new organ request in `pending` state.
    ///
    /// The SLA window starts at the returned entity's `created_at`. Urgency
    /// and the owning hospital are immutable afterwards.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` when the patient snapshot is
    /// incomplete (blank name, blood type, organ type or hospital id, or a
    /// zero age).
    pub fn create_request(
        &self,
        actor: &str,
        input: NewOrganRequest,
    ) -> EngineResult<OrganRequest> {
        for (field, value) in [
            ("hospital id", &input.hospital_id),
            ("patient name", &input.patient_name),
            ("blood type", &input.blood_type),
            ("organ type", &input.organ_type),
        ] {
            NonEmptyText::new(value)
                .map_err(|_| EngineError::Validation(format!("{field} is required")))?;
        }
        if input.patient_age == 0 {
            return Err(EngineError::Validation(
                "patient age must be greater than zero".into(),
            ));
        }

        let request = OrganRequest::create(input, Utc::now());
        self.inner.store.insert_request(request.clone());
        self.inner
            .emit_audit(EntityKind::Request, request.id, "request.created", actor);
        tracing::info!(request_id = %request.id, code = %request.code, urgency = %request.urgency, "organ request created");
        Ok(request)
    }

    /// Validates patient data completeness and moves the request from
    /// `pending` to `eligibility-validated`.
    ///
    /// Idempotent: re-validating an already-validated request succeeds
    /// without mutation and without a duplicate lifecycle event.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the request id is unknown.
    /// - `EngineError::Validation` when the eligibility policy rejects the
    ///   patient snapshot.
    /// - `EngineError::InvalidState` when the request has already moved past
    ///   validation (matched, in-progress, completed or cancelled).
    pub fn validate_eligibility(&self, actor: &str, request_id: Uuid) -> EngineResult<OrganRequest> {
        let lock = self.inner.store.request_lock(request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut request = self.inner.store.read_request(request_id)?;
        match request.status {
            RequestStatus::EligibilityValidated => Ok(request),
            RequestStatus::Pending => {
                self.inner.eligibility.check(&request)?;
                request.status = RequestStatus::EligibilityValidated;
                request.log_stage("eligibility-validated", None, Utc::now());
                self.inner.store.write_request(request.clone());
                self.inner.emit_audit(
                    EntityKind::Request,
                    request_id,
                    "request.eligibility-validated",
                    actor,
                );
                Ok(request)
            }
            other => Err(EngineError::InvalidState {
                entity: EntityKind::Request,
                id: request_id.to_string(),
                from: other.to_string(),
                attempted: "eligibility-validated".into(),
            }),
        }
    }

    /// Acknowledges an SLA breach, capturing the mandatory delay reason.
    ///
    /// Allowed exactly once per request. Breach acknowledgement is advisory
    /// and audit-oriented: it does not change the request's status.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the request id is unknown.
    /// - `EngineError::Validation` when the reason is blank.
    /// - `EngineError::Conflict` when a breach was already recorded.
    pub fn record_sla_breach(
        &self,
        actor: &str,
        request_id: Uuid,
        reason: &str,
    ) -> EngineResult<OrganRequest> {
        let reason = NonEmptyText::new(reason).map_err(|_| {
            EngineError::Validation("an SLA breach requires a non-empty delay reason".into())
        })?;

        let lock = self.inner.store.request_lock(request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut request = self.inner.store.read_request(request_id)?;
        if request.sla_breached_at.is_some() {
            return Err(EngineError::Conflict {
                entity: EntityKind::Request,
                id: request_id.to_string(),
                status: "sla-breached".into(),
                operation: "record SLA breach on",
            });
        }

        let now = Utc::now();
        request.sla_breached_at = Some(now);
        request.sla_delay_reason = Some(reason.to_string());
        request.log_stage("sla-breached", Some(reason.to_string()), now);
        self.inner.store.write_request(request.clone());

        self.inner
            .emit_audit(EntityKind::Request, request_id, "request.sla-breached", actor);
        self.inner.emit_event(EngineEvent::SlaBreached {
            request_id,
            reason: reason.to_string(),
        });
        tracing::warn!(request_id = %request_id, reason = %reason, "SLA breach recorded");
        Ok(request)
    }

    /// Cancels a request from any non-terminal state.
    ///
    /// Rejects every still-pending application, releases a locked donor back
    /// to the available pool when the request was already matched, and leaves
    /// an accepted application untouched as a historical record.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the request id is unknown.
    /// - `EngineError::Conflict` when the request is already `completed` or
    ///   `cancelled`.
    pub fn cancel(&self, actor: &str, request_id: Uuid) -> EngineResult<OrganRequest> {
        let lock = self.inner.store.request_lock(request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut request = self.inner.store.read_request(request_id)?;
        if request.status.is_terminal() {
            return Err(EngineError::Conflict {
                entity: EntityKind::Request,
                id: request_id.to_string(),
                status: request.status.to_string(),
                operation: "cancel",
            });
        }

        let now = Utc::now();
        for mut application in self.inner.store.applications_for(request_id) {
            match application.status {
                ApplicationStatus::Pending => {
                    application.status = ApplicationStatus::Rejected;
                    application.rejection_reason = Some("request cancelled".into());
                    self.inner.store.write_application(application.clone());
                    self.inner.emit_audit(
                        EntityKind::Application,
                        application.id,
                        "application.rejected",
                        actor,
                    );
                }
                ApplicationStatus::Accepted => {
                    // The match is void; the donor goes back to the pool.
                    self.inner.directory.release(application.candidate_id.as_str());
                }
                ApplicationStatus::Rejected => {}
            }
        }

        request.status = RequestStatus::Cancelled;
        request.log_stage("cancelled", None, now);
        self.inner.store.write_request(request.clone());
        self.inner
            .emit_audit(EntityKind::Request, request_id, "request.cancelled", actor);
        tracing::info!(request_id = %request_id, "organ request cancelled");
        Ok(request)
    }
}
