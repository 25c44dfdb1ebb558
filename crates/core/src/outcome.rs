//! Transplant outcome recorder.
//!
//! Mirrors the operational checkpoints of the procedure: surgery start
//! (`in-progress`) and surgery completion (`completed`). Completion always
//! carries the outcome — there is no way to complete a transplant without
//! recording one — and the recorded outcome is immutable.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::collaborators::EngineEvent;
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::request::RequestStatus;
use crate::transplant::{Transplant, TransplantOutcome, TransplantStatus};

pub struct OutcomeRecorder {
    inner: Arc<EngineInner>,
}

impl OutcomeRecorder {
    pub(crate) fn new(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    /// Advances a transplant to the immediate successor status.
    ///
    /// Only `scheduled → in-progress` can be reached this way: completion
    /// goes through [`record_outcome`](Self::record_outcome) so a transplant
    /// can never be completed without an outcome.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the transplant id is unknown.
    /// - `EngineError::InvalidState` when `target` is not the immediate
    ///   successor of the current status.
    /// - `EngineError::Validation` when `target` is `completed` (an outcome
    ///   is required; use `record_outcome`).
    pub fn advance(
        &self,
        actor: &str,
        transplant_id: Uuid,
        target: TransplantStatus,
    ) -> EngineResult<Transplant> {
        let found = self.inner.store.read_transplant(transplant_id)?;
        let lock = self.inner.store.request_lock(found.request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut transplant = self.inner.store.read_transplant(transplant_id)?;
        if transplant.status.successor() != Some(target) {
            return Err(EngineError::InvalidState {
                entity: EntityKind::Transplant,
                id: transplant_id.to_string(),
                from: transplant.status.to_string(),
                attempted: target.to_string(),
            });
        }
        if target == TransplantStatus::Completed {
            return Err(EngineError::Validation(
                "completing a transplant requires an outcome; record one instead of advancing"
                    .into(),
            ));
        }

        let mut request = self.inner.store.read_request(transplant.request_id)?;
        if request.status.is_terminal() {
            return Err(EngineError::Conflict {
                entity: EntityKind::Request,
                id: request.id.to_string(),
                status: request.status.to_string(),
                operation: "advance the transplant of",
            });
        }

        let now = Utc::now();
        transplant.status = target;
        transplant.updated_at = now;
        self.inner.store.write_transplant(transplant.clone());

        // Surgery has started: the request follows.
        request.status = RequestStatus::InProgress;
        request.log_stage("in-progress", None, now);
        self.inner.store.write_request(request);

        self.inner.emit_audit(
            EntityKind::Transplant,
            transplant_id,
            "transplant.in-progress",
            actor,
        );
        self.inner.emit_audit(
            EntityKind::Request,
            transplant.request_id,
            "request.in-progress",
            actor,
        );
        Ok(transplant)
    }

    /// Records the terminal outcome, completing the transplant and its
    /// request.
    ///
    /// An unsuccessful outcome does not reopen the original request; that is
    /// a deliberate manual hospital decision (create a new request).
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the transplant id is unknown.
    /// - `EngineError::InvalidState` when the transplant is still
    ///   `scheduled` (surgery start was never logged).
    /// - `EngineError::Conflict` when an outcome was already recorded, or
    ///   the parent request has reached a terminal state in the meantime.
    pub fn record_outcome(
        &self,
        actor: &str,
        transplant_id: Uuid,
        outcome: TransplantOutcome,
    ) -> EngineResult<Transplant> {
        let found = self.inner.store.read_transplant(transplant_id)?;
        let lock = self.inner.store.request_lock(found.request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut transplant = self.inner.store.read_transplant(transplant_id)?;
        match transplant.status {
            TransplantStatus::Completed => {
                return Err(EngineError::Conflict {
                    entity: EntityKind::Transplant,
                    id: transplant_id.to_string(),
                    status: transplant.status.to_string(),
                    operation: "record an outcome for",
                });
            }
            TransplantStatus::Scheduled => {
                return Err(EngineError::InvalidState {
                    entity: EntityKind::Transplant,
                    id: transplant_id.to_string(),
                    from: transplant.status.to_string(),
                    attempted: "completed".into(),
                });
            }
            TransplantStatus::InProgress => {}
        }

        // A request cancelled mid-procedure stays cancelled; the outcome
        // cannot complete it after the fact.
        let mut request = self.inner.store.read_request(transplant.request_id)?;
        if request.status.is_terminal() {
            return Err(EngineError::Conflict {
                entity: EntityKind::Request,
                id: request.id.to_string(),
                status: request.status.to_string(),
                operation: "record a transplant outcome for",
            });
        }

        let now = Utc::now();
        let success = outcome.success;
        transplant.status = TransplantStatus::Completed;
        transplant.outcome = Some(outcome);
        transplant.updated_at = now;
        self.inner.store.write_transplant(transplant.clone());

        request.status = RequestStatus::Completed;
        request.log_stage(
            "completed",
            Some(if success {
                "transplant successful".into()
            } else {
                "transplant unsuccessful".into()
            }),
            now,
        );
        self.inner.store.write_request(request);

        self.inner.emit_audit(
            EntityKind::Transplant,
            transplant_id,
            "transplant.completed",
            actor,
        );
        self.inner.emit_audit(
            EntityKind::Request,
            transplant.request_id,
            "request.completed",
            actor,
        );
        self.inner.emit_event(EngineEvent::TransplantCompleted {
            request_id: transplant.request_id,
            transplant_id,
            success,
        });
        tracing::info!(transplant_id = %transplant_id, success, "transplant outcome recorded");
        Ok(transplant)
    }
}
