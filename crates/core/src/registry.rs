//! Application registry: candidate intake and review.
//!
//! Intake is append-only; an application only ever changes status once, to
//! its terminal decision. Listing is in stable submission order — the score
//! is advisory, display-only, and never an ordering key, so an
//! earlier-submitted lower-score candidate is never hidden from review.

use std::sync::Arc;

use chrono::Utc;
use tmc_types::{CompatibilityScore, NonEmptyText};
use uuid::Uuid;

use crate::application::{Application, ApplicationStatus};
use crate::collaborators::CandidateDirectory;
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult, EntityKind};

pub struct ApplicationRegistry {
    inner: Arc<EngineInner>,
}

impl ApplicationRegistry {
    pub(crate) fn new(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    /// Submits a candidate application against a request.
    ///
    /// The compatibility score is computed by an external matching
    /// collaborator and validated only for range here. The candidate
    /// directory is consulted for basic admissibility; a candidate it does
    /// not know is admissible (the directory is advisory).
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the request id is unknown.
    /// - `EngineError::Validation` when the candidate id is blank, the score
    ///   is outside [0, 100], or the directory flags the candidate as
    ///   ineligible.
    /// - `EngineError::Conflict` when the request no longer accepts
    ///   applications (matched, cancelled or completed) or the candidate is
    ///   locked to another match.
    pub fn submit(
        &self,
        actor: &str,
        request_id: Uuid,
        candidate_id: &str,
        compatibility_score: f64,
    ) -> EngineResult<Application> {
        let candidate_id = NonEmptyText::new(candidate_id)
            .map_err(|_| EngineError::Validation("candidate id is required".into()))?;
        let score = CompatibilityScore::new(compatibility_score)?;

        let lock = self.inner.store.request_lock(request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let request = self.inner.store.read_request(request_id)?;
        if !request.status.accepts_applications() {
            return Err(EngineError::Conflict {
                entity: EntityKind::Request,
                id: request_id.to_string(),
                status: request.status.to_string(),
                operation: "submit an application to",
            });
        }

        if let Some(profile) = self.inner.directory.lookup(candidate_id.as_str()) {
            if !profile.eligible {
                return Err(EngineError::Validation(format!(
                    "candidate {candidate_id} is not medically eligible"
                )));
            }
            if profile.locked {
                return Err(EngineError::Conflict {
                    entity: EntityKind::Candidate,
                    id: candidate_id.to_string(),
                    status: "locked".into(),
                    operation: "submit an application for",
                });
            }
        }

        let application = Application::submit(
            request_id,
            candidate_id,
            score,
            self.inner.store.next_intake_sequence(),
            Utc::now(),
        );
        self.inner.store.insert_application(application.clone());
        self.inner.emit_audit(
            EntityKind::Application,
            application.id,
            "application.submitted",
            actor,
        );
        tracing::info!(
            application_id = %application.id,
            request_id = %request_id,
            candidate_id = %application.candidate_id,
            "application submitted"
        );
        Ok(application)
    }

    /// All applications for a request, submission time ascending.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` when the request id is unknown.
    pub fn list_for(&self, request_id: Uuid) -> EngineResult<Vec<Application>> {
        self.inner.store.read_request(request_id)?;
        Ok(self.inner.store.applications_for(request_id))
    }

    /// Rejects a still-pending application.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the application id is unknown.
    /// - `EngineError::Conflict` when the application already carries a
    ///   terminal decision.
    pub fn reject(
        &self,
        actor: &str,
        application_id: Uuid,
        reason: Option<String>,
    ) -> EngineResult<Application> {
        let found = self.inner.store.read_application(application_id)?;
        let lock = self.inner.store.request_lock(found.request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        // Re-read under the lock; a concurrent authorize may have decided it.
        let mut application = self.inner.store.read_application(application_id)?;
        if application.status != ApplicationStatus::Pending {
            return Err(EngineError::Conflict {
                entity: EntityKind::Application,
                id: application_id.to_string(),
                status: application.status.to_string(),
                operation: "reject",
            });
        }

        application.status = ApplicationStatus::Rejected;
        application.rejection_reason = reason;
        self.inner.store.write_application(application.clone());
        self.inner.emit_audit(
            EntityKind::Application,
            application_id,
            "application.rejected",
            actor,
        );
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use crate::collaborators::CandidateProfile;
    use crate::testutil::{harness, sample_input, Harness};
    use crate::{ApplicationStatus, EngineError};

    #[test]
    fn test_submit_validates_score_range() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();

        for bad in [-1.0, 100.5] {
            assert!(matches!(
                engine.registry().submit("c", request.id, "cand-1", bad),
                Err(EngineError::Validation(_))
            ));
        }
        assert!(engine
            .registry()
            .submit("c", request.id, "cand-1", 100.0)
            .is_ok());
    }

    #[test]
    fn test_submit_requires_and_trims_candidate_id() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();

        assert!(matches!(
            engine.registry().submit("c", request.id, "   ", 50.0),
            Err(EngineError::Validation(_))
        ));

        let application = engine
            .registry()
            .submit("c", request.id, "  cand-1  ", 50.0)
            .unwrap();
        assert_eq!(application.candidate_id.as_str(), "cand-1");
    }

    #[test]
    fn test_submit_to_unknown_request_is_not_found() {
        let Harness { engine, .. } = harness();
        assert!(matches!(
            engine
                .registry()
                .submit("c", uuid::Uuid::new_v4(), "cand-1", 50.0),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_submit_closed_after_cancellation() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        engine.lifecycle().cancel("hosp-admin", request.id).unwrap();

        assert!(matches!(
            engine.registry().submit("c", request.id, "cand-1", 50.0),
            Err(EngineError::Conflict { .. })
        ));
    }

    #[test]
    fn test_directory_flags_gate_intake() {
        let Harness {
            engine, directory, ..
        } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();

        directory.register(CandidateProfile {
            candidate_id: "cand-ineligible".into(),
            blood_type: "AB+".into(),
            eligible: false,
            locked: false,
        });
        assert!(matches!(
            engine
                .registry()
                .submit("c", request.id, "cand-ineligible", 50.0),
            Err(EngineError::Validation(_))
        ));

        directory.register(CandidateProfile {
            candidate_id: "cand-locked".into(),
            blood_type: "AB+".into(),
            eligible: true,
            locked: true,
        });
        assert!(matches!(
            engine.registry().submit("c", request.id, "cand-locked", 50.0),
            Err(EngineError::Conflict { .. })
        ));

        // Unknown to the directory: admissible.
        assert!(engine
            .registry()
            .submit("c", request.id, "cand-unknown", 50.0)
            .is_ok());
    }

    #[test]
    fn test_list_for_keeps_submission_order() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        engine.registry().submit("c", request.id, "first", 10.0).unwrap();
        engine.registry().submit("c", request.id, "second", 99.0).unwrap();
        engine.registry().submit("c", request.id, "third", 50.0).unwrap();

        let listed = engine.registry().list_for(request.id).unwrap();
        let order: Vec<&str> = listed.iter().map(|a| a.candidate_id.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reject_is_terminal() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let application = engine
            .registry()
            .submit("c", request.id, "cand-1", 50.0)
            .unwrap();

        let rejected = engine
            .registry()
            .reject("hosp-admin", application.id, Some("blood type mismatch".into()))
            .unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("blood type mismatch")
        );

        assert!(matches!(
            engine.registry().reject("hosp-admin", application.id, None),
            Err(EngineError::Conflict { .. })
        ));
    }
}
