//! Match authorizer: accept one application, lock out all others.
//!
//! This is the engine's one hard transactional boundary. Under the parent
//! request's serialization lock, every fallible step (state checks, surgery
//! detail validation, the external donor-lock call) runs *before* any
//! in-memory mutation; the final apply step cannot fail. A failure at any
//! point therefore leaves no partial state, and the request lock makes the
//! operation exactly-once per request: a concurrent second authorization
//! observes the already-applied decision and fails with a conflict.

use std::sync::Arc;

use chrono::Utc;
use tmc_types::NonEmptyText;
use uuid::Uuid;

use crate::application::{Application, ApplicationStatus, SurgeryDetails};
use crate::collaborators::{CandidateDirectory, EngineEvent};
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::request::{OrganRequest, RequestStatus};
use crate::transplant::Transplant;

/// Everything an authorization produced, returned in one bundle so callers
/// never need a follow-up read.
#[derive(Clone, Debug)]
pub struct AuthorizedMatch {
    pub request: OrganRequest,
    pub application: Application,
    pub transplant: Transplant,
}

pub struct MatchAuthorizer {
    inner: Arc<EngineInner>,
}

impl MatchAuthorizer {
    pub(crate) fn new(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    /// Authorizes an application: accepts it with the surgery details, moves
    /// the request to `matched`, auto-rejects every other pending
    /// application, locks the donor, and creates the transplant record in
    /// `scheduled`.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` when the application id is unknown.
    /// - `EngineError::Conflict` when the application is no longer pending,
    ///   or the request is already matched or in progress, or the donor
    ///   cannot be locked.
    /// - `EngineError::InvalidState` when the request is already terminal
    ///   (cancelled or completed).
    /// - `EngineError::Validation` when any surgery detail field is blank.
    ///
    /// On any error, no state has changed.
    pub fn authorize(
        &self,
        actor: &str,
        application_id: Uuid,
        details: SurgeryDetails,
    ) -> EngineResult<AuthorizedMatch> {
        let found = self.inner.store.read_application(application_id)?;
        let lock = self.inner.store.request_lock(found.request_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        // Re-read under the lock: a concurrent authorize on a sibling
        // application may have decided this one in the meantime.
        let mut application = self.inner.store.read_application(application_id)?;
        if application.status != ApplicationStatus::Pending {
            return Err(EngineError::Conflict {
                entity: EntityKind::Application,
                id: application_id.to_string(),
                status: application.status.to_string(),
                operation: "authorize",
            });
        }

        validate_surgery_details(&details)?;

        let mut request = self.inner.store.read_request(application.request_id)?;
        if request.status.is_terminal() {
            return Err(EngineError::InvalidState {
                entity: EntityKind::Request,
                id: request.id.to_string(),
                from: request.status.to_string(),
                attempted: "matched".into(),
            });
        }
        if !request.status.is_matchable() {
            return Err(EngineError::Conflict {
                entity: EntityKind::Request,
                id: request.id.to_string(),
                status: request.status.to_string(),
                operation: "authorize a match on",
            });
        }

        // Last fallible step: the external donor lock. Nothing has been
        // mutated yet, so a failure here aborts cleanly.
        self.inner.directory.lock(application.candidate_id.as_str())?;

        // Commit point. Everything below is infallible in-memory apply.
        let now = Utc::now();
        let siblings = self.inner.store.applications_for(request.id);

        application.status = ApplicationStatus::Accepted;
        application.surgery_details = Some(details);
        self.inner.store.write_application(application.clone());

        for mut sibling in siblings {
            if sibling.id != application.id && sibling.status == ApplicationStatus::Pending {
                sibling.status = ApplicationStatus::Rejected;
                sibling.rejection_reason = Some("another application was accepted".into());
                self.inner.store.write_application(sibling.clone());
                self.inner.emit_audit(
                    EntityKind::Application,
                    sibling.id,
                    "application.auto-rejected",
                    actor,
                );
            }
        }

        request.status = RequestStatus::Matched;
        request.log_stage("matched", Some(format!("candidate {}", application.candidate_id)), now);
        self.inner.store.write_request(request.clone());

        let transplant = Transplant::schedule(request.id, application.id, now);
        self.inner.store.insert_transplant(transplant.clone());

        self.inner.emit_audit(
            EntityKind::Application,
            application.id,
            "application.accepted",
            actor,
        );
        self.inner
            .emit_audit(EntityKind::Request, request.id, "request.matched", actor);
        self.inner.emit_audit(
            EntityKind::Transplant,
            transplant.id,
            "transplant.scheduled",
            actor,
        );
        self.inner.emit_event(EngineEvent::Matched {
            request_id: request.id,
            application_id: application.id,
            transplant_id: transplant.id,
        });
        tracing::info!(
            request_id = %request.id,
            application_id = %application.id,
            transplant_id = %transplant.id,
            "match authorized"
        );

        Ok(AuthorizedMatch {
            request,
            application,
            transplant,
        })
    }
}

fn validate_surgery_details(details: &SurgeryDetails) -> EngineResult<()> {
    for (field, value) in [
        ("surgery scheduled date", &details.scheduled_date),
        ("surgeon name", &details.surgeon_name),
        ("operating room", &details.operating_room),
    ] {
        NonEmptyText::new(value)
            .map_err(|_| EngineError::Validation(format!("{field} is required")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::collaborators::{CandidateProfile, EngineEvent};
    use crate::testutil::{harness, sample_input, surgery_details, Harness};
    use crate::{ApplicationStatus, EngineError, RequestStatus};

    #[test]
    fn test_authorize_accepts_and_locks_out_siblings() {
        let Harness {
            engine, dispatcher, ..
        } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let first = engine.registry().submit("c", request.id, "cand-1", 40.0).unwrap();
        let second = engine.registry().submit("c", request.id, "cand-2", 90.0).unwrap();
        let third = engine.registry().submit("c", request.id, "cand-3", 70.0).unwrap();

        // Manual review rejects the second before authorization.
        engine
            .registry()
            .reject("hosp-admin", second.id, Some("withdrawn".into()))
            .unwrap();

        let authorized = engine
            .authorizer()
            .authorize("hosp-admin", first.id, surgery_details())
            .unwrap();

        assert_eq!(authorized.request.status, RequestStatus::Matched);
        assert_eq!(authorized.application.status, ApplicationStatus::Accepted);
        assert!(authorized.application.surgery_details.is_some());

        let third_after = engine.application(third.id).unwrap();
        assert_eq!(third_after.status, ApplicationStatus::Rejected);

        let transplants = engine.transplants_for(request.id);
        assert_eq!(transplants.len(), 1);
        assert_eq!(
            transplants[0].status,
            crate::TransplantStatus::Scheduled
        );

        assert!(dispatcher
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::Matched { .. })));
    }

    #[test]
    fn test_authorize_requires_complete_surgery_details() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let application = engine.registry().submit("c", request.id, "cand-1", 40.0).unwrap();

        let mut details = surgery_details();
        details.surgeon_name = " ".into();
        assert!(matches!(
            engine.authorizer().authorize("hosp-admin", application.id, details),
            Err(EngineError::Validation(_))
        ));

        // Nothing mutated by the failed attempt.
        assert_eq!(
            engine.application(application.id).unwrap().status,
            ApplicationStatus::Pending
        );
        assert_eq!(engine.request(request.id).unwrap().status, RequestStatus::Pending);
        assert!(engine.transplants_for(request.id).is_empty());
    }

    #[test]
    fn test_authorize_on_decided_application_conflicts() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let first = engine.registry().submit("c", request.id, "cand-1", 40.0).unwrap();
        let late = engine.registry().submit("c", request.id, "cand-2", 95.0).unwrap();

        engine
            .authorizer()
            .authorize("hosp-admin", first.id, surgery_details())
            .unwrap();

        // The late application was auto-rejected by the accepted match.
        assert!(matches!(
            engine
                .authorizer()
                .authorize("hosp-admin", late.id, surgery_details()),
            Err(EngineError::Conflict { .. })
        ));
        assert_eq!(engine.transplants_for(request.id).len(), 1);
    }

    #[test]
    fn test_authorize_on_terminal_request_is_invalid_state() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let application = engine
            .registry()
            .submit("c", request.id, "cand-1", 50.0)
            .unwrap();
        engine.lifecycle().cancel("hosp-admin", request.id).unwrap();

        // Cancellation rejects the application, so restore a stale pending
        // view to reach the request's terminal-state check.
        let mut stale = engine.application(application.id).unwrap();
        stale.status = ApplicationStatus::Pending;
        stale.rejection_reason = None;
        engine.inner.store.write_application(stale);

        assert!(matches!(
            engine
                .authorizer()
                .authorize("hosp-admin", application.id, surgery_details()),
            Err(EngineError::InvalidState { .. })
        ));
        assert_eq!(engine.request(request.id).unwrap().status, RequestStatus::Cancelled);
    }

    #[test]
    fn test_failed_donor_lock_leaves_no_partial_state() {
        let Harness {
            engine, directory, ..
        } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let application = engine.registry().submit("c", request.id, "cand-1", 40.0).unwrap();

        // The donor gets locked to another request between submission and
        // authorization.
        directory.register(CandidateProfile {
            candidate_id: "cand-1".into(),
            blood_type: "O-".into(),
            eligible: true,
            locked: true,
        });

        assert!(matches!(
            engine
                .authorizer()
                .authorize("hosp-admin", application.id, surgery_details()),
            Err(EngineError::Conflict { .. })
        ));

        assert_eq!(
            engine.application(application.id).unwrap().status,
            ApplicationStatus::Pending
        );
        assert_eq!(engine.request(request.id).unwrap().status, RequestStatus::Pending);
        assert!(engine.transplants_for(request.id).is_empty());
    }

    #[test]
    fn test_concurrent_authorize_race_is_exactly_once() {
        let Harness { engine, .. } = harness();
        let request = engine
            .lifecycle()
            .create_request("hosp-admin", sample_input())
            .unwrap();
        let first = engine.registry().submit("c", request.id, "cand-1", 40.0).unwrap();
        let second = engine.registry().submit("c", request.id, "cand-2", 60.0).unwrap();

        let engine = Arc::new(engine);
        let barrier = Arc::new(std::sync::Barrier::new(2));
        let mut handles = Vec::new();
        for application_id in [first.id, second.id] {
            let engine = engine.clone();
            let barrier = barrier.clone();
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                engine
                    .authorizer()
                    .authorize("hosp-admin", application_id, surgery_details())
            }));
        }

        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("authorize thread panicked"))
            .collect();

        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one authorization must win");
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(EngineError::Conflict { .. }))));
        assert_eq!(engine.transplants_for(request.id).len(), 1);
        assert_eq!(engine.request(request.id).unwrap().status, RequestStatus::Matched);

        let accepted = engine
            .registry()
            .list_for(request.id)
            .unwrap()
            .into_iter()
            .filter(|a| a.status == ApplicationStatus::Accepted)
            .count();
        assert_eq!(accepted, 1);
    }
}
