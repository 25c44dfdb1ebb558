//! In-memory logical layout of the engine's persisted state.
//!
//! Three collections (`organ_requests`, `applications`, `transplants`) plus a
//! per-request lock registry. Physical persistence technology is out of scope
//! for the engine; this store defines the logical layout and the locking
//! discipline a durable backend would have to preserve.
//!
//! # Locking discipline
//!
//! All mutating operations on one organ request must run under that request's
//! lock (obtained via [`EngineStore::request_lock`]), including operations on
//! its applications and its transplant. Different requests proceed
//! concurrently. Collection-level locks below are only ever held for the
//! duration of a single read or write, never across an external call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use uuid::Uuid;

use crate::application::Application;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::request::OrganRequest;
use crate::transplant::Transplant;

#[derive(Default)]
pub struct EngineStore {
    requests: RwLock<HashMap<Uuid, OrganRequest>>,
    applications: RwLock<HashMap<Uuid, Application>>,
    transplants: RwLock<HashMap<Uuid, Transplant>>,
    request_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    intake_sequence: AtomicU64,
}

impl EngineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the serialization lock for one request, creating it on first
    /// use. Callers hold the returned mutex for the whole mutating operation.
    pub fn request_lock(&self, request_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .request_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(request_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Next application intake sequence number (store-wide, monotonic).
    pub fn next_intake_sequence(&self) -> u64 {
        self.intake_sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    // -- organ_requests ------------------------------------------------------

    pub fn insert_request(&self, request: OrganRequest) {
        let mut requests = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        requests.insert(request.id, request);
    }

    pub fn read_request(&self, request_id: Uuid) -> EngineResult<OrganRequest> {
        let requests = self.requests.read().unwrap_or_else(PoisonError::into_inner);
        requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                entity: EntityKind::Request,
                id: request_id.to_string(),
            })
    }

    /// Replaces the stored request. The caller must hold the request lock.
    pub fn write_request(&self, request: OrganRequest) {
        self.insert_request(request);
    }

    // -- applications --------------------------------------------------------

    pub fn insert_application(&self, application: Application) {
        let mut applications = self
            .applications
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        applications.insert(application.id, application);
    }

    pub fn read_application(&self, application_id: Uuid) -> EngineResult<Application> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        applications
            .get(&application_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                entity: EntityKind::Application,
                id: application_id.to_string(),
            })
    }

    /// Replaces a stored application. The caller must hold the parent
    /// request's lock.
    pub fn write_application(&self, application: Application) {
        self.insert_application(application);
    }

    /// All applications for one request, in stable submission order
    /// (submission time ascending, intake sequence as tie-breaker). Never
    /// ordered by score: score is advisory and display-only.
    pub fn applications_for(&self, request_id: Uuid) -> Vec<Application> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<Application> = applications
            .values()
            .filter(|a| a.request_id == request_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.submitted_at, a.sequence));
        found
    }

    // -- transplants ---------------------------------------------------------

    pub fn insert_transplant(&self, transplant: Transplant) {
        let mut transplants = self
            .transplants
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        transplants.insert(transplant.id, transplant);
    }

    pub fn read_transplant(&self, transplant_id: Uuid) -> EngineResult<Transplant> {
        let transplants = self
            .transplants
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        transplants
            .get(&transplant_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                entity: EntityKind::Transplant,
                id: transplant_id.to_string(),
            })
    }

    /// Replaces a stored transplant. The caller must hold the parent
    /// request's lock.
    pub fn write_transplant(&self, transplant: Transplant) {
        self.insert_transplant(transplant);
    }

    /// The transplants referencing one request. The exactly-once authorize
    /// property keeps this at zero or one; exposed as a list so invariant
    /// violations would be visible rather than masked.
    pub fn transplants_for(&self, request_id: Uuid) -> Vec<Transplant> {
        let transplants = self
            .transplants
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        transplants
            .values()
            .filter(|t| t.request_id == request_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{NewOrganRequest, UrgencyLevel};
    use chrono::{Duration, Utc};
    use tmc_types::{CompatibilityScore, NonEmptyText};

    fn sample_request() -> OrganRequest {
        OrganRequest::create(
            NewOrganRequest {
                hospital_id: "hosp-1".into(),
                patient_name: "Amara Nwosu".into(),
                patient_age: 41,
                blood_type: "O-".into(),
                organ_type: "kidney".into(),
                urgency: UrgencyLevel::High,
                medical_condition: "ESRD".into(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_read_unknown_request_is_not_found() {
        let store = EngineStore::new();
        match store.read_request(Uuid::new_v4()) {
            Err(EngineError::NotFound { entity, .. }) => {
                assert_eq!(entity, EntityKind::Request);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_applications_sorted_by_submission_not_score() {
        let store = EngineStore::new();
        let request = sample_request();
        let request_id = request.id;
        store.insert_request(request);

        let base = Utc::now();
        for (offset, score) in [(0, 40.0), (1, 95.0), (2, 10.0)] {
            let application = Application::submit(
                request_id,
                NonEmptyText::new(format!("cand-{offset}")).unwrap(),
                CompatibilityScore::new(score).unwrap(),
                store.next_intake_sequence(),
                base + Duration::seconds(offset),
            );
            store.insert_application(application);
        }

        let listed = store.applications_for(request_id);
        let candidates: Vec<&str> = listed.iter().map(|a| a.candidate_id.as_str()).collect();
        assert_eq!(candidates, vec!["cand-0", "cand-1", "cand-2"]);
    }

    #[test]
    fn test_request_lock_is_shared_per_request() {
        let store = EngineStore::new();
        let id = Uuid::new_v4();
        let first = store.request_lock(id);
        let second = store.request_lock(id);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &store.request_lock(Uuid::new_v4())));
    }
}
