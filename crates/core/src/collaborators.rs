//! External collaborator seams.
//!
//! The engine consumes three external interfaces: the candidate directory
//! (eligibility flags and donor locking), the notification dispatcher
//! (fire-and-forget transition events) and the audit sink (immutable activity
//! entries). Default implementations log through `tracing`; in-memory
//! implementations back the test suite and development runs.
//!
//! Confidential medical data is deliberately absent from these seams: the
//! engine only ever carries candidate ids, never the records behind them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult, EntityKind};

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// One immutable activity entry, emitted for every state transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity_type: EntityKind,
    pub entity_id: String,
    /// Action label, e.g. `request.matched` or `application.rejected`.
    pub action: String,
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied actor id; the engine is stateless regarding identity.
    pub actor: String,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Default audit sink: structured log lines consumed by reporting.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            action = %entry.action,
            actor = %entry.actor,
            "audit"
        );
    }
}

/// In-memory audit sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Engine-emitted transition events.
///
/// Delivery is a collaborator concern: the engine emits and moves on, never
/// blocking on or propagating delivery failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    Matched {
        request_id: Uuid,
        application_id: Uuid,
        transplant_id: Uuid,
    },
    TransplantCompleted {
        request_id: Uuid,
        transplant_id: Uuid,
        success: bool,
    },
    SlaBreached {
        request_id: Uuid,
        reason: String,
    },
}

pub trait NotificationDispatcher: Send + Sync {
    /// Fire-and-forget dispatch. Implementations must not block the caller
    /// on delivery confirmation; failures are theirs to log and absorb.
    fn dispatch(&self, event: EngineEvent);
}

/// Default dispatcher: logs the event for an external subscriber to pick up.
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn dispatch(&self, event: EngineEvent) {
        tracing::info!(?event, "engine event");
    }
}

/// In-memory dispatcher for tests.
#[derive(Default)]
pub struct MemoryDispatcher {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn dispatch(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

// ---------------------------------------------------------------------------
// Candidate directory
// ---------------------------------------------------------------------------

/// Basic profile the candidate directory exposes for intake validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: String,
    pub blood_type: String,
    pub eligible: bool,
    /// Set while the candidate is committed to an authorized match.
    pub locked: bool,
}

/// Directory of candidates, owned by an external collaborator.
///
/// `lookup` returning `None` means the directory has no opinion on the
/// candidate; intake treats that as admissible since the directory is an
/// opaque advisory source.
pub trait CandidateDirectory: Send + Sync {
    fn lookup(&self, candidate_id: &str) -> Option<CandidateProfile>;

    /// Marks the candidate unavailable for further applications. Called
    /// inside the authorize commit; a failure here aborts the whole match.
    fn lock(&self, candidate_id: &str) -> EngineResult<()>;

    /// Returns a locked candidate to the available pool (request cancelled).
    fn release(&self, candidate_id: &str);
}

/// In-memory candidate directory for tests and development.
#[derive(Default)]
pub struct InMemoryDirectory {
    candidates: Mutex<HashMap<String, CandidateProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a candidate profile.
    pub fn register(&self, profile: CandidateProfile) {
        let mut candidates = self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        candidates.insert(profile.candidate_id.clone(), profile);
    }
}

impl CandidateDirectory for InMemoryDirectory {
    fn lookup(&self, candidate_id: &str) -> Option<CandidateProfile> {
        let candidates = self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        candidates.get(candidate_id).cloned()
    }

    fn lock(&self, candidate_id: &str) -> EngineResult<()> {
        let mut candidates = self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match candidates.get_mut(candidate_id) {
            Some(profile) if profile.locked => Err(EngineError::Conflict {
                entity: EntityKind::Candidate,
                id: candidate_id.to_owned(),
                status: "locked".into(),
                operation: "lock",
            }),
            Some(profile) => {
                profile.locked = true;
                Ok(())
            }
            // Unknown to the directory: record the lock so a later release
            // has something to act on.
            None => {
                candidates.insert(
                    candidate_id.to_owned(),
                    CandidateProfile {
                        candidate_id: candidate_id.to_owned(),
                        blood_type: String::new(),
                        eligible: true,
                        locked: true,
                    },
                );
                Ok(())
            }
        }
    }

    fn release(&self, candidate_id: &str) {
        let mut candidates = self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(profile) = candidates.get_mut(candidate_id) {
            profile.locked = false;
        }
    }
}
