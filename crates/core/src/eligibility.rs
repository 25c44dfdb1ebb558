//! Pluggable eligibility predicate.
//!
//! The exact clinical eligibility rules are owned by the hospitals' policy
//! layer, not by this engine, so the check is a seam: the engine takes any
//! [`EligibilityPolicy`] and [`StandardEligibility`] is the minimal default
//! (complete patient data, plausible age).

use tmc_types::NonEmptyText;

use crate::error::{EngineError, EngineResult};
use crate::request::OrganRequest;

pub trait EligibilityPolicy: Send + Sync {
    /// Checks whether `request` carries the data needed to proceed to
    /// matching.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` naming the first missing or
    /// malformed field.
    fn check(&self, request: &OrganRequest) -> EngineResult<()>;
}

/// Minimal default policy: complete patient snapshot and a plausible age.
///
/// Urgency is well-formed by construction and needs no check here.
pub struct StandardEligibility;

impl EligibilityPolicy for StandardEligibility {
    fn check(&self, request: &OrganRequest) -> EngineResult<()> {
        for (field, value) in [
            ("patient name", &request.patient_name),
            ("patient blood type", &request.blood_type),
            ("organ type", &request.organ_type),
        ] {
            NonEmptyText::new(value).map_err(|_| {
                EngineError::Validation(format!(
                    "{field} is required for eligibility validation"
                ))
            })?;
        }
        if request.patient_age == 0 {
            return Err(EngineError::Validation(
                "patient age must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
