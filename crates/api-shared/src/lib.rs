//! # API Shared
//!
//! Shared wire types for TMC APIs.
//!
//! Contains:
//! - Request/response DTOs (`dto` module), the strict wire model for the
//!   REST surface with translation from the engine's domain types
//! - The shared `HealthService`
//!
//! The wire model keeps timestamps as RFC 3339 strings and ids as strings, so
//! the engine's internal representation can evolve without breaking clients.

pub mod dto;
pub mod health;

pub use health::HealthService;
pub use dto::*;
