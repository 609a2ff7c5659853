//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Classify failures into transport-neutral `ErrorKind`s.
//!
//! # Invariants
//! - Validation happens before any repository write.
//! - Services remain storage-agnostic; they only see repository traits.

pub mod address_service;
pub mod duplicate_detector;
pub mod report_service;
pub mod staged_photo;
pub mod verification_service;

use serde::Serialize;

/// Failure classes shared by every service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input; nothing was changed.
    Validation,
    /// Likely duplicate, or a code race that could not be resolved.
    Conflict,
    NotFound,
    /// Code uniqueness retry bound reached.
    Exhaustion,
    Persistence,
    /// An atomic unit of work failed and was rolled back.
    Transaction,
}

impl ErrorKind {
    /// Status code an HTTP adapter should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Exhaustion | Self::Persistence | Self::Transaction => 500,
        }
    }
}
