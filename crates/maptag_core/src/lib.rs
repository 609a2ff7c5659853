//! Core domain logic for MapTag address registration.
//! This crate is the single source of truth for business invariants.

pub mod codegen;
pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scoring;
pub mod service;

pub use codegen::{validate_code, AddressCode, CodeFormatError, RandomSuffix, SuffixSource};
pub use config::{CodeGenerationConfig, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::address::{Address, AddressId, AddressValidationError, VerificationStatus};
pub use model::duplicate::{DuplicateMatch, DuplicateReport, ReviewCandidate};
pub use model::verification::{
    QueueItemId, QueueStatus, VerificationAction, VerificationOutcome, VerificationQueueItem,
};
pub use repo::address_repo::{
    AddressPage, AddressRepository, AddressSearchQuery, ProximityQuery, SqliteAddressRepository,
};
pub use repo::report_repo::{DuplicateReportRepository, SqliteDuplicateReportRepository};
pub use repo::verification_repo::{
    QueueEntry, QueueListQuery, SqliteVerificationRepository, VerificationRepository,
    VerificationStats,
};
pub use repo::{AddressLookup, RepoError, RepoResult};
pub use scoring::{name_similarity, CompositeScore, DuplicateDetectionConfig};
pub use service::address_service::{
    AddressService, AddressServiceError, CreateAddressRequest, CreatedAddress, ShareLinks,
};
pub use service::duplicate_detector::{DuplicateCheck, DuplicateDetector};
pub use service::report_service::{ReportService, ReportServiceError};
pub use service::staged_photo::StagedPhoto;
pub use service::verification_service::{
    BatchOutcome, ProcessedItem, VerificationError, VerificationService,
};
pub use service::ErrorKind;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
