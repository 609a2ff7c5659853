//! Duplicate report use-cases and the review feed.

use super::ErrorKind;
use crate::codegen::{AddressCode, CodeFormatError};
use crate::geo::haversine_m;
use crate::model::address::{Address, AddressId};
use crate::model::duplicate::{DuplicateReport, ReviewCandidate};
use crate::repo::report_repo::{DuplicateReportRepository, REVIEW_FEED_DEFAULT_LIMIT};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

const REVIEW_FEED_LIMIT_MAX: u32 = 500;

/// Errors from report use-cases.
#[derive(Debug)]
pub enum ReportServiceError {
    InvalidCode(CodeFormatError),
    /// An address cannot be reported as a duplicate of itself.
    SelfReport(AddressId),
    InvalidDistance(f64),
    /// Unknown address id or code.
    NotFound(String),
    Repo(RepoError),
}

impl ReportServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCode(_) | Self::SelfReport(_) | Self::InvalidDistance(_) => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for ReportServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCode(err) => write!(f, "{err}"),
            Self::SelfReport(id) => write!(f, "address {id} cannot duplicate itself"),
            Self::InvalidDistance(value) => {
                write!(f, "distance must be a non-negative number, got {value}")
            }
            Self::NotFound(key) => write!(f, "address not found: {key}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReportServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCode(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::SelfReport(_) | Self::InvalidDistance(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<CodeFormatError> for ReportServiceError {
    fn from(value: CodeFormatError) -> Self {
        Self::InvalidCode(value)
    }
}

impl From<RepoError> for ReportServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::AddressNotFound(id) => Self::NotFound(id.to_string()),
            other => Self::Repo(other),
        }
    }
}

/// Duplicate report use-case service.
pub struct ReportService<R: DuplicateReportRepository> {
    repo: R,
}

impl<R: DuplicateReportRepository> ReportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends a report between two existing addresses.
    pub fn report_duplicate(
        &self,
        address_id: AddressId,
        reported_duplicate_id: AddressId,
        distance_meters: f64,
    ) -> Result<DuplicateReport, ReportServiceError> {
        if address_id == reported_duplicate_id {
            return Err(ReportServiceError::SelfReport(address_id));
        }
        if !distance_meters.is_finite() || distance_meters < 0.0 {
            return Err(ReportServiceError::InvalidDistance(distance_meters));
        }

        let report = self
            .repo
            .record_report(address_id, reported_duplicate_id, distance_meters)?;
        info!(
            "event=duplicate_report module=report status=ok report_id={} address_id={}",
            report.id, report.address_id
        );
        Ok(report)
    }

    /// Resolves both codes and records a report with their great-circle distance.
    pub fn report_by_code(
        &self,
        code: &str,
        duplicate_code: &str,
    ) -> Result<DuplicateReport, ReportServiceError> {
        AddressCode::parse(code)?;
        AddressCode::parse(duplicate_code)?;

        let address = self.resolve_code(code)?;
        let duplicate = self.resolve_code(duplicate_code)?;
        let distance = haversine_m(
            address.latitude,
            address.longitude,
            duplicate.latitude,
            duplicate.longitude,
        );
        self.report_duplicate(address.id, duplicate.id, distance)
    }

    /// Pending addresses with reports, most reported first.
    ///
    /// `limit` defaults to 50.
    pub fn review_feed(&self, limit: Option<u32>) -> Result<Vec<ReviewCandidate>, ReportServiceError> {
        let limit = limit
            .unwrap_or(REVIEW_FEED_DEFAULT_LIMIT)
            .min(REVIEW_FEED_LIMIT_MAX);
        Ok(self.repo.addresses_needing_review(limit)?)
    }

    pub fn reports_for(&self, address_id: AddressId) -> Result<Vec<DuplicateReport>, ReportServiceError> {
        if self.repo.get_address(address_id)?.is_none() {
            return Err(ReportServiceError::NotFound(address_id.to_string()));
        }
        Ok(self.repo.list_reports(address_id)?)
    }

    fn resolve_code(&self, code: &str) -> Result<Address, ReportServiceError> {
        self.repo
            .get_address_by_code(code)?
            .ok_or_else(|| ReportServiceError::NotFound(code.to_string()))
    }
}
