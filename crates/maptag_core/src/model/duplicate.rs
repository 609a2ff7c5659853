//! Duplicate detection results and user-filed duplicate reports.

use super::address::Address;
use super::AddressId;
use crate::scoring::CompositeScore;
use serde::{Deserialize, Serialize};

/// Row identifier for an append-only duplicate report.
pub type DuplicateReportId = i64;

/// Persisted address found by a proximity lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyAddress {
    pub address: Address,
    /// Great-circle distance to the query point.
    pub distance_m: f64,
}

/// Scored candidate returned by the duplicate detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub address: Address,
    pub distance_m: f64,
    pub scores: CompositeScore,
}

impl DuplicateMatch {
    /// Composite probability that this candidate is the same place.
    pub fn duplicate_probability(&self) -> f64 {
        self.scores.composite
    }

    pub fn is_likely_duplicate(&self) -> bool {
        self.scores.is_likely_duplicate
    }
}

/// User assertion that two addresses are the same place. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub id: DuplicateReportId,
    pub address_id: AddressId,
    pub reported_duplicate_id: AddressId,
    pub distance_meters: f64,
    pub created_at: i64,
}

/// Pending address with outstanding duplicate reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCandidate {
    pub address: Address,
    pub report_count: u32,
}
