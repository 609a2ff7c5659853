//! Duplicate detection over persisted addresses.
//!
//! # Responsibility
//! - Run the proximity lookup and score each nearby address.
//! - Rank candidates by composite probability.
//!
//! # Invariants
//! - Read-only: detection never mutates storage.
//! - Results are sorted by composite score descending, nearest first on ties.

use crate::model::address::{normalize_category, validate_radius, AddressId};
use crate::model::duplicate::DuplicateMatch;
use crate::repo::address_repo::{AddressRepository, ProximityQuery};
use crate::repo::RepoResult;
use crate::scoring::DuplicateDetectionConfig;
use log::info;
use std::cmp::Ordering;
use std::time::Instant;

/// Submission being checked against existing addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCheck {
    pub latitude: f64,
    pub longitude: f64,
    pub place_name: String,
    /// `None` is scored as the default category.
    pub category: Option<String>,
    /// Overrides the configured radius for this check.
    pub radius_m: Option<f64>,
    /// Address to ignore, e.g. the record being updated.
    pub exclude_id: Option<AddressId>,
}

impl DuplicateCheck {
    pub fn new(latitude: f64, longitude: f64, place_name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            place_name: place_name.into(),
            category: None,
            radius_m: None,
            exclude_id: None,
        }
    }
}

/// Scores nearby addresses with a `DuplicateDetectionConfig`.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: DuplicateDetectionConfig,
}

impl DuplicateDetector {
    pub fn new(config: DuplicateDetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DuplicateDetectionConfig {
        &self.config
    }

    /// Returns every address within the radius, scored and ranked.
    ///
    /// Fails with `RepoError::Validation` when the effective radius (the
    /// check's override, else the configured one) is negative or not finite.
    pub fn detect<R>(&self, repo: &R, check: &DuplicateCheck) -> RepoResult<Vec<DuplicateMatch>>
    where
        R: AddressRepository + ?Sized,
    {
        let started_at = Instant::now();
        let radius_m = check.radius_m.unwrap_or(self.config.radius_m);
        validate_radius(radius_m)?;
        let nearby = repo.find_nearby(&ProximityQuery {
            latitude: check.latitude,
            longitude: check.longitude,
            radius_m,
            exclude_id: check.exclude_id,
        })?;

        let submitted_category = normalize_category(check.category.as_deref());
        let mut matches: Vec<DuplicateMatch> = nearby
            .into_iter()
            .map(|candidate| {
                let scores = self.config.score(
                    candidate.distance_m,
                    &check.place_name,
                    &candidate.address.place_name,
                    &submitted_category,
                    &candidate.address.category,
                );
                DuplicateMatch {
                    address: candidate.address,
                    distance_m: candidate.distance_m,
                    scores,
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.scores
                .composite
                .partial_cmp(&a.scores.composite)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    a.distance_m
                        .partial_cmp(&b.distance_m)
                        .unwrap_or(Ordering::Equal)
                })
        });

        info!(
            "event=duplicate_check module=detector status=ok candidates={} likely={} duration_ms={}",
            matches.len(),
            matches.iter().filter(|m| m.is_likely_duplicate()).count(),
            started_at.elapsed().as_millis()
        );
        Ok(matches)
    }
}
