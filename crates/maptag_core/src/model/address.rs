//! Address domain model.
//!
//! # Responsibility
//! - Define the registered address record and its verification status.
//! - Validate coordinates, place names and confidence values.
//!
//! # Invariants
//! - `code` is assigned once at creation and never changes.
//! - `latitude` ∈ [-90, 90], `longitude` ∈ [-180, 180]; new addresses must
//!   additionally fall inside `geo::COUNTRY_BOUNDS`.
//! - `confidence_score` ∈ [0, 100].

use crate::geo::COUNTRY_BOUNDS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable row identifier for an address.
pub type AddressId = Uuid;

/// Category substituted when a submission carries none.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Upper bound of `confidence_score`.
pub const MAX_CONFIDENCE: u8 = 100;

/// Review state of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    Flagged,
}

impl VerificationStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Verified, Self::Rejected, Self::Flagged];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Flagged => "flagged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// Validation failures for address input.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressValidationError {
    /// Latitude or longitude is NaN or infinite.
    NonFiniteCoordinate,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    /// Valid on the globe, but outside the supported country region.
    OutsideCountry { latitude: f64, longitude: f64 },
    BlankPlaceName,
    ConfidenceOutOfRange(u8),
    /// Search or duplicate radius is negative, NaN or infinite.
    InvalidRadius(f64),
}

impl Display for AddressValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteCoordinate => {
                write!(f, "latitude and longitude must be valid numbers")
            }
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude {value} must be between -90 and 90")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude {value} must be between -180 and 180")
            }
            Self::OutsideCountry {
                latitude,
                longitude,
            } => write!(
                f,
                "coordinates ({latitude}, {longitude}) are outside Burkina Faso boundaries"
            ),
            Self::BlankPlaceName => write!(f, "place name must not be blank"),
            Self::ConfidenceOutOfRange(value) => {
                write!(f, "confidence score {value} must be between 0 and {MAX_CONFIDENCE}")
            }
            Self::InvalidRadius(value) => {
                write!(f, "radius {value} must be a finite, non-negative number of meters")
            }
        }
    }
}

impl Error for AddressValidationError {}

/// Checks that a point is a valid position on the globe.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AddressValidationError> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(AddressValidationError::NonFiniteCoordinate);
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AddressValidationError::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AddressValidationError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

pub fn validate_radius(radius_m: f64) -> Result<(), AddressValidationError> {
    if radius_m.is_finite() && radius_m >= 0.0 {
        Ok(())
    } else {
        Err(AddressValidationError::InvalidRadius(radius_m))
    }
}

/// Checks global validity and the country region used at creation time.
pub fn validate_creation_coordinates(
    latitude: f64,
    longitude: f64,
) -> Result<(), AddressValidationError> {
    validate_coordinates(latitude, longitude)?;
    if !COUNTRY_BOUNDS.contains(latitude, longitude) {
        return Err(AddressValidationError::OutsideCountry {
            latitude,
            longitude,
        });
    }
    Ok(())
}

/// Trims a category and substitutes `DEFAULT_CATEGORY` when absent or blank.
pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

/// Canonical registered address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Public `BF-CCC-GGGG-XXXX` identifier.
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_name: String,
    pub category: String,
    pub verification_status: VerificationStatus,
    pub confidence_score: u8,
    /// Reference returned by image storage, if a photo was attached.
    pub photo_ref: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Address {
    /// Validates invariants that must hold for any persisted address.
    pub fn validate(&self) -> Result<(), AddressValidationError> {
        validate_coordinates(self.latitude, self.longitude)?;
        if self.place_name.trim().is_empty() {
            return Err(AddressValidationError::BlankPlaceName);
        }
        if self.confidence_score > MAX_CONFIDENCE {
            return Err(AddressValidationError::ConfidenceOutOfRange(
                self.confidence_score,
            ));
        }
        Ok(())
    }
}
