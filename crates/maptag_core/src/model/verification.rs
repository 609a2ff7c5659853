//! Verification queue model and the review action table.
//!
//! # Invariants
//! - Queue items start `pending` with confidence 0.
//! - `completed` is reached only through a `VerificationAction`.
//! - `processing` is reserved and never produced by core.

use super::address::{VerificationStatus, MAX_CONFIDENCE};
use super::AddressId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a verification queue item.
pub type QueueItemId = Uuid;

/// Verification type assigned to items enqueued at creation.
pub const DEFAULT_VERIFICATION_TYPE: &str = "photo_match";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
}

impl QueueStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Processing, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// Pending review task linked to one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationQueueItem {
    pub id: QueueItemId,
    pub address_id: AddressId,
    pub verification_type: String,
    pub status: QueueStatus,
    /// Resolved confidence recorded when the item completes.
    pub ai_confidence: f64,
    pub created_at: i64,
    pub processed_at: Option<i64>,
}

/// Review action. Closed set; any other tag is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationAction {
    Approve,
    Reject,
    Flag,
}

impl VerificationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Flag => "flag",
        }
    }

    /// Address status produced by this action.
    pub fn target_status(self) -> VerificationStatus {
        match self {
            Self::Approve => VerificationStatus::Verified,
            Self::Reject => VerificationStatus::Rejected,
            Self::Flag => VerificationStatus::Flagged,
        }
    }

    /// Confidence used when the reviewer supplies none.
    pub fn default_confidence(self) -> u8 {
        match self {
            Self::Approve => 95,
            Self::Reject => 0,
            Self::Flag => 25,
        }
    }

    /// Resolves the status/confidence pair applied to queue item and address.
    ///
    /// A supplied confidence overrides the default for `approve` and `flag`;
    /// `reject` always resolves to 0.
    pub fn resolve(
        self,
        supplied_confidence: Option<u8>,
    ) -> Result<VerificationOutcome, VerificationInputError> {
        if let Some(value) = supplied_confidence {
            if value > MAX_CONFIDENCE {
                return Err(VerificationInputError::ConfidenceOutOfRange(value));
            }
        }

        let confidence = match self {
            Self::Reject => 0,
            Self::Approve | Self::Flag => {
                supplied_confidence.unwrap_or_else(|| self.default_confidence())
            }
        };

        Ok(VerificationOutcome {
            action: self,
            status: self.target_status(),
            confidence,
        })
    }
}

impl FromStr for VerificationAction {
    type Err = VerificationInputError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "flag" => Ok(Self::Flag),
            _ => Err(VerificationInputError::UnknownAction(s.to_string())),
        }
    }
}

/// Status/confidence pair written by one review decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub action: VerificationAction,
    pub status: VerificationStatus,
    pub confidence: u8,
}

/// Review input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationInputError {
    UnknownAction(String),
    ConfidenceOutOfRange(u8),
    EmptyBatch,
}

impl Display for VerificationInputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAction(action) => write!(
                f,
                "invalid action `{action}`; must be approve, reject, or flag"
            ),
            Self::ConfidenceOutOfRange(value) => {
                write!(f, "confidence score {value} must be between 0 and {MAX_CONFIDENCE}")
            }
            Self::EmptyBatch => write!(f, "queue_ids must be a non-empty list"),
        }
    }
}

impl Error for VerificationInputError {}
