//! Verification review use-cases.
//!
//! # Responsibility
//! - Resolve review actions to a status/confidence outcome.
//! - Apply single and batch decisions atomically.
//! - Expose queue listings and review statistics.
//!
//! # Invariants
//! - Input is fully validated before the repository is touched.
//! - A failed batch leaves every listed item and address unchanged.

use super::ErrorKind;
use crate::model::address::{Address, AddressId};
use crate::model::now_epoch_ms;
use crate::model::verification::{
    QueueItemId, VerificationAction, VerificationInputError, VerificationOutcome,
};
use crate::repo::verification_repo::{
    QueueEntry, QueueListQuery, VerificationRepository, VerificationStats,
};
use crate::repo::RepoError;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from verification use-cases.
#[derive(Debug)]
pub enum VerificationError {
    Validation(VerificationInputError),
    NotFound(QueueItemId),
    /// A write failed part-way; the unit of work was rolled back.
    Transaction(RepoError),
    Repo(RepoError),
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transaction(_) => ErrorKind::Transaction,
            Self::Repo(_) => ErrorKind::Persistence,
        }
    }

    fn from_write(err: RepoError) -> Self {
        match err {
            RepoError::QueueItemNotFound(id) => Self::NotFound(id),
            other => Self::Transaction(other),
        }
    }
}

impl Display for VerificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "queue item not found: {id}"),
            Self::Transaction(err) => write!(f, "verification transaction failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VerificationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Transaction(err) | Self::Repo(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<VerificationInputError> for VerificationError {
    fn from(value: VerificationInputError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for VerificationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::QueueItemNotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Result of one processed queue item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedItem {
    pub queue_id: QueueItemId,
    pub address: Address,
    pub outcome: VerificationOutcome,
}

/// Result of a batch decision.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Number of distinct queue items completed.
    pub processed_count: usize,
    pub address_ids: Vec<AddressId>,
    pub outcome: VerificationOutcome,
}

/// Verification use-case service.
pub struct VerificationService<R: VerificationRepository> {
    repo: R,
}

impl<R: VerificationRepository> VerificationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Applies one review decision.
    ///
    /// Already completed items are processed again; the latest decision wins.
    pub fn process(
        &mut self,
        queue_id: QueueItemId,
        action: VerificationAction,
        confidence: Option<u8>,
    ) -> Result<ProcessedItem, VerificationError> {
        let started_at = Instant::now();
        let outcome = action.resolve(confidence)?;
        let address = self
            .repo
            .apply_outcome(queue_id, &outcome, now_epoch_ms())
            .map_err(|err| {
                warn!(
                    "event=verification_process module=verification status=error action={} error={err}",
                    action.as_str()
                );
                VerificationError::from_write(err)
            })?;

        info!(
            "event=verification_process module=verification status=ok action={} confidence={} duration_ms={}",
            action.as_str(),
            outcome.confidence,
            started_at.elapsed().as_millis()
        );
        Ok(ProcessedItem {
            queue_id,
            address,
            outcome,
        })
    }

    /// Applies one decision to every listed item, all or nothing.
    pub fn process_batch(
        &mut self,
        queue_ids: &[QueueItemId],
        action: VerificationAction,
        confidence: Option<u8>,
    ) -> Result<BatchOutcome, VerificationError> {
        let started_at = Instant::now();
        if queue_ids.is_empty() {
            return Err(VerificationInputError::EmptyBatch.into());
        }
        let outcome = action.resolve(confidence)?;
        let address_ids = self
            .repo
            .apply_outcome_batch(queue_ids, &outcome, now_epoch_ms())
            .map_err(|err| {
                warn!(
                    "event=verification_batch module=verification status=error action={} requested={} error={err}",
                    action.as_str(),
                    queue_ids.len()
                );
                VerificationError::from_write(err)
            })?;

        let processed_count = queue_ids.iter().collect::<HashSet<_>>().len();

        info!(
            "event=verification_batch module=verification status=ok action={} processed={} addresses={} duration_ms={}",
            action.as_str(),
            processed_count,
            address_ids.len(),
            started_at.elapsed().as_millis()
        );
        Ok(BatchOutcome {
            processed_count,
            address_ids,
            outcome,
        })
    }

    /// Queue entries joined with their addresses, oldest first.
    pub fn list_queue(&self, query: &QueueListQuery) -> Result<Vec<QueueEntry>, VerificationError> {
        Ok(self.repo.list_queue(query)?)
    }

    pub fn stats(&self) -> Result<VerificationStats, VerificationError> {
        Ok(self.repo.stats()?)
    }
}
