//! Verification queue repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Apply review outcomes to queue items and their addresses.
//! - Provide queue listings and aggregate review statistics.
//!
//! # Invariants
//! - Every outcome write runs inside one IMMEDIATE transaction spanning the
//!   queue update and the address update.
//! - A transaction that is not committed is rolled back on drop, so an early
//!   return never leaves a half-applied batch behind.
//! - Batch id sets are bound as a single `rarray` value, so batch size is not
//!   limited by SQLite's bind-variable cap.

use super::{
    ensure_connection_ready, parse_address_row, parse_uuid, RepoError, RepoResult,
    ADDRESS_COLUMNS,
};
use crate::model::address::{Address, AddressId, VerificationStatus};
use crate::model::verification::{
    QueueItemId, QueueStatus, VerificationOutcome, VerificationQueueItem,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

const QUEUE_DEFAULT_LIMIT: u32 = 50;
const QUEUE_LIMIT_MAX: u32 = 500;

const QUEUE_COLUMNS: &str = "vq.id AS queue_id,
    vq.address_id AS queue_address_id,
    vq.verification_type AS verification_type,
    vq.status AS queue_status,
    vq.ai_confidence AS ai_confidence,
    vq.created_at AS queued_at,
    vq.processed_at AS processed_at";

/// Queue listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueListQuery {
    pub status: QueueStatus,
    /// Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
}

impl Default for QueueListQuery {
    fn default() -> Self {
        Self {
            status: QueueStatus::Pending,
            limit: None,
        }
    }
}

/// Queue item joined with the address under review.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub item: VerificationQueueItem,
    pub address: Address,
}

/// Address counts per verification status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressStatusCounts {
    pub pending: u64,
    pub verified: u64,
    pub rejected: u64,
    pub flagged: u64,
    pub total: u64,
    pub avg_confidence: f64,
}

/// Queue item counts per queue status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
}

/// Aggregate review statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationStats {
    pub addresses: AddressStatusCounts,
    pub queue: QueueStatusCounts,
}

impl VerificationStats {
    /// Share of addresses with a final decision (verified or rejected), in percent.
    pub fn verification_rate(&self) -> f64 {
        if self.addresses.total == 0 {
            return 0.0;
        }
        let decided = self.addresses.verified + self.addresses.rejected;
        decided as f64 * 100.0 / self.addresses.total as f64
    }
}

/// Repository interface for the verification workflow.
pub trait VerificationRepository {
    fn get_queue_item(&self, id: QueueItemId) -> RepoResult<Option<VerificationQueueItem>>;
    /// Queue entries with `query.status`, oldest first.
    fn list_queue(&self, query: &QueueListQuery) -> RepoResult<Vec<QueueEntry>>;
    /// Completes one item and updates its address atomically.
    fn apply_outcome(
        &mut self,
        id: QueueItemId,
        outcome: &VerificationOutcome,
        processed_at: i64,
    ) -> RepoResult<Address>;
    /// Completes every listed item and updates every owning address atomically.
    ///
    /// Fails with `QueueItemNotFound` and changes nothing if any id is unknown.
    fn apply_outcome_batch(
        &mut self,
        ids: &[QueueItemId],
        outcome: &VerificationOutcome,
        processed_at: i64,
    ) -> RepoResult<Vec<AddressId>>;
    fn stats(&self) -> RepoResult<VerificationStats>;
}

/// SQLite-backed verification repository.
pub struct SqliteVerificationRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteVerificationRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl VerificationRepository for SqliteVerificationRepository<'_> {
    fn get_queue_item(&self, id: QueueItemId) -> RepoResult<Option<VerificationQueueItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {QUEUE_COLUMNS} FROM verification_queue vq WHERE vq.id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_queue_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_queue(&self, query: &QueueListQuery) -> RepoResult<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {QUEUE_COLUMNS}, {ADDRESS_COLUMNS}
             FROM verification_queue vq
             INNER JOIN addresses ON addresses.id = vq.address_id
             WHERE vq.status = ?1
             ORDER BY vq.created_at ASC, vq.rowid ASC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![
            query.status.as_str(),
            normalize_queue_limit(query.limit)
        ])?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(QueueEntry {
                item: parse_queue_row(row)?,
                address: parse_address_row(row)?,
            });
        }
        Ok(entries)
    }

    fn apply_outcome(
        &mut self,
        id: QueueItemId,
        outcome: &VerificationOutcome,
        processed_at: i64,
    ) -> RepoResult<Address> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let address_id_text: Option<String> = tx
            .query_row(
                "SELECT address_id FROM verification_queue WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(address_id_text) = address_id_text else {
            return Err(RepoError::QueueItemNotFound(id));
        };
        let address_id = parse_uuid(&address_id_text, "verification_queue.address_id")?;

        tx.execute(
            "UPDATE verification_queue
             SET
                status = ?2,
                ai_confidence = ?3,
                processed_at = ?4
             WHERE id = ?1;",
            params![
                id.to_string(),
                QueueStatus::Completed.as_str(),
                f64::from(outcome.confidence),
                processed_at,
            ],
        )?;

        let changed = tx.execute(
            "UPDATE addresses
             SET
                verification_status = ?2,
                confidence_score = ?3,
                updated_at = ?4
             WHERE id = ?1;",
            params![
                address_id_text.as_str(),
                outcome.status.as_str(),
                outcome.confidence,
                processed_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::AddressNotFound(address_id));
        }

        let address = super::load_address_by_id(&tx, address_id)?
            .ok_or(RepoError::AddressNotFound(address_id))?;
        tx.commit()?;
        Ok(address)
    }

    fn apply_outcome_batch(
        &mut self,
        ids: &[QueueItemId],
        outcome: &VerificationOutcome,
        processed_at: i64,
    ) -> RepoResult<Vec<AddressId>> {
        let mut seen: HashSet<QueueItemId> = HashSet::with_capacity(ids.len());
        let unique_ids: Vec<QueueItemId> =
            ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique_ids.is_empty() {
            return Ok(Vec::new());
        }
        let queue_set = id_set(unique_ids.iter().map(ToString::to_string));

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut owners: HashMap<String, String> = HashMap::with_capacity(unique_ids.len());
        {
            let mut stmt =
                tx.prepare("SELECT id, address_id FROM verification_queue WHERE id IN rarray(?1);")?;
            let mut rows = stmt.query([Rc::clone(&queue_set)])?;
            while let Some(row) = rows.next()? {
                owners.insert(row.get(0)?, row.get(1)?);
            }
        }

        if let Some(missing) = unique_ids
            .iter()
            .find(|id| !owners.contains_key(&id.to_string()))
        {
            return Err(RepoError::QueueItemNotFound(*missing));
        }

        tx.execute(
            "UPDATE verification_queue
             SET status = ?1, ai_confidence = ?2, processed_at = ?3
             WHERE id IN rarray(?4);",
            params![
                QueueStatus::Completed.as_str(),
                f64::from(outcome.confidence),
                processed_at,
                queue_set,
            ],
        )?;

        let mut owning: HashSet<&str> = HashSet::with_capacity(owners.len());
        let address_ids: Vec<String> = unique_ids
            .iter()
            .filter_map(|queue_id| owners.get(&queue_id.to_string()))
            .filter(|address_id| owning.insert(address_id.as_str()))
            .cloned()
            .collect();

        let changed = tx.execute(
            "UPDATE addresses
             SET verification_status = ?1, confidence_score = ?2, updated_at = ?3
             WHERE id IN rarray(?4);",
            params![
                outcome.status.as_str(),
                outcome.confidence,
                processed_at,
                id_set(address_ids.iter().cloned()),
            ],
        )?;
        if changed != address_ids.len() {
            return Err(RepoError::InvalidData(format!(
                "batch updated {changed} of {} owning addresses",
                address_ids.len()
            )));
        }

        let parsed = address_ids
            .iter()
            .map(|id| parse_uuid(id, "verification_queue.address_id"))
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(parsed)
    }

    fn stats(&self) -> RepoResult<VerificationStats> {
        let addresses = self.conn.query_row(
            "SELECT
                COUNT(CASE WHEN verification_status = ?1 THEN 1 END),
                COUNT(CASE WHEN verification_status = ?2 THEN 1 END),
                COUNT(CASE WHEN verification_status = ?3 THEN 1 END),
                COUNT(CASE WHEN verification_status = ?4 THEN 1 END),
                COUNT(*),
                COALESCE(AVG(confidence_score), 0.0)
             FROM addresses;",
            params![
                VerificationStatus::Pending.as_str(),
                VerificationStatus::Verified.as_str(),
                VerificationStatus::Rejected.as_str(),
                VerificationStatus::Flagged.as_str(),
            ],
            |row| {
                Ok(AddressStatusCounts {
                    pending: count_column(row, 0)?,
                    verified: count_column(row, 1)?,
                    rejected: count_column(row, 2)?,
                    flagged: count_column(row, 3)?,
                    total: count_column(row, 4)?,
                    avg_confidence: row.get(5)?,
                })
            },
        )?;

        let queue = self.conn.query_row(
            "SELECT
                COUNT(CASE WHEN status = ?1 THEN 1 END),
                COUNT(CASE WHEN status = ?2 THEN 1 END),
                COUNT(CASE WHEN status = ?3 THEN 1 END)
             FROM verification_queue;",
            params![
                QueueStatus::Pending.as_str(),
                QueueStatus::Processing.as_str(),
                QueueStatus::Completed.as_str(),
            ],
            |row| {
                Ok(QueueStatusCounts {
                    pending: count_column(row, 0)?,
                    processing: count_column(row, 1)?,
                    completed: count_column(row, 2)?,
                })
            },
        )?;

        Ok(VerificationStats { addresses, queue })
    }
}

/// Normalizes queue list limit according to the queue contract.
pub fn normalize_queue_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => QUEUE_DEFAULT_LIMIT,
        Some(value) => value.min(QUEUE_LIMIT_MAX),
    }
}

/// Binds a whole id set as one `rarray` parameter.
fn id_set(ids: impl Iterator<Item = String>) -> Rc<Vec<Value>> {
    Rc::new(ids.map(Value::Text).collect())
}

fn count_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(index)?;
    Ok(u64::try_from(value).unwrap_or(0))
}

fn parse_queue_row(row: &Row<'_>) -> RepoResult<VerificationQueueItem> {
    let id_text: String = row.get("queue_id")?;
    let address_id_text: String = row.get("queue_address_id")?;
    let status_text: String = row.get("queue_status")?;
    let status = QueueStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid queue status `{status_text}` in verification_queue.status"
        ))
    })?;

    Ok(VerificationQueueItem {
        id: parse_uuid(&id_text, "verification_queue.id")?,
        address_id: parse_uuid(&address_id_text, "verification_queue.address_id")?,
        verification_type: row.get("verification_type")?,
        status,
        ai_confidence: row.get("ai_confidence")?,
        created_at: row.get("queued_at")?,
        processed_at: row.get("processed_at")?,
    })
}
