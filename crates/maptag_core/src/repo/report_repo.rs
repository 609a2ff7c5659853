//! Duplicate report repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append duplicate reports.
//! - Surface pending addresses that have outstanding reports.
//!
//! # Invariants
//! - Reports are insert-only; identical pairs accumulate.
//! - Review feed order: report count DESC, then newest address first.

use super::address_repo::ensure_address_exists;
use super::{
    ensure_connection_ready, load_address_by_code, load_address_by_id, parse_address_row,
    parse_uuid, AddressLookup, RepoError, RepoResult, ADDRESS_COLUMNS,
};
use crate::model::address::{Address, AddressId, VerificationStatus};
use crate::model::duplicate::{DuplicateReport, ReviewCandidate};
use crate::model::now_epoch_ms;
use rusqlite::{params, Connection, Row};

/// Default page size of the review feed.
pub const REVIEW_FEED_DEFAULT_LIMIT: u32 = 50;

/// Repository interface for duplicate reports.
pub trait DuplicateReportRepository: AddressLookup {
    /// Appends one report after checking both addresses exist.
    fn record_report(
        &self,
        address_id: AddressId,
        reported_duplicate_id: AddressId,
        distance_meters: f64,
    ) -> RepoResult<DuplicateReport>;
    /// Reports filed by `address_id`, oldest first.
    fn list_reports(&self, address_id: AddressId) -> RepoResult<Vec<DuplicateReport>>;
    fn addresses_needing_review(&self, limit: u32) -> RepoResult<Vec<ReviewCandidate>>;
}

/// SQLite-backed duplicate report repository.
pub struct SqliteDuplicateReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDuplicateReportRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AddressLookup for SqliteDuplicateReportRepository<'_> {
    fn get_address_by_code(&self, code: &str) -> RepoResult<Option<Address>> {
        load_address_by_code(self.conn, code)
    }

    fn get_address(&self, id: AddressId) -> RepoResult<Option<Address>> {
        load_address_by_id(self.conn, id)
    }
}

impl DuplicateReportRepository for SqliteDuplicateReportRepository<'_> {
    fn record_report(
        &self,
        address_id: AddressId,
        reported_duplicate_id: AddressId,
        distance_meters: f64,
    ) -> RepoResult<DuplicateReport> {
        if !distance_meters.is_finite() || distance_meters < 0.0 {
            return Err(RepoError::InvalidData(format!(
                "duplicate report distance must be a non-negative number, got {distance_meters}"
            )));
        }
        ensure_address_exists(self.conn, address_id)?;
        ensure_address_exists(self.conn, reported_duplicate_id)?;

        let created_at = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO duplicate_reports (
                address_id,
                reported_duplicate_id,
                distance_meters,
                created_at
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                address_id.to_string(),
                reported_duplicate_id.to_string(),
                distance_meters,
                created_at,
            ],
        )?;

        Ok(DuplicateReport {
            id: self.conn.last_insert_rowid(),
            address_id,
            reported_duplicate_id,
            distance_meters,
            created_at,
        })
    }

    fn list_reports(&self, address_id: AddressId) -> RepoResult<Vec<DuplicateReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                address_id,
                reported_duplicate_id,
                distance_meters,
                created_at
             FROM duplicate_reports
             WHERE address_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([address_id.to_string()])?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next()? {
            reports.push(parse_report_row(row)?);
        }
        Ok(reports)
    }

    fn addresses_needing_review(&self, limit: u32) -> RepoResult<Vec<ReviewCandidate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ADDRESS_COLUMNS}, COUNT(dr.id) AS report_count
             FROM addresses
             INNER JOIN duplicate_reports dr ON dr.address_id = addresses.id
             WHERE addresses.verification_status = ?1
             GROUP BY addresses.id
             ORDER BY report_count DESC, addresses.created_at DESC, addresses.rowid DESC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![VerificationStatus::Pending.as_str(), limit])?;

        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let count: i64 = row.get("report_count")?;
            candidates.push(ReviewCandidate {
                address: parse_address_row(row)?,
                report_count: u32::try_from(count).unwrap_or(u32::MAX),
            });
        }
        Ok(candidates)
    }
}

fn parse_report_row(row: &Row<'_>) -> RepoResult<DuplicateReport> {
    let address_id: String = row.get("address_id")?;
    let duplicate_id: String = row.get("reported_duplicate_id")?;
    Ok(DuplicateReport {
        id: row.get("id")?,
        address_id: parse_uuid(&address_id, "duplicate_reports.address_id")?,
        reported_duplicate_id: parse_uuid(&duplicate_id, "duplicate_reports.reported_duplicate_id")?,
        distance_meters: row.get("distance_meters")?,
        created_at: row.get("created_at")?,
    })
}
