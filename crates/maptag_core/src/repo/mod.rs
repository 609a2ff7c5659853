//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from service orchestration.
//! - Own transaction boundaries for multi-row mutations.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories refuse connections whose schema is not fully migrated.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::address::{Address, AddressId, AddressValidationError, VerificationStatus};
use crate::model::verification::QueueItemId;
use rusqlite::{Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod address_repo;
pub mod report_repo;
pub mod verification_repo;

/// Column list shared by every query that materializes an `Address`.
pub(crate) const ADDRESS_COLUMNS: &str = "addresses.id AS id,
    addresses.code AS code,
    addresses.latitude AS latitude,
    addresses.longitude AS longitude,
    addresses.place_name AS place_name,
    addresses.category AS category,
    addresses.verification_status AS verification_status,
    addresses.confidence_score AS confidence_score,
    addresses.photo_ref AS photo_ref,
    addresses.created_at AS created_at,
    addresses.updated_at AS updated_at";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for address, queue and report persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(AddressValidationError),
    Db(DbError),
    AddressNotFound(AddressId),
    QueueItemNotFound(QueueItemId),
    /// Insert hit the `addresses.code` uniqueness constraint.
    CodeTaken(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::AddressNotFound(id) => write!(f, "address not found: {id}"),
            Self::QueueItemNotFound(id) => write!(f, "verification queue item not found: {id}"),
            Self::CodeTaken(code) => write!(f, "address code already in use: {code}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::AddressNotFound(_)
            | Self::QueueItemNotFound(_)
            | Self::CodeTaken(_)
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<AddressValidationError> for RepoError {
    fn from(value: AddressValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Address lookups shared by every service that resolves codes or ids.
pub trait AddressLookup {
    fn get_address_by_code(&self, code: &str) -> RepoResult<Option<Address>>;
    fn get_address(&self, id: AddressId) -> RepoResult<Option<Address>>;
}

pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn load_address_by_code(conn: &Connection, code: &str) -> RepoResult<Option<Address>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE addresses.code = ?1;"
    ))?;
    let mut rows = stmt.query([code])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_address_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_address_by_id(conn: &Connection, id: AddressId) -> RepoResult<Option<Address>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE addresses.id = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_address_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn address_exists(conn: &Connection, id: AddressId) -> RepoResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM addresses WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Materializes an address from a row selected with `ADDRESS_COLUMNS`.
pub(crate) fn parse_address_row(row: &Row<'_>) -> RepoResult<Address> {
    let id_text: String = row.get("id")?;
    let status_text: String = row.get("verification_status")?;
    let verification_status = VerificationStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid verification status `{status_text}` in addresses.verification_status"
        ))
    })?;
    let confidence: i64 = row.get("confidence_score")?;
    let confidence_score = u8::try_from(confidence).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid confidence `{confidence}` in addresses.confidence_score"
        ))
    })?;

    let address = Address {
        id: parse_uuid(&id_text, "addresses.id")?,
        code: row.get("code")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        place_name: row.get("place_name")?,
        category: row.get("category")?,
        verification_status,
        confidence_score,
        photo_ref: row.get("photo_ref")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    address.validate()?;
    Ok(address)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
