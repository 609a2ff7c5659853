//! Address repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Point-radius proximity lookup ordered by distance.
//! - Code lookups, paged search and the create-with-queue-item write path.
//!
//! # Invariants
//! - An address and its initial queue item are inserted in one transaction.
//! - A violated `addresses.code` constraint surfaces as `RepoError::CodeTaken`.

use super::{
    address_exists, ensure_connection_ready, load_address_by_code, load_address_by_id,
    parse_address_row, AddressLookup, RepoError, RepoResult, ADDRESS_COLUMNS,
};
use crate::db::DISTANCE_FUNCTION_NAME;
use crate::geo::degree_window;
use crate::model::address::{Address, AddressId};
use crate::model::duplicate::NearbyAddress;
use crate::model::verification::VerificationQueueItem;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, TransactionBehavior};

const SEARCH_DEFAULT_LIMIT: u32 = 20;
const SEARCH_LIMIT_MAX: u32 = 100;
/// Default radius of the `near` search filter.
pub const SEARCH_DEFAULT_RADIUS_M: f64 = 1_000.0;

/// Point-radius lookup parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    /// Skips one address, used when re-checking an existing record.
    pub exclude_id: Option<AddressId>,
}

/// Filters and pagination for address search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressSearchQuery {
    /// Case-insensitive substring match on `place_name`.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    pub near: Option<ProximityQuery>,
    /// 1-based page number; `0` is treated as `1`.
    pub page: u32,
    /// Page size. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
}

/// One page of search results, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressPage {
    pub addresses: Vec<Address>,
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl AddressPage {
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Repository interface for address persistence.
pub trait AddressRepository: AddressLookup {
    /// Addresses within `radius_m` of the point, nearest first.
    fn find_nearby(&self, query: &ProximityQuery) -> RepoResult<Vec<NearbyAddress>>;
    fn code_exists(&self, code: &str) -> RepoResult<bool>;
    /// Inserts the address and its first queue item atomically.
    fn insert_with_queue_item(
        &mut self,
        address: &Address,
        queue_item: &VerificationQueueItem,
    ) -> RepoResult<()>;
    fn search(&self, query: &AddressSearchQuery) -> RepoResult<AddressPage>;
}

/// SQLite-backed address repository.
pub struct SqliteAddressRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteAddressRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AddressLookup for SqliteAddressRepository<'_> {
    fn get_address_by_code(&self, code: &str) -> RepoResult<Option<Address>> {
        load_address_by_code(self.conn, code)
    }

    fn get_address(&self, id: AddressId) -> RepoResult<Option<Address>> {
        load_address_by_id(self.conn, id)
    }
}

impl AddressRepository for SqliteAddressRepository<'_> {
    fn find_nearby(&self, query: &ProximityQuery) -> RepoResult<Vec<NearbyAddress>> {
        let window = SearchWindow::around(query.latitude, query.longitude, query.radius_m);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM (
                SELECT
                    {ADDRESS_COLUMNS},
                    {DISTANCE_FUNCTION_NAME}(?1, ?2, addresses.latitude, addresses.longitude)
                        AS distance_m,
                    addresses.rowid AS row_order
                FROM addresses
                WHERE addresses.latitude BETWEEN ?3 AND ?4
                  AND addresses.longitude BETWEEN ?5 AND ?6
                  AND (?8 IS NULL OR addresses.id <> ?8)
             )
             WHERE distance_m <= ?7
             ORDER BY distance_m ASC, row_order ASC;"
        ))?;

        let mut rows = stmt.query(params![
            query.latitude,
            query.longitude,
            window.min_lat,
            window.max_lat,
            window.min_lon,
            window.max_lon,
            query.radius_m,
            query.exclude_id.map(|id| id.to_string()),
        ])?;

        let mut nearby = Vec::new();
        while let Some(row) = rows.next()? {
            nearby.push(NearbyAddress {
                address: parse_address_row(row)?,
                distance_m: row.get("distance_m")?,
            });
        }
        Ok(nearby)
    }

    fn code_exists(&self, code: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM addresses WHERE code = ?1);",
            [code],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_with_queue_item(
        &mut self,
        address: &Address,
        queue_item: &VerificationQueueItem,
    ) -> RepoResult<()> {
        address.validate()?;
        if queue_item.address_id != address.id {
            return Err(RepoError::InvalidData(format!(
                "queue item {} references {} instead of {}",
                queue_item.id, queue_item.address_id, address.id
            )));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO addresses (
                id,
                code,
                latitude,
                longitude,
                place_name,
                category,
                verification_status,
                confidence_score,
                photo_ref,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                address.id.to_string(),
                address.code.as_str(),
                address.latitude,
                address.longitude,
                address.place_name.as_str(),
                address.category.as_str(),
                address.verification_status.as_str(),
                address.confidence_score,
                address.photo_ref.as_deref(),
                address.created_at,
                address.updated_at,
            ],
        )
        .map_err(|err| map_code_conflict(err, &address.code))?;

        tx.execute(
            "INSERT INTO verification_queue (
                id,
                address_id,
                verification_type,
                status,
                ai_confidence,
                created_at,
                processed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                queue_item.id.to_string(),
                queue_item.address_id.to_string(),
                queue_item.verification_type.as_str(),
                queue_item.status.as_str(),
                queue_item.ai_confidence,
                queue_item.created_at,
                queue_item.processed_at,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn search(&self, query: &AddressSearchQuery) -> RepoResult<AddressPage> {
        let mut filters = String::from(" WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            filters.push_str(" AND addresses.place_name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!("%{}%", escape_like(text))));
        }

        if let Some(category) = query.category.as_deref() {
            filters.push_str(" AND addresses.category = ?");
            bind_values.push(Value::Text(category.to_string()));
        }

        if let Some(near) = query.near.as_ref() {
            let window = SearchWindow::around(near.latitude, near.longitude, near.radius_m);
            filters.push_str(&format!(
                " AND addresses.latitude BETWEEN ? AND ?
                  AND addresses.longitude BETWEEN ? AND ?
                  AND {DISTANCE_FUNCTION_NAME}(?, ?, addresses.latitude, addresses.longitude) <= ?"
            ));
            bind_values.extend([
                Value::Real(window.min_lat),
                Value::Real(window.max_lat),
                Value::Real(window.min_lon),
                Value::Real(window.max_lon),
                Value::Real(near.latitude),
                Value::Real(near.longitude),
                Value::Real(near.radius_m),
            ]);
            if let Some(exclude_id) = near.exclude_id {
                filters.push_str(" AND addresses.id <> ?");
                bind_values.push(Value::Text(exclude_id.to_string()));
            }
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM addresses{filters};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;
        let total_count = u64::try_from(total).unwrap_or(0);

        let page = query.page.max(1);
        let limit = normalize_search_limit(query.limit);
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses{filters}
             ORDER BY addresses.created_at DESC, addresses.rowid DESC
             LIMIT ? OFFSET ?;"
        ))?;
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(offset));

        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut addresses = Vec::new();
        while let Some(row) = rows.next()? {
            addresses.push(parse_address_row(row)?);
        }

        Ok(AddressPage {
            addresses,
            page,
            limit,
            total_count,
            total_pages: total_count.div_ceil(u64::from(limit)),
        })
    }
}

/// Normalizes a search page size according to the search contract.
pub fn normalize_search_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => SEARCH_DEFAULT_LIMIT,
        Some(value) => value.min(SEARCH_LIMIT_MAX),
    }
}

/// Fails with `AddressNotFound` unless the address row exists.
pub fn ensure_address_exists(conn: &Connection, id: AddressId) -> RepoResult<()> {
    if address_exists(conn, id)? {
        Ok(())
    } else {
        Err(RepoError::AddressNotFound(id))
    }
}

/// Index-friendly degree rectangle enclosing a radius.
struct SearchWindow {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl SearchWindow {
    fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        // slightly padded so points exactly on the radius survive the prefilter
        let (d_lat, d_lon) = degree_window(lat, radius_m.max(0.0) * 1.001 + 1.0);
        let (min_lon, max_lon) = if lon - d_lon < -180.0 || lon + d_lon > 180.0 {
            (-180.0, 180.0)
        } else {
            (lon - d_lon, lon + d_lon)
        };
        Self {
            min_lat: lat - d_lat,
            max_lat: lat + d_lat,
            min_lon,
            max_lon,
        }
    }
}

fn map_code_conflict(err: rusqlite::Error, code: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation
                && message.contains("addresses.code") =>
        {
            RepoError::CodeTaken(code.to_string())
        }
        _ => err.into(),
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, normalize_search_limit};

    #[test]
    fn search_limit_defaults_and_clamps() {
        assert_eq!(normalize_search_limit(None), 20);
        assert_eq!(normalize_search_limit(Some(0)), 20);
        assert_eq!(normalize_search_limit(Some(5)), 5);
        assert_eq!(normalize_search_limit(Some(500)), 100);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
