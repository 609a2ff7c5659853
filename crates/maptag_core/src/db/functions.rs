//! SQL scalar functions registered on every connection.
//!
//! SQLite has no geography type, so point-radius lookups are expressed as a
//! bounding-box prefilter plus `maptag_distance_m(lat1, lon1, lat2, lon2)`.
//! Id sets of any size are bound as one `rarray(?)` parameter.

use crate::geo::haversine_m;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the great-circle distance function (meters).
pub const DISTANCE_FUNCTION_NAME: &str = "maptag_distance_m";

pub(super) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    rusqlite::vtab::array::load_module(conn)?;
    conn.create_scalar_function(
        DISTANCE_FUNCTION_NAME,
        4,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let lat1: f64 = ctx.get(0)?;
            let lon1: f64 = ctx.get(1)?;
            let lat2: f64 = ctx.get(2)?;
            let lon2: f64 = ctx.get(3)?;
            Ok(haversine_m(lat1, lon1, lat2, lon2))
        },
    )
}
