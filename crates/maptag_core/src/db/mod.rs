//! SQLite storage for the address registry.
//!
//! Connections come from `open_db` / `open_db_in_memory` only; both configure
//! the connection, register the distance and id-set helpers and migrate the
//! schema before handing it out. The schema version lives in
//! `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod functions;
pub mod migrations;
mod open;

pub use functions::DISTANCE_FUNCTION_NAME;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening, configuring or migrating a registry database.
#[derive(Debug)]
pub enum DbError {
    /// The file (or in-memory handle) could not be opened.
    Open {
        mode: &'static str,
        source: rusqlite::Error,
    },
    /// A pragma or helper registration failed on a freshly opened connection.
    Configure {
        step: &'static str,
        source: rusqlite::Error,
    },
    /// Migration `version` failed; nothing from the run was kept.
    Migration { version: u32, source: rusqlite::Error },
    /// The file was written by a newer build of the registry.
    SchemaTooNew { found: u32, supported: u32 },
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { mode, source } => {
                write!(f, "cannot open {mode} address registry: {source}")
            }
            Self::Configure { step, source } => {
                write!(f, "cannot configure registry connection ({step}): {source}")
            }
            Self::Migration { version, source } => {
                write!(f, "registry migration {version} failed: {source}")
            }
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "registry schema version {found} is newer than this build supports ({supported})"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. }
            | Self::Configure { source, .. }
            | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
