//! Domain model for registered addresses and their review lifecycle.
//!
//! # Responsibility
//! - Define the records shared by the generator, detector and state machine.
//! - Keep validation rules next to the data they protect.
//!
//! # Invariants
//! - Addresses are never deleted by core.
//! - Queue items and duplicate reports reference an address but do not own it.

pub mod address;
pub mod duplicate;
pub mod verification;

pub use address::{Address, AddressId, AddressValidationError, VerificationStatus};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
