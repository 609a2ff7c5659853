//! Address code generation and validation.
//!
//! # Responsibility
//! - Derive `BF-CCC-GGGG-XXXX` codes from coordinates plus a random suffix.
//! - Validate and parse user-supplied codes.
//!
//! # Invariants
//! - Generated codes always satisfy the code grammar.
//! - The generator is stateless with respect to persisted codes; uniqueness
//!   is enforced by the creation workflow and the `addresses.code` constraint.

pub mod city;
pub mod code;
pub mod generator;

pub use city::{city_token, CityArea, CITY_AREAS, FALLBACK_CITY_TOKEN};
pub use code::{validate_code, AddressCode, CodeFormatError, COUNTRY_PREFIX};
pub use generator::{grid_token, CodeGenerator, RandomSuffix, SuffixSource, SUFFIX_ALPHABET};
