//! Address code value type: `BF-CCC-GGGG-XXXX`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Country segment carried by every code.
pub const COUNTRY_PREFIX: &str = "BF";

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^BF-([A-Z]{3})-([0-9]{4})-([A-Z0-9]{4})$").expect("valid address code regex")
});

/// Raised when text does not match the code grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFormatError {
    pub input: String,
}

impl Display for CodeFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid address code `{}`; expected BF-CCC-GGGG-XXXX",
            self.input
        )
    }
}

impl Error for CodeFormatError {}

/// Parsed, always well-formed address code.
///
/// Serialized as its canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressCode {
    city: String,
    grid: String,
    suffix: String,
}

impl AddressCode {
    /// Assembles a code from its segments, validating the whole grammar.
    pub fn from_parts(city: &str, grid: &str, suffix: &str) -> Result<Self, CodeFormatError> {
        Self::parse(&format!("{COUNTRY_PREFIX}-{city}-{grid}-{suffix}"))
    }

    /// Parses a code. Matching is case-sensitive: lowercase input is malformed.
    pub fn parse(input: &str) -> Result<Self, CodeFormatError> {
        let captures = CODE_PATTERN.captures(input).ok_or_else(|| CodeFormatError {
            input: input.to_string(),
        })?;
        Ok(Self {
            city: captures[1].to_string(),
            grid: captures[2].to_string(),
            suffix: captures[3].to_string(),
        })
    }

    pub fn country(&self) -> &'static str {
        COUNTRY_PREFIX
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn grid(&self) -> &str {
        &self.grid
    }

    /// Random segment; also used as the short-link key.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Display for AddressCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{COUNTRY_PREFIX}-{}-{}-{}",
            self.city, self.grid, self.suffix
        )
    }
}

impl FromStr for AddressCode {
    type Err = CodeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AddressCode {
    type Error = CodeFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AddressCode> for String {
    fn from(value: AddressCode) -> Self {
        value.to_string()
    }
}

/// Returns whether `input` is a well-formed address code.
pub fn validate_code(input: &str) -> bool {
    CODE_PATTERN.is_match(input)
}
