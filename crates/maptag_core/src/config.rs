//! Tunable settings for the creation workflow.
//!
//! All structs deserialize with `#[serde(default)]`, so partial documents
//! only override the keys they name.

use crate::scoring::DuplicateDetectionConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;
const DEFAULT_SHARE_BASE_URL: &str = "https://maptag.bf";

/// Code uniqueness retry bound and public link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeGenerationConfig {
    /// Candidates tried (existence check plus insert) before giving up.
    pub max_attempts: u32,
    /// Base of share and short links, without trailing slash.
    pub share_base_url: String,
}

impl Default for CodeGenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
        }
    }
}

/// Complete core configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub detection: DuplicateDetectionConfig,
    pub codes: CodeGenerationConfig,
}
