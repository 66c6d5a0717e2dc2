use crate::domain::pagination::DEFAULT_PAGE_SIZE;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime settings, loaded from an optional JSON file. Missing fields fall back
/// to their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BankConfig {
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// How many times an operation is re-run after a conflicting update.
    pub max_conflict_retries: u32,
    /// How many account numbers are drawn before giving up on a collision streak.
    pub account_number_attempts: u32,
    pub default_page_size: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            max_conflict_retries: 3,
            account_number_attempts: 5,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BankConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
