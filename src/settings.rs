use std::path::Path;

use serde::Deserialize;

use crate::error::{QualensError, Result};

const DEFAULT_READ_TIMEOUT_MS: u64 = 20_000;

/// Per-deployment settings. The credential lists are parallel to `servers`:
/// entry `i` of each list belongs to server `i`, a missing entry means the
/// server has no credential of that kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub servers: Vec<String>,
    pub usernames: Vec<String>,
    pub passwords: Vec<String>,
    pub tokens: Vec<String>,
    pub nice_names: Vec<String>,

    /// Comma-separated metric keys to fetch, overriding the built-in set.
    pub metrics: Option<String>,

    pub request_read_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            usernames: Vec::new(),
            passwords: Vec::new(),
            tokens: Vec::new(),
            nice_names: Vec::new(),
            metrics: None,
            request_read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| QualensError::Config(format!("invalid settings file {}: {e}", path.display())))
    }

    pub fn username(&self, index: usize) -> Option<&str> {
        entry(&self.usernames, index)
    }

    pub fn password(&self, index: usize) -> Option<&str> {
        entry(&self.passwords, index)
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        entry(&self.tokens, index)
    }
}

fn entry(list: &[String], index: usize) -> Option<&str> {
    list.get(index).map(String::as_str)
}
