//! Flat key/value configuration
//!
//! Java-properties-flavored text: one `key = value` per line, `#`/`!`
//! comments, blank lines ignored, trailing `\` continues a line. Keys are
//! shaped `<PassName>.<option>`; per-callee directive entries use the rest
//! of the key as the match token (`CallLogger.java.net.URL:openConnection()`).
//!
//! Boolean options follow presence semantics: a pass is enabled when its
//! `enabled` key exists, whatever the value.

use rustc_hash::FxHashMap;
use std::path::Path;

use crate::errors::{InstrumentError, Result};

/// Parsed configuration, key order preserved for namespace scans
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: FxHashMap<String, String>,
    keys: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Parse configuration text. A non-blank, non-comment line without `=`
    /// is a fatal startup error.
    pub fn from_str(text: &str) -> Result<Self> {
        let mut config = Config::new();
        let mut pending = String::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim_start();
            if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }
            if let Some(continued) = line.strip_suffix('\\') {
                pending.push_str(continued);
                continue;
            }
            pending.push_str(line);
            let full = std::mem::take(&mut pending);
            let (key, value) = full.split_once('=').ok_or_else(|| {
                InstrumentError::config(format!(
                    "line {}: expected key = value, got {:?}",
                    number + 1,
                    full
                ))
            })?;
            config.set(key.trim(), value.trim());
        }
        if !pending.is_empty() {
            return Err(InstrumentError::config(
                "dangling line continuation at end of configuration",
            ));
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Config::from_str(&text)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.entries.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Presence semantics for boolean options
    pub fn is_set(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Required-option lookup; absence is a fatal configuration error.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| InstrumentError::config(format!("missing required option {}", key)))
    }

    /// Entries under a key prefix, prefix stripped, in file order
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.keys.iter().filter_map(move |key| {
            let stripped = key.strip_prefix(prefix)?;
            Some((stripped, self.entries[key].as_str()))
        })
    }
}
