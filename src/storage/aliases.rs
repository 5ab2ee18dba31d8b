//! Legacy key aliases
//!
//! Older clients stored the same logical set under differently named keys.
//! The table maps a logical key to its canonical physical key followed by
//! the legacy keys that must still be read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What happens to legacy keys when a logical key is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyWritePolicy {
    /// Write the canonical key and drop the legacy ones
    #[default]
    Collapse,
    /// Write the same value under every alias
    Mirror,
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, Vec<String>>,
    policy: LegacyWritePolicy,
}

impl AliasTable {
    pub fn new(policy: LegacyWritePolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    /// Register `logical` with its legacy physical keys.
    /// The logical key itself is the canonical physical key.
    pub fn with_aliases(mut self, logical: &str, legacy: &[&str]) -> Self {
        let mut keys = vec![logical.to_string()];
        keys.extend(legacy.iter().map(|k| k.to_string()));
        self.entries.insert(logical.to_string(), keys);
        self
    }

    pub fn policy(&self) -> LegacyWritePolicy {
        self.policy
    }

    /// Canonical key first, then legacy keys. Unknown keys map to themselves.
    pub fn physical_keys(&self, logical: &str) -> Vec<String> {
        self.entries
            .get(logical)
            .cloned()
            .unwrap_or_else(|| vec![logical.to_string()])
    }

    pub fn legacy_keys(&self, logical: &str) -> Vec<String> {
        self.physical_keys(logical).into_iter().skip(1).collect()
    }
}
