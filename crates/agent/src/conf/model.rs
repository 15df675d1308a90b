//! Model — AgentConfig and masking rule structs.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory whose regular files are treated as backup sources.
    pub source_dir: String,
    /// Directory the sanitized backup artifacts are appended under.
    pub backup_dir: String,
    /// Path of the persisted checkpoint table (JSON).
    pub checkpoint_path: String,
    pub cycle_interval_secs: u64,
    pub max_concurrent_files: usize,
    pub masking: MaskingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Token substituted wholesale for fields in `full_mask`.
    pub redaction_token: String,
    /// Character repeated over the interior of partially masked values.
    pub mask_char: char,
    pub full_mask: Vec<String>,
    pub partial_mask: HashMap<String, PartialMaskRule>,
    /// Presence of any of these fields drops the whole record.
    pub skip_if_contains: Vec<String>,
    /// These fields are removed from the output record.
    pub skip_fields: Vec<String>,
    /// Field whose value is normalized via `level_map`. Empty disables.
    pub level_field: String,
    /// Case-insensitive log-level normalization table.
    pub level_map: HashMap<String, String>,
}

/// Partial-masking policy for one field: how many leading and trailing
/// characters stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMaskRule {
    pub visible_start: usize,
    pub visible_end: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            source_dir: "/var/log/app".to_string(),
            backup_dir: "/var/backups/logvault".to_string(),
            checkpoint_path: "/var/lib/logvault/checkpoints.json".to_string(),
            cycle_interval_secs: 30,
            max_concurrent_files: 4,
            masking: MaskingConfig::default(),
        }
    }
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            redaction_token: "[MASKED]".to_string(),
            mask_char: '*',
            full_mask: vec![
                "password".to_string(),
                "passwd".to_string(),
                "secret".to_string(),
                "api_key".to_string(),
                "authorization".to_string(),
            ],
            partial_mask: HashMap::new(),
            skip_if_contains: Vec::new(),
            skip_fields: Vec::new(),
            level_field: "level".to_string(),
            level_map: default_level_map(),
        }
    }
}

fn default_level_map() -> HashMap<String, String> {
    [
        ("trace", "TRACE"),
        ("debug", "DEBUG"),
        ("info", "INFO"),
        ("information", "INFO"),
        ("notice", "INFO"),
        ("warn", "WARNING"),
        ("warning", "WARNING"),
        ("err", "ERROR"),
        ("error", "ERROR"),
        ("crit", "CRITICAL"),
        ("critical", "CRITICAL"),
        ("fatal", "CRITICAL"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl AgentConfig {
    /// Validate configuration values (fast, no I/O).
    pub fn validate(&self) -> Result<(), String> {
        if self.source_dir.is_empty() {
            return Err("source_dir must not be empty".to_string());
        }
        if self.backup_dir.is_empty() {
            return Err("backup_dir must not be empty".to_string());
        }
        if self.checkpoint_path.is_empty() {
            return Err("checkpoint_path must not be empty".to_string());
        }
        if self.cycle_interval_secs == 0 {
            return Err("cycle_interval_secs must be > 0".to_string());
        }
        if self.max_concurrent_files == 0 {
            return Err("max_concurrent_files must be > 0".to_string());
        }
        self.masking.validate()
    }
}

impl MaskingConfig {
    /// Validate masking configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.redaction_token.is_empty() {
            return Err("masking.redaction_token must not be empty".to_string());
        }
        Ok(())
    }
}
