//! Rules — masking config compiled into lookup-friendly sets.

use std::collections::{HashMap, HashSet};

use crate::conf::{MaskingConfig, PartialMaskRule};

/// Compiled rule sets. Field-name lookups are O(1); the level map is keyed
/// by lowercased value so lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct MaskRules {
    pub redaction_token: String,
    pub mask_char: char,
    pub full_mask: HashSet<String>,
    pub partial_mask: HashMap<String, PartialMaskRule>,
    pub skip_if_contains: HashSet<String>,
    pub skip_fields: HashSet<String>,
    pub level_field: Option<String>,
    pub level_map: HashMap<String, String>,
}

impl MaskRules {
    pub fn compile(config: &MaskingConfig) -> Self {
        let level_field = if config.level_field.is_empty() {
            None
        } else {
            Some(config.level_field.clone())
        };
        Self {
            redaction_token: config.redaction_token.clone(),
            mask_char: config.mask_char,
            full_mask: config.full_mask.iter().cloned().collect(),
            partial_mask: config.partial_mask.clone(),
            skip_if_contains: config.skip_if_contains.iter().cloned().collect(),
            skip_fields: config.skip_fields.iter().cloned().collect(),
            level_field,
            level_map: config
                .level_map
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        }
    }

    pub fn is_level_field(&self, name: &str) -> bool {
        self.level_field.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_lowercases_level_map_keys() {
        let mut config = MaskingConfig::default();
        config.level_map.clear();
        config.level_map.insert("WaRn".to_string(), "WARNING".to_string());

        let rules = MaskRules::compile(&config);
        assert_eq!(rules.level_map.get("warn").map(String::as_str), Some("WARNING"));
    }

    #[test]
    fn test_compile_empty_level_field_disables_normalization() {
        let mut config = MaskingConfig::default();
        config.level_field = "".to_string();

        let rules = MaskRules::compile(&config);
        assert!(rules.level_field.is_none());
        assert!(!rules.is_level_field("level"));
    }
}
