//! Engine — per-line sanitization: parse, skip, mask, normalize, re-emit.
//!
//! Records are JSON objects. `serde_json` is built with `preserve_order`,
//! so a parsed object is an ordered (field name, value) sequence and the
//! re-serialized record keeps the original field appearance order.

use serde_json::{Map, Value};

use crate::conf::{MaskingConfig, PartialMaskRule};
use super::rules::MaskRules;

/// Why a line produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Line is not valid JSON.
    Unparseable,
    /// Line parsed, but not to a key/value record.
    NotARecord,
    /// A skip-if-contains field was present.
    SkippedRecord,
    /// Re-serialization failed.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Sanitized record, serialized without a trailing terminator.
    Emit(String),
    Drop(DropReason),
}

pub struct MaskEngine {
    rules: MaskRules,
}

impl MaskEngine {
    pub fn new(config: &MaskingConfig) -> Self {
        Self { rules: MaskRules::compile(config) }
    }

    /// Sanitize one raw line. Fail-safe by construction: every internal
    /// failure maps to a `Drop`, never a propagated error — one bad record
    /// must never stop backup of the rest of the file.
    pub fn sanitize_line(&self, raw: &str) -> LineOutcome {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => return LineOutcome::Drop(DropReason::Unparseable),
        };
        let Value::Object(record) = value else {
            return LineOutcome::Drop(DropReason::NotARecord);
        };

        // Checked before any transformation and before field removal.
        if record.keys().any(|name| self.rules.skip_if_contains.contains(name.as_str())) {
            return LineOutcome::Drop(DropReason::SkippedRecord);
        }

        let mut sanitized = Map::new();
        for (name, value) in record {
            if self.rules.skip_fields.contains(name.as_str()) {
                continue;
            }
            let value = if self.rules.full_mask.contains(name.as_str()) {
                Value::String(self.rules.redaction_token.clone())
            } else if let Some(rule) = self.rules.partial_mask.get(name.as_str()) {
                self.apply_partial(value, rule)
            } else if self.rules.is_level_field(&name) {
                self.normalize_level(value)
            } else {
                value
            };
            sanitized.insert(name, value);
        }

        match serde_json::to_string(&Value::Object(sanitized)) {
            Ok(line) => LineOutcome::Emit(line),
            Err(_) => LineOutcome::Drop(DropReason::Internal),
        }
    }

    /// Partial masking applies to the character sequence of the value.
    /// Numbers and booleans are masked via their display form; null and
    /// nested structures have no meaningful interior and pass through.
    fn apply_partial(&self, value: Value, rule: &PartialMaskRule) -> Value {
        let text = match &value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return value,
        };
        match mask_interior(&text, rule, self.rules.mask_char) {
            Some(masked) => Value::String(masked),
            // Too short to mask meaningfully: unmodified, original type kept.
            None => value,
        }
    }

    /// Case-insensitive lookup; unmapped or non-string values pass through
    /// verbatim and never cause a drop.
    fn normalize_level(&self, value: Value) -> Value {
        if let Value::String(level) = &value {
            if let Some(mapped) = self.rules.level_map.get(&level.to_lowercase()) {
                return Value::String(mapped.clone());
            }
        }
        value
    }
}

/// Keep the first `visible_start` and last `visible_end` characters and
/// replace the strict interior with the mask character, one per character
/// removed. Returns `None` when nothing would be removed.
fn mask_interior(text: &str, rule: &PartialMaskRule, mask_char: char) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let head = rule.visible_start.min(len);
    let tail = rule.visible_end.min(len - head);
    let removed = len - head - tail;
    if removed == 0 {
        return None;
    }
    let mut masked = String::with_capacity(len);
    masked.extend(&chars[..head]);
    masked.extend(std::iter::repeat(mask_char).take(removed));
    masked.extend(&chars[len - tail..]);
    Some(masked)
}
