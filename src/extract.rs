//! # Value Extraction
//!
//! Flattens structured secret payloads into hierarchical key/value entries.
//!
//! ```text
//! {"a": {"b": [1, "x", true]}}   with prefix "root"
//!
//! root:a:b:0 = 1
//! root:a:b:1 = x
//! root:a:b:2 = true
//! ```
//!
//! Flattening is lazy and deterministic: object properties are visited in
//! source order and array elements by ascending index, so the same value
//! always yields the same sequence. Keys are unique within one flattening
//! because every child extends its parent prefix with a distinct segment.

use crate::constants::KEY_DELIMITER;
use crate::snapshot::ConfigurationEntry;
use serde_json::Value;

/// Classified secret payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The payload parsed as JSON
    Structured(Value),
    /// The payload is not JSON and is used verbatim
    Scalar(String),
}

impl Payload {
    /// Classify a raw secret string
    ///
    /// A strict JSON parse decides. Any JSON value, including a bare top-level
    /// number, string or boolean, is structured; everything else is scalar.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Payload::Structured(value),
            Err(_) => Payload::Scalar(raw.to_string()),
        }
    }

    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Structured(_))
    }

    /// Check if the payload is a JSON object or array
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(
            self,
            Payload::Structured(Value::Object(_) | Value::Array(_))
        )
    }

    /// Entries for this payload rooted at `root_key`
    #[must_use]
    pub fn entries(&self, root_key: &str) -> Vec<ConfigurationEntry> {
        match self {
            Payload::Structured(value) => flatten(value, root_key).collect(),
            Payload::Scalar(raw) => vec![ConfigurationEntry::new(root_key, raw.clone())],
        }
    }
}

/// Lazily flatten `value` under `prefix`
///
/// - objects recurse with `prefix:property`
/// - arrays recurse with `prefix:index`
/// - strings are emitted verbatim
/// - numbers keep their digits (`1.50` stays `1.50`, big integers are not
///   rounded); exponents come out in serde_json's form, e.g. `1e3` as `1e+3`
/// - booleans become `true` / `false`
/// - `null` becomes an empty string (key present, no value)
///
/// Empty objects and arrays produce no entries.
pub fn flatten<'a>(value: &'a Value, prefix: &str) -> Flatten<'a> {
    Flatten {
        stack: vec![(prefix.to_string(), value)],
    }
}

/// Iterator returned by [`flatten`]
///
/// Depth-first with an explicit stack; children are pushed in reverse so
/// they pop in source order.
#[derive(Debug, Clone)]
pub struct Flatten<'a> {
    stack: Vec<(String, &'a Value)>,
}

impl Iterator for Flatten<'_> {
    type Item = ConfigurationEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, value)) = self.stack.pop() {
            match value {
                Value::Object(map) => {
                    for (property, child) in map.iter().rev() {
                        self.stack.push((child_key(&key, property), child));
                    }
                }
                Value::Array(items) => {
                    for (index, child) in items.iter().enumerate().rev() {
                        self.stack.push((child_key(&key, &index.to_string()), child));
                    }
                }
                Value::String(s) => return Some(ConfigurationEntry::new(key, s.clone())),
                Value::Number(n) => return Some(ConfigurationEntry::new(key, n.to_string())),
                Value::Bool(b) => return Some(ConfigurationEntry::new(key, b.to_string())),
                Value::Null => return Some(ConfigurationEntry::new(key, String::new())),
            }
        }
        None
    }
}

fn child_key(prefix: &str, segment: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + KEY_DELIMITER.len() + segment.len());
    key.push_str(prefix);
    key.push_str(KEY_DELIMITER);
    key.push_str(segment);
    key
}
