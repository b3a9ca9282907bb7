//! # Snapshots
//!
//! The result of one load cycle and its materialised key/value view.
//!
//! A [`Snapshot`] is a *set* of `(key, value)` pairs: two secrets producing the
//! same key with different values yield two entries. Conflicts are resolved only
//! when the snapshot is materialised into [`ConfigurationData`], where keys are
//! compared case-insensitively and the entry produced last wins.

use crate::constants::KEY_DELIMITER;
use std::collections::{BTreeMap, HashSet};

/// A single flattened configuration value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigurationEntry {
    pub key: String,
    pub value: String,
}

impl ConfigurationEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Set of unique entries produced by one load cycle
///
/// Insertion order is remembered so materialisation is deterministic, but it
/// plays no part in equality: two snapshots are equal when they hold the same
/// pairs.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<ConfigurationEntry>,
    index: HashSet<ConfigurationEntry>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns `false` if the exact pair was already present
    pub fn insert(&mut self, entry: ConfigurationEntry) -> bool {
        if self.index.contains(&entry) {
            return false;
        }
        self.index.insert(entry.clone());
        self.entries.push(entry);
        true
    }

    #[must_use]
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.index.contains(&ConfigurationEntry::new(key, value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationEntry> {
        self.entries.iter()
    }

    /// Build the case-insensitive key/value view
    #[must_use]
    pub fn materialize(&self) -> ConfigurationData {
        self.entries.iter().cloned().collect()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Snapshot {}

impl FromIterator<ConfigurationEntry> for Snapshot {
    fn from_iter<T: IntoIterator<Item = ConfigurationEntry>>(iter: T) -> Self {
        let mut snapshot = Snapshot::new();
        for entry in iter {
            snapshot.insert(entry);
        }
        snapshot
    }
}

impl Extend<ConfigurationEntry> for Snapshot {
    fn extend<T: IntoIterator<Item = ConfigurationEntry>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

/// Read-only configuration view with case-insensitive keys
///
/// Keys keep the casing of the entry that last wrote them; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationData {
    // folded key -> (original key, value)
    values: BTreeMap<String, (String, String)>,
}

impl ConfigurationData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any key that differs only by case
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.values.insert(fold(&key), (key, value.into()));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&fold(key)).map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&fold(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(key, value)` pairs ordered by folded key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Keys ordered by folded key
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.values().map(|(key, _)| key.as_str())
    }

    /// Sub-tree below `prefix`, with `prefix:` removed from every key
    ///
    /// `section("Database")` turns `Database:Host` into `Host`. The match on the
    /// prefix ignores case like every other lookup.
    #[must_use]
    pub fn section(&self, prefix: &str) -> ConfigurationData {
        let folded = fold(&format!("{prefix}{KEY_DELIMITER}"));
        let mut section = ConfigurationData::new();
        for (folded_key, (key, value)) in self.values.range(folded.clone()..) {
            if !folded_key.starts_with(&folded) {
                break;
            }
            if let Some(child) = strip_folded_prefix(key, folded.len()) {
                section.set(child, value.clone());
            }
        }
        section
    }
}

impl FromIterator<ConfigurationEntry> for ConfigurationData {
    fn from_iter<T: IntoIterator<Item = ConfigurationEntry>>(iter: T) -> Self {
        let mut data = ConfigurationData::new();
        for entry in iter {
            data.set(entry.key, entry.value);
        }
        data
    }
}

fn fold(key: &str) -> String {
    key.chars().flat_map(char::to_lowercase).collect()
}

/// Remainder of `key` once its first `folded_len` folded bytes are consumed
///
/// Lowercasing can change a character's encoded length, so the cut point is
/// found by folding `key` character by character.
fn strip_folded_prefix(key: &str, folded_len: usize) -> Option<&str> {
    let mut consumed = 0;
    for (idx, ch) in key.char_indices() {
        if consumed == folded_len {
            return Some(&key[idx..]);
        }
        if consumed > folded_len {
            return None;
        }
        consumed += ch.to_lowercase().map(char::len_utf8).sum::<usize>();
    }
    (consumed == folded_len).then_some("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: &str) -> ConfigurationEntry {
        ConfigurationEntry::new(key, value)
    }

    #[test]
    fn test_snapshot_deduplicates_exact_pairs_only() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.insert(entry("db:host", "a")));
        assert!(!snapshot.insert(entry("db:host", "a")));
        assert!(snapshot.insert(entry("db:host", "b")));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_equality_ignores_order() {
        let first: Snapshot = vec![entry("a", "1"), entry("b", "2")].into_iter().collect();
        let second: Snapshot = vec![entry("b", "2"), entry("a", "1")].into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_snapshot_inequality_on_single_value_change() {
        let first: Snapshot = vec![entry("a", "1"), entry("b", "2")].into_iter().collect();
        let second: Snapshot = vec![entry("a", "1"), entry("b", "3")].into_iter().collect();
        assert_ne!(first, second);
    }

    #[test]
    fn test_materialize_last_writer_wins_case_insensitive() {
        let snapshot: Snapshot = vec![
            entry("Db:Host", "first"),
            entry("db:host", "second"),
            entry("db:port", "5432"),
        ]
        .into_iter()
        .collect();

        let data = snapshot.materialize();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("DB:HOST"), Some("second"));
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["db:host", "db:port"]);
    }

    #[test]
    fn test_section_strips_prefix() {
        let data: ConfigurationData = vec![
            entry("App:Database:Host", "db.internal"),
            entry("App:Database:Port", "5432"),
            entry("App:Name", "api"),
            entry("Apple", "fruit"),
        ]
        .into_iter()
        .collect();

        let database = data.section("app:database");
        assert_eq!(database.len(), 2);
        assert_eq!(database.get("host"), Some("db.internal"));

        let app = data.section("App");
        assert_eq!(app.len(), 3);
        assert_eq!(app.get("Database:Port"), Some("5432"));
        assert!(!app.contains_key("le"));
    }

    #[test]
    fn test_empty_value_marks_presence() {
        let data: ConfigurationData = vec![entry("optional", "")].into_iter().collect();
        assert!(data.contains_key("optional"));
        assert_eq!(data.get("optional"), Some(""));
        assert_eq!(data.get("missing"), None);
    }
}
