use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// A mapping from keys to an ordered list of values.
///
/// Keys keep the order they were first inserted in and a repeated key
/// appends to its list instead of overwriting it, which is what HTTP
/// headers, query strings and form bodies need. Lookups go through a hash
/// index, so filling the map stays linear in the number of pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMap<V = String> {
    entries: Vec<(String, Vec<V>)>,
    index: HashMap<String, usize>,
    // ASCII-lowercased key -> positions in `entries`, ascending
    folded: HashMap<String, Vec<usize>>,
}

impl<V> Default for MultiMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            folded: HashMap::new(),
        }
    }
}

impl<V> MultiMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the values stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some(&pos) = self.index.get(&key) {
            self.entries[pos].1.push(value);
            return;
        }

        let pos = self.entries.len();
        self.folded
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(pos);
        self.index.insert(key.clone(), pos);
        self.entries.push((key, vec![value]));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.get_all(key).first()
    }

    /// Most recently inserted value stored under `key`.
    pub fn get_last(&self, key: &str) -> Option<&V> {
        self.get_all(key).last()
    }

    pub fn get_all(&self, key: &str) -> &[V] {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.as_slice())
            .unwrap_or(&[])
    }

    fn folded_positions(&self, key: &str) -> &[usize] {
        self.folded
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Like `get_all`, but keys are compared ignoring ASCII case.
    /// Values under differently-cased spellings are returned in key order.
    pub fn get_all_ignore_ascii_case(&self, key: &str) -> Vec<&V> {
        self.folded_positions(key)
            .iter()
            .flat_map(|&pos| self.entries[pos].1.iter())
            .collect()
    }

    pub fn get_last_ignore_ascii_case(&self, key: &str) -> Option<&V> {
        self.folded_positions(key)
            .last()
            .and_then(|&pos| self.entries[pos].1.last())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Every key/value pair, grouped by key in insertion order.
    pub fn iter_flat(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v)))
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for MultiMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MultiMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for MultiMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, values) in &self.entries {
            map.serialize_entry(k, values)?;
        }
        map.end()
    }
}
