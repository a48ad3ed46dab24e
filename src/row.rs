// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use indexmap::IndexMap;

/// An ordered `key -> value` mapping derived from a log event's indices.
///
/// Backed by an [`IndexMap`] rather than a `HashMap` so that insertion
/// order is preserved and observable, matching the ordering guarantees the
/// core's invariants rely on (projection order, rename round-trips).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Row {
    entries: IndexMap<String, String>,
}

impl Row {
    /// An empty row.
    pub fn new() -> Self {
        Row {
            entries: IndexMap::new(),
        }
    }

    /// Looks up `key`. Returns `None` if absent; the caller decides whether
    /// that should degrade to the empty string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Inserts or overwrites `key`. Overwriting an existing key keeps its
    /// original position, matching `IndexMap::insert`'s native behavior.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a `Row` from a host's `key -> dyn value` map, failing fast if
    /// any value is not a string. The core's invariant (spec'd in the
    /// design notes) is that indices are string-only; a host that cannot
    /// guarantee this is misconfigured, so this is a hard failure rather
    /// than a silently degraded row.
    pub fn try_from_string_map<I, K, V>(entries: I) -> Result<Row, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: TryInto<String>,
        V::Error: std::fmt::Display,
    {
        let mut row = Row::new();
        for (k, v) in entries {
            let value = v
                .try_into()
                .map_err(|e| format!("non-string indices value: {e}"))?;
            row.insert(k.into(), value);
        }
        Ok(row)
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Row {
            entries: IndexMap::from_iter(iter),
        }
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut row = Row::new();
        row.insert("b", "2");
        row.insert("a", "1");
        let keys: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut row = Row::new();
        row.insert("a", "1");
        row.insert("b", "2");
        row.insert("a", "3");
        let pairs: Vec<(&str, &str)> = row.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn missing_key_is_none() {
        let row = Row::new();
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn try_from_string_map_accepts_string_values() {
        let row = Row::try_from_string_map(vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ])
        .unwrap();
        assert_eq!(row.get("a"), Some("1"));
        assert_eq!(row.get("b"), Some("2"));
    }

    #[test]
    fn try_from_string_map_rejects_non_string_value() {
        struct NotAString;
        impl TryInto<String> for NotAString {
            type Error = String;
            fn try_into(self) -> Result<String, String> {
                Err("not a string".to_string())
            }
        }
        let err = Row::try_from_string_map(vec![("a".to_string(), NotAString)]).unwrap_err();
        assert!(err.contains("non-string indices value"));
    }
}
