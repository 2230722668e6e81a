use std::{fmt, slice};

use serde::{Serialize, Serializer, ser::SerializeMap};

/// A column key: either a declared/inferred name or a positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderKey::Name(name) => f.write_str(name),
            HeaderKey::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for HeaderKey {
    fn from(name: &str) -> Self {
        HeaderKey::Name(name.to_string())
    }
}

impl From<String> for HeaderKey {
    fn from(name: String) -> Self {
        HeaderKey::Name(name)
    }
}

impl From<usize> for HeaderKey {
    fn from(index: usize) -> Self {
        HeaderKey::Index(index)
    }
}

impl Serialize for HeaderKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeaderKey::Name(name) => serializer.serialize_str(name),
            HeaderKey::Index(index) => serializer.collect_str(index),
        }
    }
}

/// Ordered column keys of a CSV session.
///
/// Keys are unique by position only: a header row such as `a,a` yields two
/// distinct columns that happen to share a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<HeaderKey>);

impl Headers {
    pub fn new(keys: Vec<HeaderKey>) -> Self {
        Headers(keys)
    }

    /// Positional keys `0..width`.
    pub fn positional(width: usize) -> Self {
        Headers((0..width).map(HeaderKey::Index).collect())
    }

    /// Headers taken from a header row; blank fields become empty names.
    pub fn from_raw(raw: RawRecord) -> Self {
        Headers(
            raw.into_iter()
                .map(|field| HeaderKey::Name(field.unwrap_or_default()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &HeaderKey) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> slice::Iter<'_, HeaderKey> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[HeaderKey] {
        &self.0
    }

    /// Copy of these headers widened with positional keys up to `width`.
    pub fn extended_to(&self, width: usize) -> Headers {
        let mut keys = self.0.clone();
        keys.extend((self.len()..width).map(HeaderKey::Index));
        Headers(keys)
    }

    /// Rewrites every key, e.g. to normalise header names after reading them.
    pub fn map<F>(&self, f: F) -> Headers
    where
        F: FnMut(&HeaderKey) -> HeaderKey,
    {
        Headers(self.0.iter().map(f).collect())
    }
}

impl<K: Into<HeaderKey>> FromIterator<K> for Headers {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Headers(iter.into_iter().map(Into::into).collect())
    }
}

impl<'h> IntoIterator for &'h Headers {
    type Item = &'h HeaderKey;
    type IntoIter = slice::Iter<'h, HeaderKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Fields of one physical record before header mapping. `None` marks a
/// field that is absent rather than empty (a blank line is `[None]`).
pub type RawRecord = Vec<Option<String>>;

/// One CSV row keyed by column.
///
/// Entries keep insertion order. Reading produces one entry per header in
/// header order; the writer accepts entries in any order and reorders them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedRecord {
    fields: Vec<(HeaderKey, Option<String>)>,
}

impl NamedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record keyed `0, 1, 2, ...` from plain values.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| (HeaderKey::Index(index), value))
            .collect()
    }

    pub(crate) fn zip(headers: &Headers, raw: RawRecord) -> Self {
        NamedRecord {
            fields: headers.iter().cloned().zip(raw).collect(),
        }
    }

    /// Sets `key` to `value`, replacing an existing entry for the same key.
    pub fn insert(&mut self, key: impl Into<HeaderKey>, value: impl Into<String>) {
        self.put(key.into(), Some(value.into()));
    }

    /// Sets `key` to a null field.
    pub fn insert_null(&mut self, key: impl Into<HeaderKey>) {
        self.put(key.into(), None);
    }

    fn put(&mut self, key: HeaderKey, value: Option<String>) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Value of the first entry for `key`. The outer `Option` is `None` when
    /// the key is absent, the inner one when the field itself is null.
    pub fn get<K: Into<HeaderKey>>(&self, key: K) -> Option<Option<&str>> {
        self.value_of(&key.into())
    }

    pub(crate) fn value_of(&self, key: &HeaderKey) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_deref())
    }

    pub fn contains_key(&self, key: &HeaderKey) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &HeaderKey> {
        self.fields.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.fields.iter().map(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderKey, Option<&str>)> {
        self.fields.iter().map(|(key, value)| (key, value.as_deref()))
    }
}

impl<K, V> FromIterator<(K, V)> for NamedRecord
where
    K: Into<HeaderKey>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = NamedRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for NamedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing_key() {
        let mut record = NamedRecord::new();
        record.insert("name", "Alice");
        record.insert("id", "1");
        record.insert("name", "Bob");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(Some("Bob")));
        assert_eq!(
            record.keys().cloned().collect::<Vec<_>>(),
            vec![HeaderKey::from("name"), HeaderKey::from("id")]
        );
    }

    #[test]
    fn get_distinguishes_absent_from_null() {
        let mut record = NamedRecord::new();
        record.insert_null(2usize);

        assert_eq!(record.get(2usize), Some(None));
        assert_eq!(record.get(3usize), None);
    }

    #[test]
    fn zip_keeps_duplicate_header_names() {
        let headers = Headers::from_iter(["a", "a"]);
        let record = NamedRecord::zip(&headers, vec![Some("1".into()), Some("2".into())]);

        assert_eq!(record.len(), 2);
        assert_eq!(record.values().collect::<Vec<_>>(), vec![Some("1"), Some("2")]);
    }

    #[test]
    fn extended_headers_append_positional_keys() {
        let headers = Headers::from_iter(["a", "b", "c"]);
        let extended = headers.extended_to(5);

        assert_eq!(headers.len(), 3);
        assert_eq!(
            extended.as_slice(),
            &[
                HeaderKey::from("a"),
                HeaderKey::from("b"),
                HeaderKey::from("c"),
                HeaderKey::Index(3),
                HeaderKey::Index(4),
            ]
        );
    }

    #[test]
    fn serializes_as_map() -> Result<(), serde_json::Error> {
        let mut record = NamedRecord::positional(["x", "y"]);
        record.insert_null("z");

        assert_eq!(
            serde_json::to_string(&record)?,
            r#"{"0":"x","1":"y","z":null}"#
        );
        Ok(())
    }
}
