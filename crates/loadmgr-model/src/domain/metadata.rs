use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Request-scoped metadata carried alongside a run context.
///
/// Keys are stored lowercase, the way gRPC metadata treats them. A key may appear more than once; [`Metadata::get`] resolves to the last entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Vec<KeyValue>);

impl Metadata {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build metadata from key–value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut md = Self::new();
        for (k, v) in pairs {
            md.append(k, v);
        }
        md
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Append an entry, keeping earlier values for the same key.
    pub fn append<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into().to_ascii_lowercase();
        self.0.push(KeyValue::new(key, value));
    }

    /// Last value stored under `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key().eq_ignore_ascii_case(key))
            .map(|kv| kv.value())
    }
}
