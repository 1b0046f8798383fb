//! Request arguments decoded from URL-encoded pairs and multipart fields.
//!
//! Keys use bracket notation, so `application[languageSkills][0][level]=B2`
//! becomes a nested map under the `application` argument. Empty brackets
//! (`files[]`) append at the next numeric index of their parent. Keys nested
//! deeper than [`MAX_KEY_DEPTH`] are dropped.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

/// Most bracket segments a key may carry, the top-level name included.
pub const MAX_KEY_DEPTH: usize = 16;

/// File part of a multipart submission. The content itself stays with the
/// transport; only its description travels with the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedPart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

/// A single argument value: a scalar, an uploaded file or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Scalar(String),
    File(UploadedPart),
    Map(BTreeMap<String, ArgumentValue>),
}

impl ArgumentValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ArgumentValue::Scalar(value) => Some(value),
            ArgumentValue::File(_) | ArgumentValue::Map(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedPart> {
        match self {
            ArgumentValue::File(part) => Some(part),
            ArgumentValue::Scalar(_) | ArgumentValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ArgumentValue>> {
        match self {
            ArgumentValue::Map(map) => Some(map),
            ArgumentValue::Scalar(_) | ArgumentValue::File(_) => None,
        }
    }

    /// Nested lookup on a mapping value. Scalars and files have no children.
    pub fn get(&self, key: &str) -> Option<&ArgumentValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Trimmed, non-empty scalar content.
    pub fn non_empty_scalar(&self) -> Option<&str> {
        self.as_scalar()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Entries of a repeating group ordered by their numeric index.
    ///
    /// Keys that are not numbers sort after the numbered entries.
    pub fn indexed_entries(&self) -> Vec<(&str, &ArgumentValue)> {
        let mut entries: Vec<(&str, &ArgumentValue)> = match self.as_map() {
            Some(map) => map.iter().map(|(key, value)| (key.as_str(), value)).collect(),
            None => return Vec::new(),
        };
        entries.sort_by_key(|(key, _)| (key.parse::<u64>().unwrap_or(u64::MAX), key.to_string()));
        entries
    }
}

/// Arguments of the current request, keyed by top-level argument name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestArguments {
    values: BTreeMap<String, ArgumentValue>,
}

impl RequestArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut arguments = Self::new();
        for (key, value) in pairs {
            arguments.insert(key.as_ref(), value.into());
        }
        arguments
    }

    /// Inserts a raw bracketed key. Later values replace earlier ones.
    pub fn insert(&mut self, raw_key: &str, value: String) {
        self.insert_value(raw_key, ArgumentValue::Scalar(value));
    }

    /// Inserts an uploaded file under a raw bracketed key.
    pub fn insert_file(&mut self, raw_key: &str, part: UploadedPart) {
        self.insert_value(raw_key, ArgumentValue::File(part));
    }

    fn insert_value(&mut self, raw_key: &str, value: ArgumentValue) {
        let Some(segments) = split_key(raw_key) else {
            debug!(depth_limit = MAX_KEY_DEPTH, "dropping over-nested argument key");
            return;
        };
        if segments[0].is_empty() {
            return;
        }

        let mut map = &mut self.values;
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };
        for segment in parents {
            let Some(key) = resolve_segment(map, segment) else {
                return;
            };
            let entry = map
                .entry(key)
                .or_insert_with(|| ArgumentValue::Map(BTreeMap::new()));
            if !matches!(entry, ArgumentValue::Map(_)) {
                *entry = ArgumentValue::Map(BTreeMap::new());
            }
            map = match entry {
                ArgumentValue::Map(child) => child,
                ArgumentValue::Scalar(_) | ArgumentValue::File(_) => return,
            };
        }
        if let Some(key) = resolve_segment(map, last) {
            map.insert(key, value);
        }
    }

    /// Overlays `other`; its top-level arguments replace ours.
    pub fn merge(&mut self, other: RequestArguments) {
        self.values.extend(other.values);
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.values.get(name)
    }

    /// Non-empty scalar value of a top-level argument.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgumentValue::non_empty_scalar)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Splits `a[b][c]` into its segments, or `None` when it nests too deep.
fn split_key(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim();
    let open = match raw.find('[') {
        Some(open) if open > 0 && raw.ends_with(']') => open,
        _ => return Some(vec![raw.to_string()]),
    };

    let inner = &raw[open + 1..raw.len() - 1];
    if inner.matches("][").count() + 2 > MAX_KEY_DEPTH {
        return None;
    }

    let mut segments = vec![raw[..open].to_string()];
    segments.extend(inner.split("][").map(ToString::to_string));
    Some(segments)
}

/// Key for a segment; an empty segment takes the next free numeric index.
fn resolve_segment(map: &BTreeMap<String, ArgumentValue>, segment: &str) -> Option<String> {
    if segment.is_empty() {
        next_index(map)
    } else {
        Some(segment.to_string())
    }
}

fn next_index(map: &BTreeMap<String, ArgumentValue>) -> Option<String> {
    let next = match map.keys().filter_map(|key| key.parse::<u64>().ok()).max() {
        Some(max) => max.checked_add(1)?,
        None => 0,
    };
    Some(next.to_string())
}
