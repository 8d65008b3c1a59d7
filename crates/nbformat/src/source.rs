//! Conversion between the two on-disk shapes of multiline text and the single
//! canonical `String` used in memory.
//!
//! nbformat allows `source` (and several output fields) to be stored either as
//! one string or as an array of line fragments. Fragments already carry their
//! own `\n` terminators, so joining never inserts a separator.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// How multiline text is written back out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceStyle {
    /// One array element per line, each keeping its trailing `\n`.
    #[default]
    Lines,
    /// A single string.
    Joined,
}

/// Concatenate line fragments in order.
pub fn join_fragments<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .fold(String::new(), |mut acc, fragment| {
            acc.push_str(fragment.as_ref());
            acc
        })
}

/// Split text into fragments that keep their line terminators.
///
/// An empty string yields no fragments, matching what the Python writer emits.
pub fn to_fragments(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

/// Normalise a raw JSON `source` value into a plain `String`.
///
/// Returns `None` for anything that is neither a string nor an array made
/// entirely of strings.
pub fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(arr) => arr
            .iter()
            .map(|v| v.as_str())
            .collect::<Option<Vec<&str>>>()
            .map(join_fragments),
        _ => None,
    }
}

/// Lines of `text` as addressed by line numbers: split on `\n`, so text ending
/// in a newline has an empty final line and empty text has one empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Deserialize a field that can be either a string or an array of strings
/// into one joined `String`.
pub fn deserialize_source<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct SourceVisitor;

    impl<'de> serde::de::Visitor<'de> for SourceVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or an array of strings")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut joined = String::new();
            while let Some(fragment) = seq.next_element::<String>()? {
                joined.push_str(&fragment);
            }
            Ok(joined)
        }
    }

    deserializer.deserialize_any(SourceVisitor)
}

/// Serialize canonical text as line fragments.
pub fn serialize_source<S>(source: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    to_fragments(source).serialize(serializer)
}
