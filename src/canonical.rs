//! Canonical JSON rendering.
//!
//! Object keys are sorted by UTF-16 code units at every depth, the order
//! JavaScript's default string comparison produces, and output is indented
//! with a fixed number of spaces. Equal values always render to identical
//! text.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::ser::PrettyFormatter;
use serde_json::value::RawValue;
use serde_json::Value;
use std::cmp::Ordering;

use crate::static_eval::number_to_js_string;

/// Indentation used for snapshot files.
pub const DEFAULT_INDENT: usize = 4;

struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Canonical(item))?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut sorted: Vec<_> = entries.iter().collect();
                sorted.sort_by(|(a, _), (b, _)| utf16_cmp(a, b));
                let mut map = serializer.serialize_map(Some(sorted.len()))?;
                for (key, value) in sorted {
                    map.serialize_entry(key, &Canonical(value))?;
                }
                map.end()
            }
            Value::Number(number) => match number.as_f64() {
                // Doubles print the way `JSON.stringify` writes them.
                Some(float) if number.is_f64() => {
                    let text = number_to_js_string(float);
                    RawValue::from_string(text)
                        .map_err(<S::Error as serde::ser::Error>::custom)?
                        .serialize(serializer)
                }
                _ => number.serialize(serializer),
            },
            scalar => scalar.serialize(serializer),
        }
    }
}

fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// Render `value` with sorted keys. An `indent` of 0 gives compact output.
/// No trailing newline is written.
pub fn to_canonical_string(value: &Value, indent: usize) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    if indent == 0 {
        let mut ser = serde_json::Serializer::new(&mut out);
        Canonical(value).serialize(&mut ser)?;
    } else {
        let pad = " ".repeat(indent);
        let formatter = PrettyFormatter::with_indent(pad.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        Canonical(value).serialize(&mut ser)?;
    }
    // serde_json only emits valid UTF-8.
    String::from_utf8(out).map_err(|e| serde::ser::Error::custom(e.to_string()))
}
