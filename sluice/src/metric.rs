//! The metric contract consumed by the encoder, and a line-protocol record
//! that satisfies it.
//!
//! The encoder never looks inside a metric. It only needs the exact encoded
//! size, a way to copy the encoding into a buffer that is known to be large
//! enough, and a way to get a fresh owned copy of the encoding when it has to
//! split a metric across several reads.
//!
//! # Wire format
//!
//! [`LineMetric`] produces one line per metric:
//!
//! ```text
//! measurement[,tag_key=tag_value...] field_key=field_value[,...] timestamp\n
//! ```
//!
//! Tags are sorted by key. Fields keep the order they were given in.

use std::fmt::Write as _;

use crate::error::{Result, SluiceError};

/// A record with a fixed byte encoding.
///
/// Implementations must return the same bytes from [`copy_to`](Metric::copy_to)
/// and [`serialize`](Metric::serialize), and exactly
/// [`encoded_len`](Metric::encoded_len) of them.
pub trait Metric {
    /// Exact size of the encoding in bytes.
    fn encoded_len(&self) -> usize;

    /// Writes the full encoding to the start of `buf` and returns the number
    /// of bytes written.
    ///
    /// Callers guarantee `buf.len() >= self.encoded_len()`.
    fn copy_to(&self, buf: &mut [u8]) -> usize;

    /// Returns a freshly allocated copy of the full encoding.
    fn serialize(&self) -> Vec<u8>;
}

/// A field value in line protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Signed integer, written with an `i` suffix.
    Int(i64),
    /// Unsigned integer, written with a `u` suffix.
    UInt(u64),
    /// Floating point value. Non-finite values cannot be represented and are dropped.
    Float(f64),
    /// Boolean, written as `true`/`false`.
    Bool(bool),
    /// String, written double-quoted.
    Str(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A single line-protocol metric, encoded once at construction.
///
/// Cloning is the way to duplicate a metric when building batches; the clone
/// owns its own copy of the encoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMetric {
    name: String,
    line: Vec<u8>,
}

impl LineMetric {
    /// Builds and encodes a metric.
    ///
    /// `timestamp` is in nanoseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::NoFields` if `fields` is empty or every field is
    /// a non-finite float.
    pub fn new<K, V>(
        name: &str,
        tags: &[(K, V)],
        fields: &[(&str, FieldValue)],
        timestamp: i64,
    ) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut line = String::with_capacity(64);
        escape_into(&mut line, name, &[',', ' ']);

        let mut sorted: Vec<(&str, &str)> =
            tags.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in sorted {
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        let mut written = 0usize;
        for (key, value) in fields {
            if let FieldValue::Float(f) = value
                && !f.is_finite()
            {
                continue;
            }
            line.push(if written == 0 { ' ' } else { ',' });
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            write_field_value(&mut line, value);
            written += 1;
        }

        if written == 0 {
            return Err(SluiceError::NoFields {
                measurement: name.to_string(),
            });
        }

        // Writing to a String cannot fail.
        let _ = writeln!(line, " {timestamp}");

        Ok(Self {
            name: name.to_string(),
            line: line.into_bytes(),
        })
    }

    /// Returns the measurement name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the encoded line, including the trailing newline.
    pub fn as_bytes(&self) -> &[u8] {
        &self.line
    }
}

impl Metric for LineMetric {
    fn encoded_len(&self) -> usize {
        self.line.len()
    }

    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`encoded_len`](Metric::encoded_len).
    fn copy_to(&self, buf: &mut [u8]) -> usize {
        let n = self.line.len();
        buf[..n].copy_from_slice(&self.line);
        n
    }

    fn serialize(&self) -> Vec<u8> {
        self.line.clone()
    }
}

fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn write_field_value(out: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Int(v) => {
            let _ = write!(out, "{v}i");
        }
        FieldValue::UInt(v) => {
            let _ = write!(out, "{v}u");
        }
        FieldValue::Float(v) => {
            let _ = write!(out, "{v}");
        }
        FieldValue::Bool(v) => {
            let _ = write!(out, "{v}");
        }
        FieldValue::Str(v) => {
            out.push('"');
            for c in v.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_TAGS: &[(&str, &str)] = &[];

    #[test]
    fn test_simple_int_metric() {
        let m = LineMetric::new(
            "foo",
            NO_TAGS,
            &[("value", FieldValue::Int(1))],
            1_481_032_190_000_000_000,
        )
        .unwrap();

        assert_eq!(m.as_bytes(), b"foo value=1i 1481032190000000000\n");
        assert_eq!(m.encoded_len(), 33);
        assert_eq!(m.name(), "foo");
    }

    #[test]
    fn test_tags_sorted_fields_ordered() {
        let m = LineMetric::new(
            "cpu",
            &[("region", "us-east"), ("host", "web1")],
            &[
                ("usage_user", FieldValue::Float(12.5)),
                ("cores", FieldValue::UInt(8)),
                ("online", FieldValue::Bool(true)),
            ],
            42,
        )
        .unwrap();

        assert_eq!(
            m.as_bytes(),
            b"cpu,host=web1,region=us-east usage_user=12.5,cores=8u,online=true 42\n"
        );
    }

    #[test]
    fn test_escaping() {
        let m = LineMetric::new(
            "disk usage,total",
            &[("path", "/mnt/my disk"), ("k=v", "a,b")],
            &[("note", FieldValue::from(r#"say "hi" \o/"#))],
            7,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(m.serialize()).unwrap(),
            "disk\\ usage\\,total,k\\=v=a\\,b,path=/mnt/my\\ disk note=\"say \\\"hi\\\" \\\\o/\" 7\n"
        );
    }

    #[test]
    fn test_non_finite_floats_dropped() {
        let m = LineMetric::new(
            "m",
            NO_TAGS,
            &[("a", FieldValue::Float(f64::NAN)), ("b", FieldValue::Int(3))],
            1,
        )
        .unwrap();
        assert_eq!(m.as_bytes(), b"m b=3i 1\n");

        let err = LineMetric::new("m", NO_TAGS, &[("a", FieldValue::Float(f64::INFINITY))], 1)
            .unwrap_err();
        assert!(matches!(err, SluiceError::NoFields { .. }));
    }

    #[test]
    fn test_no_fields_rejected() {
        let err = LineMetric::new("empty", NO_TAGS, &[], 1).unwrap_err();
        assert!(matches!(err, SluiceError::NoFields { measurement } if measurement == "empty"));
    }

    #[test]
    fn test_copy_to_matches_serialize() {
        let m = LineMetric::new("foo", NO_TAGS, &[("value", FieldValue::Int(10))], 5).unwrap();
        let mut buf = vec![0u8; 64];
        let n = m.copy_to(&mut buf);
        assert_eq!(n, m.encoded_len());
        assert_eq!(&buf[..n], m.serialize().as_slice());
    }

    #[test]
    fn test_clone_is_independent_duplicate() {
        let m = LineMetric::new("foo", NO_TAGS, &[("value", FieldValue::Int(10))], 5).unwrap();
        let dup = m.clone();
        assert_eq!(dup, m);
        assert_eq!(dup.serialize(), m.serialize());
    }
}
