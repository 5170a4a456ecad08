//! Terms: the atomic unit of the inverted index.

use std::fmt;

use crate::numeric;

/// A `(field, bytes)` pair.
///
/// Text tokens are stored as their UTF-8 bytes and integers as the
/// order-preserving encoding from [`numeric`]. Terms order by field name
/// first and bytes second, so all terms of one field form a contiguous,
/// byte-ordered run in the term dictionary.
///
/// ```
/// use halberd::index::term::Term;
///
/// let a = Term::text("name", "apple");
/// let b = Term::text("name", "banana");
/// let c = Term::text("path", "aardvark");
/// assert!(a < b && b < c);
///
/// assert!(Term::integer("size", -5) < Term::integer("size", 3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    field: String,
    bytes: Vec<u8>,
}

impl Term {
    /// Create a term from raw bytes.
    pub fn new<S: Into<String>>(field: S, bytes: Vec<u8>) -> Self {
        Term {
            field: field.into(),
            bytes,
        }
    }

    /// Create a text term.
    pub fn text<S: Into<String>, T: AsRef<str>>(field: S, text: T) -> Self {
        Term::new(field, text.as_ref().as_bytes().to_vec())
    }

    /// Create a numerically encoded term.
    pub fn integer<S: Into<String>>(field: S, value: i64) -> Self {
        Term::new(field, numeric::encode_i64(value).to_vec())
    }

    /// The field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The term bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The term as text, if the bytes are valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.as_text() {
            return write!(f, "{}:{}", self.field, text);
        }
        match numeric::decode_i64(&self.bytes) {
            Ok(value) => write!(f, "{}:{}", self.field, value),
            Err(_) => {
                write!(f, "{}:", self.field)?;
                for byte in &self.bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_field_then_bytes() {
        let mut terms = vec![
            Term::text("b", "a"),
            Term::text("a", "z"),
            Term::text("a", "b"),
        ];
        terms.sort();
        assert_eq!(
            terms,
            vec![Term::text("a", "b"), Term::text("a", "z"), Term::text("b", "a")]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::text("name", "lucene").to_string(), "name:lucene");
        assert_eq!(Term::integer("size", 5000).to_string(), "size:5000");
        assert_eq!(Term::new("raw", vec![0xff, 0x01]).to_string(), "raw:ff01");
    }
}
