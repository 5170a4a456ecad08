//! Field definitions and values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};

/// Whether a field's original value is kept for retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Store {
    /// Keep the value; it is returned with search hits.
    Yes,
    /// Index only.
    No,
}

impl Store {
    fn is_yes(self) -> bool {
        matches!(self, Store::Yes)
    }
}

/// The value of a field.
///
/// ```
/// use halberd::document::FieldValue;
///
/// let value = FieldValue::Integer(100);
/// assert_eq!(value.as_integer(), Some(100));
/// assert_eq!(value.as_text(), None);
///
/// let text = FieldValue::from("lucene");
/// assert_eq!(text.as_text(), Some("lucene"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value.
    Text(String),
    /// Signed 64-bit integer value.
    Integer(i64),
}

impl FieldValue {
    /// Build a text value from raw bytes that should be UTF-8.
    ///
    /// Malformed input is reported as an analysis error naming the field and
    /// the byte offset of the first invalid sequence. During batch ingestion
    /// such an error only skips the offending document.
    pub fn text_from_utf8(field: &str, bytes: Vec<u8>) -> Result<Self> {
        String::from_utf8(bytes)
            .map(FieldValue::Text)
            .map_err(|e| {
                HalberdError::analysis(format!(
                    "field '{field}': invalid UTF-8 at byte {}",
                    e.utf8_error().valid_up_to()
                ))
            })
    }

    /// Convert to text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Integer(_) => None,
        }
    }

    /// Convert to an integer if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// How a field is indexed and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Whether to make this field searchable.
    pub indexed: bool,

    /// Whether to run text through the analyzer. Untokenized text is indexed
    /// as a single term equal to the whole value.
    pub tokenized: bool,

    /// Whether to store the original value.
    pub stored: bool,
}

/// A named value inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    value: FieldValue,
    option: FieldOption,
}

impl Field {
    /// Create a field with explicit options.
    pub fn new<S: Into<String>>(name: S, value: FieldValue, option: FieldOption) -> Self {
        Field {
            name: name.into(),
            value,
            option,
        }
    }

    /// Analyzed full-text field.
    pub fn text<S: Into<String>, T: Into<String>>(name: S, value: T, store: Store) -> Self {
        Self::new(
            name,
            FieldValue::Text(value.into()),
            FieldOption {
                indexed: true,
                tokenized: true,
                stored: store.is_yes(),
            },
        )
    }

    /// Exact-match field indexed as one term (identifiers, paths, tags).
    pub fn string<S: Into<String>, T: Into<String>>(name: S, value: T, store: Store) -> Self {
        Self::new(
            name,
            FieldValue::Text(value.into()),
            FieldOption {
                indexed: true,
                tokenized: false,
                stored: store.is_yes(),
            },
        )
    }

    /// Stored-only field; not searchable.
    pub fn stored<S: Into<String>>(name: S, value: impl Into<FieldValue>) -> Self {
        Self::new(
            name,
            value.into(),
            FieldOption {
                indexed: false,
                tokenized: false,
                stored: true,
            },
        )
    }

    /// Integer field searchable with numeric range and exact-value queries.
    pub fn integer<S: Into<String>>(name: S, value: i64, store: Store) -> Self {
        Self::new(
            name,
            FieldValue::Integer(value),
            FieldOption {
                indexed: true,
                tokenized: false,
                stored: store.is_yes(),
            },
        )
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field value.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// The indexing options.
    pub fn option(&self) -> FieldOption {
        self.option
    }

    /// Whether this field is searchable.
    pub fn is_indexed(&self) -> bool {
        self.option.indexed
    }

    /// Whether this field's text goes through the analyzer.
    pub fn is_tokenized(&self) -> bool {
        self.option.tokenized
    }

    /// Whether this field's value is kept for retrieval.
    pub fn is_stored(&self) -> bool {
        self.option.stored
    }
}

/// A stored field value as returned from the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    /// Field name.
    pub name: String,
    /// Stored value.
    pub value: FieldValue,
}

impl StoredField {
    /// Create a stored field.
    pub fn new<S: Into<String>>(name: S, value: FieldValue) -> Self {
        StoredField {
            name: name.into(),
            value,
        }
    }
}
