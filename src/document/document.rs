//! Document structures: input documents and stored documents.

use serde::{Deserialize, Serialize};

use crate::document::field::{Field, FieldValue, Store, StoredField};

/// A document to be indexed.
///
/// Fields keep their insertion order and names may repeat.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    /// Create a builder for a document.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// Append a field.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// The value of the first field with the given name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name() == name)
            .map(Field::value)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name() == name)
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Add a field.
    pub fn add(mut self, field: Field) -> Self {
        self.document.add_field(field);
        self
    }

    /// Add an analyzed text field.
    pub fn add_text<S: Into<String>, T: Into<String>>(self, name: S, value: T, store: Store) -> Self {
        self.add(Field::text(name, value, store))
    }

    /// Add an exact-match string field.
    pub fn add_string<S: Into<String>, T: Into<String>>(
        self,
        name: S,
        value: T,
        store: Store,
    ) -> Self {
        self.add(Field::string(name, value, store))
    }

    /// Add an integer field.
    pub fn add_integer<S: Into<String>>(self, name: S, value: i64, store: Store) -> Self {
        self.add(Field::integer(name, value, store))
    }

    /// Add a stored-only field.
    pub fn add_stored<S: Into<String>>(self, name: S, value: impl Into<FieldValue>) -> Self {
        self.add(Field::stored(name, value))
    }

    /// Build the document.
    pub fn build(self) -> Document {
        self.document
    }
}

/// The stored fields of an indexed document, as returned by a searcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    fields: Vec<StoredField>,
}

impl StoredDocument {
    /// Create a stored document from its fields.
    pub fn new(fields: Vec<StoredField>) -> Self {
        StoredDocument { fields }
    }

    /// The first stored value of a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// The first stored value of a field, if it is text.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// The first stored value of a field, if it is an integer.
    pub fn get_integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_integer)
    }

    /// Every stored value of a field, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields
            .iter()
            .filter(move |field| field.name == name)
            .map(|field| &field.value)
    }

    /// All stored fields.
    pub fn fields(&self) -> &[StoredField] {
        &self.fields
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if nothing was stored for this document.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
