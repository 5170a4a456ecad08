//! Immutable index segments.
//!
//! A segment is a self-contained partition of the index built from one batch
//! of documents. It holds an ordered term dictionary mapping every [`Term`] to
//! its [`PostingList`], and a dense stored-field array addressed by the
//! segment-local document id. Document ids are assigned from 0 in input order.
//!
//! A segment is persisted as two files, each ending with a CRC32:
//!
//! - `<name>.dict`: term dictionary and postings
//! - `<name>.docs`: stored fields
//!
//! Segments are never modified after [`SegmentBuilder::build`]. Deletions are
//! tracked separately in a [`DeletionSet`](crate::index::deletion::DeletionSet).

use std::collections::BTreeMap;
use std::ops::Bound;

use ahash::AHashMap;
use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::document::{FieldValue, StoredField};
use crate::error::{HalberdError, Result};
use crate::index::posting::PostingList;
use crate::index::term::Term;
use crate::numeric;
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const DICT_MAGIC: u32 = 0x4844_4943; // "HDIC"
const DOCS_MAGIC: u32 = 0x4844_4f43; // "HDOC"
const FORMAT_VERSION: u32 = 1;

const VALUE_TEXT: u8 = 0;
const VALUE_INTEGER: u8 = 1;

/// A document after analysis: its indexed terms (one entry per occurrence)
/// and its stored field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzedDocument {
    /// Indexed terms in token order. Repeats count towards term frequency.
    pub terms: Vec<Term>,
    /// Stored field values in field order.
    pub stored_fields: Vec<StoredField>,
}

/// Segment metadata as recorded in the commit manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Segment name; file names are derived from it.
    pub name: String,
    /// Number of document slots, deleted ones included.
    pub doc_count: u32,
    /// Generation of the persisted deletion set, if the segment has deletions.
    #[serde(default)]
    pub del_gen: Option<u64>,
}

/// Accumulates analyzed documents and builds a [`Segment`].
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    terms: AHashMap<Term, PostingList>,
    stored: Vec<Vec<StoredField>>,
}

impl SegmentBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and return its segment-local id.
    pub fn add(&mut self, doc: &AnalyzedDocument) -> u32 {
        let doc_id = self.stored.len() as u32;
        for term in &doc.terms {
            match self.terms.get_mut(term) {
                Some(postings) => postings.add_occurrence(doc_id),
                None => {
                    let mut postings = PostingList::new();
                    postings.add_occurrence(doc_id);
                    self.terms.insert(term.clone(), postings);
                }
            }
        }
        self.stored.push(doc.stored_fields.clone());
        doc_id
    }

    /// Number of documents added so far.
    pub fn doc_count(&self) -> u32 {
        self.stored.len() as u32
    }

    /// Check if no documents were added.
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Build the immutable segment.
    pub fn build<S: Into<String>>(self, name: S) -> Segment {
        Segment {
            name: name.into(),
            terms: self.terms.into_iter().collect(),
            stored: self.stored,
        }
    }
}

/// An immutable segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    name: String,
    terms: BTreeMap<Term, PostingList>,
    stored: Vec<Vec<StoredField>>,
}

impl Segment {
    /// Assemble a segment from prebuilt parts.
    ///
    /// Every posting must refer to a document below `stored.len()`.
    pub fn from_parts(
        name: String,
        terms: BTreeMap<Term, PostingList>,
        stored: Vec<Vec<StoredField>>,
    ) -> Result<Self> {
        let doc_count = stored.len() as u32;
        for (term, postings) in &terms {
            if postings.iter().any(|p| p.doc_id >= doc_count) {
                return Err(HalberdError::index(format!(
                    "segment {name}: postings for {term} exceed doc count {doc_count}"
                )));
            }
        }
        Ok(Segment {
            name,
            terms,
            stored,
        })
    }

    /// The segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of document slots, deleted ones included.
    pub fn doc_count(&self) -> u32 {
        self.stored.len() as u32
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Postings for a term.
    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        self.terms.get(term)
    }

    /// Iterate the dictionary in term order.
    pub fn terms(&self) -> impl Iterator<Item = (&Term, &PostingList)> {
        self.terms.iter()
    }

    /// Documents containing a numeric term of `field` between the given
    /// encoded bounds, in ascending id order and without repeats.
    ///
    /// Only terms of [`numeric::ENCODED_LEN`] bytes are considered, so text
    /// terms sharing the field never match. `None` leaves that side open.
    pub fn range(
        &self,
        field: &str,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> impl Iterator<Item = u32> + use<> {
        let start = match lower {
            Some(bytes) if lower_inclusive => Bound::Included(Term::new(field, bytes.to_vec())),
            Some(bytes) => Bound::Excluded(Term::new(field, bytes.to_vec())),
            None => Bound::Included(Term::new(field, Vec::new())),
        };

        let mut docs = BitVec::from_elem(self.stored.len(), false);
        let in_field = self
            .terms
            .range((start, Bound::Unbounded))
            .take_while(|(term, _)| term.field() == field)
            .take_while(|(term, _)| match upper {
                Some(bytes) if upper_inclusive => term.bytes() <= bytes,
                Some(bytes) => term.bytes() < bytes,
                None => true,
            });
        let numeric_terms = in_field.filter(|(term, _)| term.bytes().len() == numeric::ENCODED_LEN);
        for (_, postings) in numeric_terms {
            for posting in postings {
                docs.set(posting.doc_id as usize, true);
            }
        }

        docs.into_iter()
            .enumerate()
            .filter_map(|(doc_id, set)| set.then_some(doc_id as u32))
    }

    /// Stored fields of a document.
    pub fn stored_fields(&self, doc_id: u32) -> Option<&[StoredField]> {
        self.stored.get(doc_id as usize).map(Vec::as_slice)
    }

    /// File names for a segment.
    pub fn file_names(name: &str) -> [String; 2] {
        [format!("{name}.dict"), format!("{name}.docs")]
    }

    /// Persist the segment.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let [dict_name, docs_name] = Self::file_names(&self.name);

        let mut dict = StructWriter::new(storage.create_output(&dict_name)?);
        dict.write_header(DICT_MAGIC, FORMAT_VERSION)?;
        dict.write_varint(self.doc_count() as u64)?;
        dict.write_varint(self.terms.len() as u64)?;
        for (term, postings) in &self.terms {
            dict.write_string(term.field())?;
            dict.write_bytes(term.bytes())?;
            postings.encode(&mut dict)?;
        }
        dict.close()?;

        let mut docs = StructWriter::new(storage.create_output(&docs_name)?);
        docs.write_header(DOCS_MAGIC, FORMAT_VERSION)?;
        docs.write_varint(self.stored.len() as u64)?;
        for fields in &self.stored {
            docs.write_varint(fields.len() as u64)?;
            for field in fields {
                docs.write_string(&field.name)?;
                match &field.value {
                    FieldValue::Text(text) => {
                        docs.write_u8(VALUE_TEXT)?;
                        docs.write_string(text)?;
                    }
                    FieldValue::Integer(value) => {
                        docs.write_u8(VALUE_INTEGER)?;
                        docs.write_i64(*value)?;
                    }
                }
            }
        }
        docs.close()
    }

    /// Load a persisted segment.
    pub fn open(storage: &dyn Storage, meta: &SegmentMeta) -> Result<Self> {
        let [dict_name, docs_name] = Self::file_names(&meta.name);

        let mut dict = StructReader::new(storage.open_input(&dict_name)?)?;
        dict.read_header(DICT_MAGIC, FORMAT_VERSION)?;
        let doc_count = dict.read_varint()?;
        if doc_count != meta.doc_count as u64 {
            return Err(HalberdError::storage(format!(
                "{dict_name}: doc count {doc_count} does not match manifest {}",
                meta.doc_count
            )));
        }
        let term_count = dict.read_varint()?;
        let mut terms = BTreeMap::new();
        for _ in 0..term_count {
            let field = dict.read_string()?;
            let bytes = dict.read_bytes()?;
            let postings = PostingList::decode(&mut dict)?;
            terms.insert(Term::new(field, bytes), postings);
        }
        dict.verify_checksum()?;

        let mut docs = StructReader::new(storage.open_input(&docs_name)?)?;
        docs.read_header(DOCS_MAGIC, FORMAT_VERSION)?;
        let stored_count = docs.read_varint()?;
        if stored_count != doc_count {
            return Err(HalberdError::storage(format!(
                "{docs_name}: {stored_count} stored documents, expected {doc_count}"
            )));
        }
        let mut stored = Vec::with_capacity(stored_count as usize);
        for _ in 0..stored_count {
            let field_count = docs.read_varint()?;
            let mut fields = Vec::with_capacity(field_count.min(1024) as usize);
            for _ in 0..field_count {
                let name = docs.read_string()?;
                let value = match docs.read_u8()? {
                    VALUE_TEXT => FieldValue::Text(docs.read_string()?),
                    VALUE_INTEGER => FieldValue::Integer(docs.read_i64()?),
                    tag => {
                        return Err(HalberdError::storage(format!(
                            "{docs_name}: unknown value tag {tag}"
                        )));
                    }
                };
                fields.push(StoredField::new(name, value));
            }
            stored.push(fields);
        }
        docs.verify_checksum()?;

        Segment::from_parts(meta.name.clone(), terms, stored)
            .map_err(|e| HalberdError::storage(e.to_string()))
    }
}
