//! Postings lists.
//!
//! A postings list holds, for one term in one segment, every document that
//! contains the term together with its term frequency, sorted by document id.
//! On disk the ids are delta encoded and both numbers are written as varints.

use crate::error::{HalberdError, Result};
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{StorageInput, StorageOutput};

/// A single posting in a postings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Number of occurrences of the term in the document.
    pub frequency: u32,
}

impl Posting {
    /// Create a new posting.
    pub fn new(doc_id: u32, frequency: u32) -> Self {
        Posting { doc_id, frequency }
    }
}

/// Document-id-sorted postings for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    /// Create a new empty postings list.
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Record one occurrence of the term in `doc_id`.
    ///
    /// Documents must be added in ascending id order; repeated occurrences in
    /// the last document raise its frequency.
    pub fn add_occurrence(&mut self, doc_id: u32) {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => last.frequency += 1,
            _ => {
                debug_assert!(self.postings.last().is_none_or(|p| p.doc_id < doc_id));
                self.postings.push(Posting::new(doc_id, 1));
            }
        }
    }

    /// Append a posting. Its id must be greater than every id in the list.
    pub fn push(&mut self, posting: Posting) -> Result<()> {
        if let Some(last) = self.postings.last()
            && last.doc_id >= posting.doc_id
        {
            return Err(HalberdError::index(format!(
                "posting for doc {} out of order after doc {}",
                posting.doc_id, last.doc_id
            )));
        }
        self.postings.push(posting);
        Ok(())
    }

    /// Number of documents containing the term, deleted ones included.
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Sum of term frequencies over all documents.
    pub fn total_freq(&self) -> u64 {
        self.postings.iter().map(|p| p.frequency as u64).sum()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Iterate postings in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// All postings as a slice.
    pub fn as_slice(&self) -> &[Posting] {
        &self.postings
    }

    /// Look up the posting for a document by binary search.
    pub fn get(&self, doc_id: u32) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|index| &self.postings[index])
    }

    /// Index of the first posting whose id is `>= target`.
    pub fn seek(&self, target: u32) -> usize {
        self.postings.partition_point(|p| p.doc_id < target)
    }

    /// Write the list with delta encoded ids.
    pub fn encode<W: StorageOutput>(&self, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_varint(self.postings.len() as u64)?;
        let mut previous = 0u32;
        for posting in &self.postings {
            writer.write_varint((posting.doc_id - previous) as u64)?;
            writer.write_varint(posting.frequency as u64)?;
            previous = posting.doc_id;
        }
        Ok(())
    }

    /// Read a list written by [`PostingList::encode`].
    pub fn decode<R: StorageInput>(reader: &mut StructReader<R>) -> Result<Self> {
        let count = reader.read_varint()? as usize;
        let mut postings = Vec::with_capacity(count.min(1 << 20));
        let mut doc_id = 0u64;
        for index in 0..count {
            let delta = reader.read_varint()?;
            if index > 0 && delta == 0 {
                return Err(HalberdError::storage("postings list has duplicate doc id"));
            }
            doc_id += delta;
            if doc_id > u32::MAX as u64 {
                return Err(HalberdError::storage("postings doc id overflow"));
            }
            let frequency = reader.read_varint()?;
            if frequency == 0 || frequency > u32::MAX as u64 {
                return Err(HalberdError::storage(format!(
                    "invalid term frequency {frequency}"
                )));
            }
            postings.push(Posting::new(doc_id as u32, frequency as u32));
        }
        Ok(PostingList { postings })
    }
}

impl FromIterator<Posting> for PostingList {
    /// Collect postings, which must already be sorted by id.
    fn from_iter<I: IntoIterator<Item = Posting>>(iter: I) -> Self {
        PostingList {
            postings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::storage::memory::MemoryStorage;

    fn sample() -> PostingList {
        let mut list = PostingList::new();
        for doc in [1, 1, 4, 9, 9, 9] {
            list.add_occurrence(doc);
        }
        list
    }

    #[test]
    fn test_add_occurrence_groups_frequencies() {
        let list = sample();
        assert_eq!(list.doc_freq(), 3);
        assert_eq!(list.total_freq(), 6);
        assert_eq!(list.get(9), Some(&Posting::new(9, 3)));
        assert_eq!(list.get(2), None);
    }

    #[test]
    fn test_seek() {
        let list = sample();
        assert_eq!(list.seek(0), 0);
        assert_eq!(list.seek(2), 1);
        assert_eq!(list.seek(9), 2);
        assert_eq!(list.seek(10), 3);
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut list = PostingList::new();
        list.push(Posting::new(3, 1)).unwrap();
        assert!(list.push(Posting::new(3, 2)).is_err());
        assert!(list.push(Posting::new(2, 1)).is_err());
        list.push(Posting::new(7, 2)).unwrap();
        assert_eq!(list.doc_freq(), 2);
    }

    #[test]
    fn test_encode_decode() {
        let storage = MemoryStorage::default();
        let list = sample();

        let mut writer = StructWriter::new(storage.create_output("p.post").unwrap());
        list.encode(&mut writer).unwrap();
        writer.close().unwrap();

        let mut reader = StructReader::new(storage.open_input("p.post").unwrap()).unwrap();
        let decoded = PostingList::decode(&mut reader).unwrap();
        reader.verify_checksum().unwrap();

        assert_eq!(decoded, list);
    }
}
