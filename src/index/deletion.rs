//! Per-segment deletion sets.
//!
//! Deleting a document never rewrites its segment. Instead each segment has
//! a bitset of deleted ids. Sets are copy-on-write: a flush that deletes
//! documents publishes a new generation and leaves the previous one intact
//! for searchers that still hold it.

use bit_vec::BitVec;

use crate::error::{HalberdError, Result};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const DEL_MAGIC: u32 = 0x4844_454c; // "HDEL"
const FORMAT_VERSION: u32 = 1;

/// Deleted documents of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionSet {
    bits: BitVec,
    deleted_count: u32,
    generation: u64,
}

impl DeletionSet {
    /// Create an empty set for a segment with `doc_count` documents.
    pub fn new(doc_count: u32) -> Self {
        DeletionSet {
            bits: BitVec::from_elem(doc_count as usize, false),
            deleted_count: 0,
            generation: 0,
        }
    }

    /// Mark a document as deleted. Returns `true` if it was live before.
    ///
    /// Ids outside the segment are ignored.
    pub fn delete(&mut self, doc_id: u32) -> bool {
        match self.bits.get(doc_id as usize) {
            Some(false) => {
                self.bits.set(doc_id as usize, true);
                self.deleted_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Check if a document is deleted.
    pub fn is_deleted(&self, doc_id: u32) -> bool {
        self.bits.get(doc_id as usize).unwrap_or(false)
    }

    /// Number of document slots covered.
    pub fn doc_count(&self) -> u32 {
        self.bits.len() as u32
    }

    /// Number of deleted documents.
    pub fn deleted_count(&self) -> u32 {
        self.deleted_count
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u32 {
        self.doc_count() - self.deleted_count
    }

    /// Check if any document is deleted.
    pub fn has_deletions(&self) -> bool {
        self.deleted_count > 0
    }

    /// Generation number; bumped by [`DeletionSet::next_generation`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A mutable copy carrying the next generation number.
    pub fn next_generation(&self) -> Self {
        DeletionSet {
            bits: self.bits.clone(),
            deleted_count: self.deleted_count,
            generation: self.generation + 1,
        }
    }

    /// Iterate live document ids in ascending order.
    pub fn live_docs(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(doc_id, deleted)| (!deleted).then_some(doc_id as u32))
    }

    /// File name of a deletion set generation.
    pub fn file_name(segment: &str, generation: u64) -> String {
        format!("{segment}_{generation}.del")
    }

    /// Persist this generation for `segment`.
    pub fn write(&self, storage: &dyn Storage, segment: &str) -> Result<()> {
        let name = Self::file_name(segment, self.generation);
        let mut writer = StructWriter::new(storage.create_output(&name)?);
        writer.write_header(DEL_MAGIC, FORMAT_VERSION)?;
        writer.write_varint(self.bits.len() as u64)?;
        writer.write_varint(self.deleted_count as u64)?;
        writer.write_bytes(&self.bits.to_bytes())?;
        writer.close()
    }

    /// Load a persisted generation.
    pub fn open(storage: &dyn Storage, segment: &str, generation: u64, doc_count: u32) -> Result<Self> {
        let name = Self::file_name(segment, generation);
        let mut reader = StructReader::new(storage.open_input(&name)?)?;
        reader.read_header(DEL_MAGIC, FORMAT_VERSION)?;
        let len = reader.read_varint()?;
        let deleted_count = reader.read_varint()?;
        let bytes = reader.read_bytes()?;
        reader.verify_checksum()?;

        if len != doc_count as u64 {
            return Err(HalberdError::storage(format!(
                "{name}: covers {len} documents, segment has {doc_count}"
            )));
        }
        let mut bits = BitVec::from_bytes(&bytes);
        if bits.len() < len as usize {
            return Err(HalberdError::storage(format!("{name}: bitset too short")));
        }
        bits.truncate(len as usize);

        let counted = bits.iter().filter(|deleted| *deleted).count() as u64;
        if counted != deleted_count {
            return Err(HalberdError::storage(format!(
                "{name}: {counted} bits set, header says {deleted_count}"
            )));
        }

        Ok(DeletionSet {
            bits,
            deleted_count: deleted_count as u32,
            generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn test_delete_counts_once() {
        let mut set = DeletionSet::new(5);
        assert!(set.delete(3));
        assert!(!set.delete(3));
        assert!(!set.delete(10));
        assert!(set.is_deleted(3));
        assert!(!set.is_deleted(10));
        assert_eq!(set.deleted_count(), 1);
        assert_eq!(set.live_count(), 4);
        assert_eq!(set.live_docs().collect::<Vec<_>>(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_copy_on_write_generations() {
        let mut first = DeletionSet::new(4);
        first.delete(0);

        let mut second = first.next_generation();
        second.delete(1);

        assert_eq!(first.generation(), 0);
        assert_eq!(second.generation(), 1);
        assert!(!first.is_deleted(1));
        assert!(second.is_deleted(0) && second.is_deleted(1));
    }

    #[test]
    fn test_write_and_open() {
        let storage = MemoryStorage::default();
        let mut set = DeletionSet::new(11).next_generation();
        set.delete(2);
        set.delete(10);
        set.write(&storage, "segment_000001").unwrap();

        assert!(storage.file_exists("segment_000001_1.del"));
        let loaded = DeletionSet::open(&storage, "segment_000001", 1, 11).unwrap();
        assert_eq!(loaded, set);

        assert!(DeletionSet::open(&storage, "segment_000001", 1, 12).is_err());
        assert!(matches!(
            DeletionSet::open(&storage, "segment_000001", 2, 11),
            Err(HalberdError::NotFound(_))
        ));
    }
}
