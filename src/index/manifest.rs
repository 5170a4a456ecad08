//! Commit manifests.
//!
//! A manifest lists the segments of one committed index generation and the
//! deletion-set generation of each. It is serialized as JSON to
//! `manifest_<generation>.json`. A commit first writes a temporary file and
//! then renames it into place, so readers see either the old or the new
//! manifest, never a partial one. The highest generation present wins.

use std::io::{Read, Write};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::index::segment::SegmentMeta;
use crate::storage::Storage;

const MANIFEST_PREFIX: &str = "manifest_";
const MANIFEST_SUFFIX: &str = ".json";

/// A committed index generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Commit generation; increases by one per commit.
    pub generation: u64,
    /// Counter used to name new segments.
    pub segment_counter: u64,
    /// Visible segments in index order.
    pub segments: Vec<SegmentMeta>,
}

impl Manifest {
    /// File name of a manifest generation.
    pub fn file_name(generation: u64) -> String {
        format!("{MANIFEST_PREFIX}{generation}{MANIFEST_SUFFIX}")
    }

    /// Parse the generation out of a manifest file name.
    pub fn parse_generation(file_name: &str) -> Option<u64> {
        file_name
            .strip_prefix(MANIFEST_PREFIX)?
            .strip_suffix(MANIFEST_SUFFIX)?
            .parse()
            .ok()
    }

    /// Generations of every manifest in storage, ascending.
    pub fn list_generations(storage: &dyn Storage) -> Result<Vec<u64>> {
        let mut generations: Vec<u64> = storage
            .list_files()?
            .iter()
            .filter_map(|name| Self::parse_generation(name))
            .collect();
        generations.sort_unstable();
        Ok(generations)
    }

    /// Load the newest manifest, or `None` if the storage holds no index.
    pub fn load_latest(storage: &dyn Storage) -> Result<Option<Self>> {
        match Self::list_generations(storage)?.last() {
            Some(&generation) => Self::load(storage, generation).map(Some),
            None => Ok(None),
        }
    }

    /// Load a specific generation.
    pub fn load(storage: &dyn Storage, generation: u64) -> Result<Self> {
        let name = Self::file_name(generation);
        let mut input = storage.open_input(&name)?;
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| HalberdError::storage(format!("{name}: {e}")))?;
        if manifest.generation != generation {
            return Err(HalberdError::storage(format!(
                "{name}: contains generation {}",
                manifest.generation
            )));
        }
        Ok(manifest)
    }

    /// Write this manifest atomically.
    pub fn commit(&self, storage: &dyn Storage) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;

        let (temp_name, mut output) = storage.create_temp_output("manifest")?;
        let written = output
            .write_all(&bytes)
            .map_err(HalberdError::from)
            .and_then(|_| output.flush_and_sync())
            .and_then(|_| output.close());
        if let Err(e) = written {
            drop(output);
            let _ = storage.delete_file(&temp_name);
            return Err(e);
        }

        let name = Self::file_name(self.generation);
        storage.rename_file(&temp_name, &name)?;
        storage.sync()?;

        debug!(
            "committed {name} with {} segment(s)",
            self.segments.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn manifest(generation: u64) -> Manifest {
        Manifest {
            generation,
            segment_counter: 2,
            segments: vec![SegmentMeta {
                name: "segment_000001".to_string(),
                doc_count: 4,
                del_gen: Some(1),
            }],
        }
    }

    #[test]
    fn test_parse_generation() {
        assert_eq!(Manifest::parse_generation("manifest_12.json"), Some(12));
        assert_eq!(Manifest::parse_generation("manifest_0.tmp"), None);
        assert_eq!(Manifest::parse_generation("segment_1.dict"), None);
    }

    #[test]
    fn test_commit_and_load_latest() {
        let storage = MemoryStorage::default();
        assert_eq!(Manifest::load_latest(&storage).unwrap(), None);

        manifest(1).commit(&storage).unwrap();
        manifest(2).commit(&storage).unwrap();

        assert_eq!(Manifest::list_generations(&storage).unwrap(), vec![1, 2]);
        assert_eq!(Manifest::load_latest(&storage).unwrap(), Some(manifest(2)));
        assert!(!storage.list_files().unwrap().iter().any(|f| f.ends_with(".tmp")));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let storage = MemoryStorage::default();
        let mut output = storage.create_output("manifest_3.json").unwrap();
        output.write_all(b"{not json").unwrap();
        output.close().unwrap();

        assert!(matches!(
            Manifest::load(&storage, 3),
            Err(HalberdError::Storage(_))
        ));
    }
}
