//! Named blob storage under an index.
//!
//! Segment files, deletion sets, manifests and the write lock are all blobs
//! in one flat namespace. Index code goes through [`Storage`] only.
//!
//! | backend | blobs | locks |
//! |---|---|---|
//! | [`file::FileStorage`] | files in one directory | `create_new` lock files |
//! | [`memory::MemoryStorage`] | shared in-process map | shared name set |
//!
//!
//! ```
//! use halberd::storage::{StorageConfig, StorageFactory};
//! use halberd::storage::memory::MemoryStorageConfig;
//!
//! # fn main() -> halberd::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default()))?;
//! assert!(storage.list_files()?.is_empty());
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};

pub mod file;
pub mod memory;
pub mod structured;

/// A trait for storage backends that can store and retrieve named blobs.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    ///
    /// Fails with [`HalberdError::NotFound`] if the file does not exist.
    ///
    /// ```
    /// use halberd::storage::memory::{MemoryStorage, MemoryStorageConfig};
    /// use halberd::storage::Storage;
    /// use std::io::{Read, Write};
    ///
    /// # fn main() -> halberd::error::Result<()> {
    /// let storage = MemoryStorage::new(MemoryStorageConfig::default());
    ///
    /// let mut output = storage.create_output("segment_0.dict")?;
    /// output.write_all(b"terms")?;
    /// output.close()?;
    ///
    /// let mut input = storage.open_input("segment_0.dict")?;
    /// let mut buffer = Vec::new();
    /// input.read_to_end(&mut buffer)?;
    /// assert_eq!(buffer, b"terms");
    /// # Ok(())
    /// # }
    /// ```
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing content.
    ///
    /// The content becomes visible to readers when the output is closed.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Open a file for appending, creating it if needed.
    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing `new_name` if it exists.
    ///
    /// Used to publish a fully written temporary file under its final name
    /// so readers never observe a partially written blob.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Create a file with a unique name derived from `prefix`.
    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)>;

    /// Sync all pending writes to the storage medium.
    fn sync(&self) -> Result<()>;

    /// The lock manager guarding this storage.
    fn lock_manager(&self) -> Arc<dyn LockManager>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Seek + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Get the current position in the output stream.
    fn position(&self) -> Result<u64>;

    /// Close the output stream, publishing its content.
    fn close(&mut self) -> Result<()>;
}

// Allow boxed trait objects wherever a concrete output is expected.
impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        self.as_ref().position()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        self.as_ref().size()
    }
}

/// A lock manager for coordinating exclusive access to a storage.
pub trait LockManager: Send + Sync + std::fmt::Debug {
    /// Try to acquire a lock, returning `None` if another holder has it.
    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>>;

    /// Acquire a lock, failing with [`HalberdError::LockConflict`] if it is held.
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        self.try_acquire_lock(name)?
            .ok_or_else(|| StorageError::LockFailed(name.to_string()).into())
    }

    /// Check if a lock with the given name is currently held.
    fn lock_exists(&self, name: &str) -> bool;
}

/// A held lock. Dropping it releases the lock.
pub trait StorageLock: Send + std::fmt::Debug {
    /// Get the name of the lock.
    fn name(&self) -> &str;

    /// Release the lock. Releasing twice is a no-op.
    fn release(&mut self) -> Result<()>;

    /// Check if the lock is still held.
    fn is_valid(&self) -> bool;
}

/// Configuration for storage backends.
///
/// ```
/// use halberd::storage::StorageConfig;
/// use halberd::storage::file::FileStorageConfig;
///
/// let mut file_config = FileStorageConfig::new("/data/index");
/// file_config.sync_writes = true;
/// let config = StorageConfig::File(file_config);
/// # let _ = config;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageConfig {
    /// File-based storage configuration (includes path).
    File(file::FileStorageConfig),

    /// Memory-based storage configuration.
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// A factory for creating storage instances from a [`StorageConfig`].
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => {
                Ok(Arc::new(memory::MemoryStorage::new(mem_config)))
            }
            StorageConfig::File(file_config) => {
                Ok(Arc::new(file::FileStorage::new(file_config)?))
            }
        }
    }
}

/// Failures raised by storage backends before they are folded into
/// [`HalberdError`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Failed to acquire lock: {0}")]
    LockFailed(String),

    /// Bad magic, version, length or checksum.
    #[error("Corrupted data: {0}")]
    Corrupted(String),
}

impl From<StorageError> for HalberdError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::FileNotFound(_) => HalberdError::not_found(message),
            StorageError::LockFailed(_) => HalberdError::lock_conflict(message),
            StorageError::IoError(_) | StorageError::Corrupted(_) => HalberdError::storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file::FileStorageConfig;
    use crate::storage::memory::MemoryStorageConfig;

    #[test]
    fn test_storage_config_default() {
        match StorageConfig::default() {
            StorageConfig::Memory(mem_config) => {
                assert_eq!(mem_config.initial_capacity, 16);
            }
            _ => panic!("Expected Memory config"),
        }
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: HalberdError = StorageError::FileNotFound("seg.dict".to_string()).into();
        assert!(matches!(err, HalberdError::NotFound(_)));

        let err: HalberdError = StorageError::LockFailed("write.lock".to_string()).into();
        assert!(matches!(err, HalberdError::LockConflict(_)));
        assert_eq!(
            err.to_string(),
            "Lock conflict: Failed to acquire lock: write.lock"
        );

        let err: HalberdError = StorageError::Corrupted("bad checksum".to_string()).into();
        assert!(matches!(err, HalberdError::Storage(_)));
    }

    #[test]
    fn test_storage_factory_memory() {
        let config = StorageConfig::Memory(MemoryStorageConfig::default());
        let storage = StorageFactory::create(config).unwrap();

        assert!(!storage.file_exists("manifest_1.json"));
    }

    #[test]
    fn test_storage_factory_file() {
        use std::io::{Read, Write};
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::File(FileStorageConfig::new(temp_dir.path()));
        let storage = StorageFactory::create(config).unwrap();

        let mut output = storage.create_output("test.bin").unwrap();
        output.write_all(b"Hello, Factory!").unwrap();
        output.close().unwrap();

        let mut input = storage.open_input("test.bin").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();
        assert_eq!(buffer, b"Hello, Factory!");
    }

    #[test]
    fn test_config_serde() {
        let config = StorageConfig::File(FileStorageConfig::new("/tmp/idx"));
        let json = serde_json::to_string(&config).unwrap();
        let back: StorageConfig = serde_json::from_str(&json).unwrap();
        match back {
            StorageConfig::File(file_config) => {
                assert_eq!(file_config.path, std::path::PathBuf::from("/tmp/idx"));
            }
            _ => panic!("Expected File config"),
        }
    }
}
