//! In-memory storage implementation for testing and throwaway indexes.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{
    LockManager, Storage, StorageError, StorageInput, StorageLock, StorageOutput,
};

type FileMap = Arc<Mutex<HashMap<String, Arc<[u8]>>>>;

/// Configuration for [`MemoryStorage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStorageConfig {
    /// Initial capacity of the file table.
    pub initial_capacity: usize,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        MemoryStorageConfig {
            initial_capacity: 16,
        }
    }
}

/// An in-memory storage implementation.
///
/// Finished files are kept as shared `Arc<[u8]>` so opening an input never
/// copies the blob.
#[derive(Debug)]
pub struct MemoryStorage {
    files: FileMap,
    lock_manager: Arc<MemoryLockManager>,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(Mutex::new(HashMap::with_capacity(config.initial_capacity))),
            lock_manager: Arc::new(MemoryLockManager::default()),
        }
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Get the total size of all files.
    pub fn total_size(&self) -> u64 {
        self.files.lock().values().map(|data| data.len() as u64).sum()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(MemoryStorageConfig::default())
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        Ok(Box::new(MemoryInput {
            cursor: Cursor::new(Arc::clone(data)),
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Vec::new(),
            Arc::clone(&self.files),
        )))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let existing = self
            .files
            .lock()
            .get(name)
            .map(|data| data.to_vec())
            .unwrap_or_default();

        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            existing,
            Arc::clone(&self.files),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;
        Ok(data.len() as u64)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)> {
        let temp_name = {
            let files = self.files.lock();
            (0..)
                .map(|counter| format!("{prefix}_{counter}.tmp"))
                .find(|name| !files.contains_key(name))
                .ok_or_else(|| StorageError::IoError("Could not create temporary file".into()))?
        };

        // Reserve the name so a second temp output does not pick it.
        self.files
            .lock()
            .insert(temp_name.clone(), Arc::from(Vec::new()));

        let output = self.create_output(&temp_name)?;
        Ok((temp_name, output))
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn lock_manager(&self) -> Arc<dyn LockManager> {
        self.lock_manager.clone()
    }
}

/// A memory-based input over a shared blob.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Arc<[u8]>>,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}

/// A memory-based output. The buffer is published on close or drop.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    cursor: Cursor<Vec<u8>>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, initial: Vec<u8>, files: FileMap) -> Self {
        let mut cursor = Cursor::new(initial);
        cursor.set_position(cursor.get_ref().len() as u64);
        MemoryOutput {
            name,
            cursor,
            files,
            closed: false,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.seek(pos)
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.cursor.position())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            let data: Arc<[u8]> = Arc::from(std::mem::take(self.cursor.get_mut()));
            self.files.lock().insert(self.name.clone(), data);
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// A memory-based lock manager.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    held: Arc<Mutex<AHashSet<String>>>,
}

impl LockManager for MemoryLockManager {
    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>> {
        let mut held = self.held.lock();
        if !held.insert(name.to_string()) {
            return Ok(None);
        }

        Ok(Some(Box::new(MemoryLock {
            name: name.to_string(),
            held: Arc::clone(&self.held),
            released: false,
        })))
    }

    fn lock_exists(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

/// A lock held in a [`MemoryLockManager`].
#[derive(Debug)]
struct MemoryLock {
    name: String,
    held: Arc<Mutex<AHashSet<String>>>,
    released: bool,
}

impl StorageLock for MemoryLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.held.lock().remove(&self.name);
            self.released = true;
        }
        Ok(())
    }

    fn is_valid(&self) -> bool {
        !self.released
    }
}

impl Drop for MemoryLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HalberdError;

    fn write_file(storage: &MemoryStorage, name: &str, data: &[u8]) {
        let mut output = storage.create_output(name).unwrap();
        output.write_all(data).unwrap();
        output.close().unwrap();
    }

    #[test]
    fn test_create_and_read_file() {
        let storage = MemoryStorage::default();
        write_file(&storage, "test.txt", b"Hello, Memory!");

        let mut input = storage.open_input("test.txt").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();

        assert_eq!(buffer, b"Hello, Memory!");
        assert_eq!(input.size().unwrap(), 14);
        assert_eq!(storage.file_count(), 1);
        assert_eq!(storage.total_size(), 14);
    }

    #[test]
    fn test_file_operations() {
        let storage = MemoryStorage::default();
        assert!(!storage.file_exists("test.txt"));

        write_file(&storage, "test.txt", b"Test content");
        assert!(storage.file_exists("test.txt"));
        assert_eq!(storage.file_size("test.txt").unwrap(), 12);
        assert_eq!(storage.list_files().unwrap(), vec!["test.txt"]);

        storage.rename_file("test.txt", "renamed.txt").unwrap();
        assert!(!storage.file_exists("test.txt"));
        assert!(storage.file_exists("renamed.txt"));

        storage.delete_file("renamed.txt").unwrap();
        assert!(!storage.file_exists("renamed.txt"));
        assert_eq!(storage.file_count(), 0);
    }

    #[test]
    fn test_output_invisible_until_closed() {
        let storage = MemoryStorage::default();
        let mut output = storage.create_output("seg.dict").unwrap();
        output.write_all(b"partial").unwrap();
        assert!(!storage.file_exists("seg.dict"));

        output.close().unwrap();
        assert!(storage.file_exists("seg.dict"));
    }

    #[test]
    fn test_append() {
        let storage = MemoryStorage::default();
        write_file(&storage, "log", b"first ");

        let mut output = storage.create_output_append("log").unwrap();
        assert_eq!(output.position().unwrap(), 6);
        output.write_all(b"second").unwrap();
        output.close().unwrap();

        let mut input = storage.open_input("log").unwrap();
        let mut text = String::new();
        input.read_to_string(&mut text).unwrap();
        assert_eq!(text, "first second");
    }

    #[test]
    fn test_temp_file_creation() {
        let storage = MemoryStorage::default();

        let (first, mut output) = storage.create_temp_output("manifest").unwrap();
        let (second, _) = storage.create_temp_output("manifest").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("manifest_"));
        assert!(first.ends_with(".tmp"));

        output.write_all(b"{}").unwrap();
        output.close().unwrap();
        assert_eq!(storage.file_size(&first).unwrap(), 2);
    }

    #[test]
    fn test_seek_operations() {
        let storage = MemoryStorage::default();
        write_file(&storage, "test.txt", b"0123456789");

        let mut input = storage.open_input("test.txt").unwrap();
        input.seek(SeekFrom::Start(5)).unwrap();
        let mut buffer = [0u8; 3];
        input.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"567");

        input.seek(SeekFrom::End(-2)).unwrap();
        let mut buffer = [0u8; 2];
        input.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"89");
    }

    #[test]
    fn test_file_not_found() {
        let storage = MemoryStorage::default();

        let result = storage.open_input("nonexistent.txt");
        assert!(matches!(result, Err(HalberdError::NotFound(_))));
        assert!(storage.file_size("nonexistent.txt").is_err());
        assert!(storage.rename_file("nonexistent.txt", "x").is_err());
    }

    #[test]
    fn test_lock_exclusive_and_released_on_drop() {
        let storage = MemoryStorage::default();
        let manager = storage.lock_manager();

        let lock = manager.try_acquire_lock("write.lock").unwrap().unwrap();
        assert_eq!(lock.name(), "write.lock");
        assert!(lock.is_valid());
        assert!(manager.lock_exists("write.lock"));
        assert!(manager.try_acquire_lock("write.lock").unwrap().is_none());
        assert!(matches!(
            manager.acquire_lock("write.lock"),
            Err(HalberdError::LockConflict(_))
        ));

        drop(lock);
        assert!(!manager.lock_exists("write.lock"));
        assert!(manager.try_acquire_lock("write.lock").unwrap().is_some());
    }

    #[test]
    fn test_lock_release_twice() {
        let storage = MemoryStorage::default();
        let manager = storage.lock_manager();

        let mut lock = manager.acquire_lock("write.lock").unwrap();
        lock.release().unwrap();
        assert!(!lock.is_valid());
        lock.release().unwrap();

        // A new holder must not be evicted by the old handle's drop.
        let _second = manager.acquire_lock("write.lock").unwrap();
        drop(lock);
        assert!(manager.lock_exists("write.lock"));
    }
}
