//! Structured binary I/O for index files.
//!
//! Every file written through [`StructWriter`] starts with a magic number and
//! a format version and ends with a CRC32 of everything before it. Readers
//! check both, so a truncated or corrupted file is reported as a storage
//! error instead of producing garbage results.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;

use crate::error::{HalberdError, Result};
use crate::storage::{StorageError, StorageInput, StorageOutput};
use crate::util::varint::{MAX_VARINT_LEN, decode_u64, encode_u64};

/// Size of the trailing checksum.
const CHECKSUM_LEN: u64 = 4;

/// A structured file writer for binary data.
pub struct StructWriter<W: StorageOutput> {
    writer: W,
    hasher: Hasher,
    position: u64,
}

impl<W: StorageOutput> StructWriter<W> {
    /// Create a new structured file writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: Hasher::new(),
            position: 0,
        }
    }

    /// Write the file header.
    pub fn write_header(&mut self, magic: u32, version: u32) -> Result<()> {
        self.write_u32(magic)?;
        self.write_u32(version)
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write an i64 value (little-endian).
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        self.write_raw(&encode_u64(value))
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write raw bytes with length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.write_raw(value)
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.hasher.update(value);
        self.position += value.len() as u64;
        Ok(())
    }

    /// Bytes written so far, excluding the checksum.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append the checksum, then flush and close the underlying output.
    pub fn close(mut self) -> Result<()> {
        let checksum = self.hasher.clone().finalize();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.writer.flush_and_sync()?;
        self.writer.close()
    }
}

/// A structured file reader for binary data.
pub struct StructReader<R: StorageInput> {
    reader: R,
    hasher: Hasher,
    position: u64,
    data_len: u64,
}

impl<R: StorageInput> StructReader<R> {
    /// Create a new structured file reader.
    pub fn new(reader: R) -> Result<Self> {
        let file_size = reader.size()?;
        if file_size < CHECKSUM_LEN {
            return Err(StorageError::Corrupted("file too short for checksum".into()).into());
        }

        Ok(StructReader {
            reader,
            hasher: Hasher::new(),
            position: 0,
            data_len: file_size - CHECKSUM_LEN,
        })
    }

    /// Read and validate the file header, returning the version.
    pub fn read_header(&mut self, magic: u32, max_version: u32) -> Result<u32> {
        let found = self.read_u32()?;
        if found != magic {
            return Err(StorageError::Corrupted(format!(
                "bad magic number {found:#010x}, expected {magic:#010x}"
            ))
            .into());
        }

        let version = self.read_u32()?;
        if version == 0 || version > max_version {
            return Err(StorageError::Corrupted(format!("unsupported version {version}")).into());
        }
        Ok(version)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read an i64 value (little-endian).
    pub fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut bytes = Vec::with_capacity(MAX_VARINT_LEN);
        loop {
            let byte = self.read_u8()?;
            bytes.push(byte);
            if byte & 0x80 == 0 || bytes.len() >= MAX_VARINT_LEN {
                break;
            }
        }

        let (value, _) = decode_u64(&bytes)?;
        Ok(value)
    }

    /// Read a string with length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| StorageError::Corrupted(format!("invalid UTF-8: {e}")).into())
    }

    /// Read bytes with length prefix.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let length = self.read_varint()?;
        if length > self.remaining() {
            return Err(StorageError::Corrupted(format!(
                "length {length} exceeds remaining {} bytes",
                self.remaining()
            ))
            .into());
        }

        let mut bytes = vec![0u8; length as usize];
        self.read_into(&mut bytes)?;
        Ok(bytes)
    }

    /// Bytes left before the checksum.
    pub fn remaining(&self) -> u64 {
        self.data_len.saturating_sub(self.position)
    }

    /// Check if all data before the checksum has been consumed.
    pub fn is_eof(&self) -> bool {
        self.position >= self.data_len
    }

    /// Verify the trailing checksum against everything read so far.
    ///
    /// Must be called after the whole payload has been consumed.
    pub fn verify_checksum(mut self) -> Result<()> {
        if !self.is_eof() {
            return Err(StorageError::Corrupted(format!(
                "{} unread bytes before checksum",
                self.remaining()
            ))
            .into());
        }

        let stored = self.reader.read_u32::<LittleEndian>()?;
        let computed = self.hasher.finalize();
        if stored != computed {
            return Err(StorageError::Corrupted(format!(
                "checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"
            ))
            .into());
        }
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() as u64 > self.remaining() {
            return Err(HalberdError::storage("unexpected end of data"));
        }
        self.reader.read_exact(buf)?;
        self.hasher.update(buf);
        self.position += buf.len() as u64;
        Ok(())
    }
}
