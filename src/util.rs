//! Utility modules for Halberd.

pub mod varint;
