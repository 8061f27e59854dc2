//! polwatch core - content identity primitives
//!
//! This crate provides the leaf layer of the change-detection engine:
//! - BLAKE3 content fingerprints
//! - Streaming and memory-mapped file hashing
//! - File snapshots (size + mtime) used for quiescence checks

pub mod error;
pub mod hash;
pub mod snapshot;

// Re-export main types for convenience
pub use error::HashError;
pub use hash::{hash_bytes, hash_file, hash_file_stable, Fingerprint, StableHash};
pub use snapshot::FileSnapshot;

/// Common result type used throughout polwatch-core
pub type Result<T> = std::result::Result<T, HashError>;
