//! BLAKE3 content fingerprints
//!
//! A fingerprint covers the full byte content of a file and nothing else:
//! the same bytes under any path or name produce the same fingerprint.

use crate::error::HashError;
use crate::snapshot::FileSnapshot;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

/// Files above this size are hashed through a memory map
pub const MMAP_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Content fingerprint (BLAKE3, 32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters. This is the persisted form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| HashError::InvalidFingerprint(format!("{s:?}: {e}")))?;
        Ok(Self(bytes))
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Serialized as hex so JSON reports match the database column
impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash bytes using BLAKE3
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint::from_bytes(*blake3::hash(data).as_bytes())
}

/// Hash a file, picking streaming or mmap by size
pub fn hash_file(path: &Path) -> Result<Fingerprint, HashError> {
    let file = File::open(path).map_err(|e| HashError::io(path, e))?;
    let len = file.metadata().map_err(|e| HashError::io(path, e))?.len();

    if len > MMAP_THRESHOLD {
        hash_mmap(path, &file)
    } else {
        hash_streaming(path, file)
    }
}

fn hash_streaming(path: &Path, file: File) -> Result<Fingerprint, HashError> {
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| HashError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint::from_bytes(*hasher.finalize().as_bytes()))
}

fn hash_mmap(path: &Path, file: &File) -> Result<Fingerprint, HashError> {
    use memmap2::Mmap;

    // SAFETY: the map is read-only and dropped before returning. Truncation
    // by another process while mapped raises SIGBUS, so callers hashing files
    // that may still be written must use hash_file_stable instead.
    let mmap = unsafe { Mmap::map(file) }.map_err(|e| HashError::io(path, e))?;
    Ok(hash_bytes(&mmap))
}

/// Content verified by [`hash_file_stable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableHash {
    pub fingerprint: Fingerprint,
    /// Byte length the fingerprint covers
    pub len: u64,
}

/// Hash file with stability verification (double-stat pattern)
///
/// Stats the file before and after reading it and retries with exponential
/// backoff (50ms, 100ms, 200ms, ...) while size or mtime moved underneath
/// the read. Always streams: the file may be shrunk by its writer at any
/// point, which a memory map cannot survive.
pub fn hash_file_stable(path: &Path, max_retries: u8) -> Result<StableHash, HashError> {
    let attempts = max_retries.max(1);

    for attempt in 0..attempts {
        let before = FileSnapshot::capture(path)?;
        let file = File::open(path).map_err(|e| HashError::io(path, e))?;
        let fingerprint = hash_streaming(path, file)?;
        let after = FileSnapshot::capture(path)?;

        if before == after {
            return Ok(StableHash {
                fingerprint,
                len: after.len,
            });
        }

        if attempt + 1 < attempts {
            sleep(Duration::from_millis(50 << attempt));
        }
    }

    Err(HashError::Unstable {
        path: path.to_path_buf(),
        attempts,
    })
}
