//! Content hashing
//!
//! Files are identified by the xxHash64 (seed 0) of their bytes. The textual
//! form is the base64 of the little-endian digest, the same encoding modlists
//! use on the wire.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::Xxh64;

use crate::vfs::error::VfsError;

const BUFFER_SIZE: usize = 64 * 1024; // 64KB buffer

/// xxHash64 content hash
///
/// Every value is a real digest, zero included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Hash(pub u64);

impl Hash {
    /// Lowercase hex of the little-endian bytes, safe to use as a file name
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_le_bytes())
    }
}

/// Convert xxHash64 u64 to base64 format (matching Wabbajack format)
pub fn xxhash64_to_base64(hash: u64) -> String {
    base64::engine::general_purpose::STANDARD.encode(hash.to_le_bytes())
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&xxhash64_to_base64(self.0))
    }
}

impl FromStr for Hash {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| VfsError::InvalidHash {
                value: s.to_string(),
                reason: format!("Invalid base64 hash: {}", e),
            })?;

        let bytes: [u8; 8] = decoded.as_slice().try_into().map_err(|_| VfsError::InvalidHash {
            value: s.to_string(),
            reason: format!("Hash must be 8 bytes, got {}", decoded.len()),
        })?;

        Ok(Hash(u64::from_le_bytes(bytes)))
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.to_string()
    }
}

impl TryFrom<String> for Hash {
    type Error = VfsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> Hash {
    Hash(xxhash_rust::xxh64::xxh64(data, 0))
}

/// Hash a file on disk, streaming it in 64KB chunks
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<Hash, VfsError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| VfsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Xxh64::new(0);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|source| VfsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Hash(hasher.digest()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_base64_matches_wabbajack_encoding() {
        let hash = hash_bytes(b"Hello, World!");
        let expected = xxhash64_to_base64(xxhash_rust::xxh64::xxh64(b"Hello, World!", 0));
        assert_eq!(hash.to_string(), expected);
        assert_eq!(hash.to_string().parse::<Hash>().unwrap(), hash);
    }

    #[test]
    fn test_rejects_wrong_length() {
        // 4 bytes of base64 payload
        let err = "AAAAAA==".parse::<Hash>().unwrap_err();
        assert!(matches!(err, VfsError::InvalidHash { .. }));
        assert!("not base64!".parse::<Hash>().is_err());
    }

    #[test]
    fn test_file_hash_equals_buffer_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        // Larger than one read buffer
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn test_serde_uses_base64_string() {
        let hash = Hash(0x0102030405060708);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_hex_is_little_endian() {
        assert_eq!(Hash(1).to_hex(), "0100000000000000");
    }
}
