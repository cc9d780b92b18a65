// src/hash.rs

//! Streaming file digests for package manifests
//!
//! Two algorithms are supported:
//! - **SHA-256**: the current algorithm, used for every new manifest entry
//! - **SHA-1**: the legacy algorithm, kept only so that older packages can be
//!   edited without changing the digest kind they were published with
//!
//! Files are read in fixed-size blocks so arbitrarily large disk images can
//! be hashed without buffering them in memory.

use crate::error::{Error, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Read block size for streaming digests
pub const BLOCK_SIZE: usize = 65536;

/// Digest algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-1, deprecated; only preserved for legacy packages
    Sha1,

    /// SHA-256, used for all new entries
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Get the hash output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Get the hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Name of the manifest field carrying a digest of this kind
    #[inline]
    pub const fn manifest_field(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1_checksum",
            Self::Sha256 => "sha256_checksum",
        }
    }

    /// Whether this is the legacy digest kind
    #[inline]
    pub const fn is_legacy(&self) -> bool {
        matches!(self, Self::Sha1)
    }

    /// Look up an algorithm from its manifest field name
    pub fn from_manifest_field(field: &str) -> Option<Self> {
        match field {
            "sha1_checksum" => Some(Self::Sha1),
            "sha256_checksum" => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(Error::validation(
                "digest_algorithm",
                format!("unsupported digest algorithm: {}", s),
            )),
        }
    }
}

/// A digest value with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    /// The algorithm used
    pub algorithm: HashAlgorithm,
    /// The digest as a lowercase hex string
    pub value: String,
}

impl Hash {
    /// Create a digest value, validating length and hex characters
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let value = value.trim();
        if value.len() != algorithm.hex_len() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::schema(
                "package.mf",
                format!("invalid {} digest: {}", algorithm, value),
            ));
        }
        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    /// Get the digest as a hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Incremental hasher for either supported algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl Hasher {
    /// Create a new hasher with the specified algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha1 => HasherState::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
        };
        Self { algorithm, state }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha1(hasher) => hasher.update(data),
            HasherState::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Finalize and return the digest
    pub fn finalize(self) -> Hash {
        let value = match self.state {
            HasherState::Sha1(hasher) => format!("{:x}", hasher.finalize()),
            HasherState::Sha256(hasher) => format!("{:x}", hasher.finalize()),
        };
        Hash {
            algorithm: self.algorithm,
            value,
        }
    }

    /// Get the algorithm being used
    #[inline]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Compute the digest of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Compute the digest of data from a reader, one block at a time
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<Hash> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute the digest of a file's contents
///
/// Streams the file content to avoid loading it entirely into memory.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<Hash> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    hash_reader(algorithm, &mut file).map_err(|e| Error::io(path, e))
}

/// Check a file against an expected digest
///
/// Returns the actual digest so callers can report mismatches.
pub fn verify_file(path: &Path, expected: &Hash) -> Result<std::result::Result<(), Hash>> {
    let actual = hash_file(path, expected.algorithm)?;
    if actual.value == expected.value.to_lowercase() {
        Ok(Ok(()))
    } else {
        Ok(Err(actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_hash() {
        let hash = hash_bytes(HashAlgorithm::Sha256, b"Hello, World!");
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
        assert_eq!(
            hash.value,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_sha1_hash() {
        let hash = hash_bytes(HashAlgorithm::Sha1, b"hello world");
        assert_eq!(hash.value, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(hash.value.len(), HashAlgorithm::Sha1.hex_len());
    }

    #[test]
    fn test_hasher_incremental() {
        let full_hash = hash_bytes(HashAlgorithm::Sha256, b"Hello, World!");

        let mut hasher = Hasher::new(HashAlgorithm::Sha256);
        hasher.update(b"Hello, ");
        hasher.update(b"World!");

        assert_eq!(full_hash, hasher.finalize());
    }

    #[test]
    fn test_hash_file_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("disk.qcow2");
        // Larger than one block so the streaming loop runs more than once
        fs::write(&path, vec![7u8; BLOCK_SIZE * 3 + 17]).unwrap();

        let first = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        let second = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(first, second);

        let mut content = fs::read(&path).unwrap();
        content[BLOCK_SIZE + 1] = 8;
        fs::write(&path, content).unwrap();
        let changed = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        assert_ne!(first, changed);
    }

    #[test]
    fn test_hash_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = hash_file(&temp_dir.path().join("nope"), HashAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_manifest_field_names() {
        assert_eq!(HashAlgorithm::Sha1.manifest_field(), "sha1_checksum");
        assert_eq!(
            HashAlgorithm::from_manifest_field("sha256_checksum"),
            Some(HashAlgorithm::Sha256)
        );
        assert_eq!(HashAlgorithm::from_manifest_field("md5_checksum"), None);
    }

    #[test]
    fn test_hash_validation() {
        assert!(Hash::new(HashAlgorithm::Sha1, "2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED").is_ok());
        assert!(Hash::new(HashAlgorithm::Sha256, "abc123").is_err());
        assert!(Hash::new(HashAlgorithm::Sha1, "zzae6c35c94fcfb415dbe95f408b9ce91ee846ed").is_err());
    }

    #[test]
    fn test_verify_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("day0.txt");
        fs::write(&path, b"hostname vnf").unwrap();

        let good = hash_bytes(HashAlgorithm::Sha1, b"hostname vnf");
        assert!(verify_file(&path, &good).unwrap().is_ok());

        let bad = hash_bytes(HashAlgorithm::Sha1, b"something else");
        let actual = verify_file(&path, &bad).unwrap().unwrap_err();
        assert_eq!(actual, good);
    }
}
