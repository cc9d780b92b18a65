// src/compression/mod.rs
//! Compression handling for package archives
//!
//! Packages are plain tar archives, optionally gzip-compressed. Readers
//! detect the format from the leading magic bytes rather than trusting the
//! file extension, since legacy packages are not consistently named.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// No compression (raw tar)
    None,
    /// Gzip compression (.tar.gz)
    Gzip,
}

impl CompressionFormat {
    /// Detect compression format from magic bytes
    ///
    /// Gzip streams start with `1f 8b`; anything else is treated as raw.
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
            Self::Gzip
        } else {
            Self::None
        }
    }

    /// Archive file suffix for this format
    pub fn archive_suffix(&self) -> &'static str {
        match self {
            Self::None => ".tar",
            Self::Gzip => ".tar.gz",
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Open a file and return a reader that transparently decompresses it
pub fn open_decoder(path: &Path) -> io::Result<(CompressionFormat, Box<dyn Read>)> {
    let mut reader = BufReader::new(File::open(path)?);
    let format = CompressionFormat::from_magic_bytes(reader.fill_buf()?);
    Ok((format, create_decoder(reader, format)))
}

/// Wrap a reader in a decoder for the given format
pub fn create_decoder<'a, R: Read + 'a>(reader: R, format: CompressionFormat) -> Box<dyn Read + 'a> {
    match format {
        CompressionFormat::None => Box::new(reader),
        CompressionFormat::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
    }
}
