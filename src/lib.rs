// src/lib.rs

//! vnfpack
//!
//! Packaging engine for virtual-machine artifacts: disk images, bootstrap
//! configuration files and property documents are bundled into a single
//! archive carrying a checksum-verifiable manifest (`package.mf`).
//!
//! # Architecture
//!
//! - Manifest ledger: ordered file entries with role and digest
//! - Classification: roles assigned from source category and position
//! - Property documents: legacy and target dialects, with migration
//! - Archive codec: a small create/extract contract, tar + gzip by default
//! - Migration: convert and repackage run against a private scratch area

pub mod archive;
pub mod classifier;
pub mod compression;
pub mod config;
mod error;
pub mod hash;
pub mod manifest;
pub mod markup;
pub mod package;
pub mod properties;

pub use archive::{ArchiveCodec, ArchiveMember, TarCodec};
pub use classifier::{ClassifiedFile, FileClassifier, SourceCategory};
pub use config::PackageConfig;
pub use error::{Error, ErrorKind, Result};
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use manifest::{FileRole, Manifest, ManifestEntry};
pub use package::{BuildOptions, MigrationOptions};
pub use properties::PropertyTree;
