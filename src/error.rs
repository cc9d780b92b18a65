// src/error.rs

//! Error types for package assembly and migration
//!
//! Every failure surfaced by the engine maps onto one of a small set of
//! abstract kinds (see [`ErrorKind`]). The CLI reports the kind, the
//! offending field and a description, then exits non-zero.

use std::io;
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Abstract error kinds reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ErrorKind {
    /// A required file, directory or manifest entry is missing
    PreconditionError,
    /// The configuration violates a domain constraint
    ValidationError,
    /// A markup document does not have the expected shape
    SchemaError,
    /// The archive codec reported a failure
    ExternalToolError,
    /// Plain I/O failure outside the categories above
    IoError,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("source file not found: {}", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("file {name} listed in package.mf is not present in the package ({})", .path.display())]
    MissingManifestFile { name: String, path: PathBuf },

    #[error("{what} not found: {}", .path.display())]
    MissingPath { what: &'static str, path: PathBuf },

    #[error("package {} has no {name}", .archive.display())]
    MissingMember { name: String, archive: PathBuf },

    #[error("too many root disks: {}", .0.display())]
    TooManyRootDisks(PathBuf),

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{document}: {message}")]
    Schema { document: String, message: String },

    #[error("failed to {operation} archive {}: {source}", .path.display())]
    Archive {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Build a validation error for a configuration field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a schema error for a markup document
    pub fn schema(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            document: document.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wrap an archive codec failure
    pub fn archive(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Archive {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The abstract kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSourceFile(_)
            | Self::MissingManifestFile { .. }
            | Self::MissingMember { .. }
            | Self::MissingPath { .. } => ErrorKind::PreconditionError,
            Self::TooManyRootDisks(_) | Self::Validation { .. } => ErrorKind::ValidationError,
            Self::Schema { .. } => ErrorKind::SchemaError,
            Self::Archive { .. } => ErrorKind::ExternalToolError,
            Self::Io { .. } => ErrorKind::IoError,
        }
    }

    /// The configuration field (or file) the error refers to, if any
    pub fn field(&self) -> Option<String> {
        match self {
            Self::Validation { field, .. } => Some(field.clone()),
            Self::TooManyRootDisks(_) => Some("image_list".to_string()),
            Self::MissingManifestFile { name, .. } | Self::MissingMember { name, .. } => {
                Some(name.clone())
            }
            Self::MissingSourceFile(path) | Self::MissingPath { path, .. } => {
                Some(path.display().to_string())
            }
            Self::Schema { document, .. } => Some(document.clone()),
            Self::Archive { path, .. } | Self::Io { path, .. } => {
                Some(path.display().to_string())
            }
        }
    }
}
