// src/package/mod.rs
//! Package building and migration
//!
//! Every operation here produces a new archive through an
//! [`ArchiveCodec`](crate::archive::ArchiveCodec) and never leaves a
//! partial archive or a scratch directory behind on failure.

mod assemble;
mod builder;
mod migrate;
mod pack;
mod scratch;
mod verify;

pub use assemble::{build_from_file, build_package, BuildOptions};
pub use builder::{output_file_name, ArchiveBuilder, Intermediates};
pub use migrate::{convert, repackage, MigrationOptions, CONVERT_PREFIX, REPACKAGE_PREFIX};
pub use pack::{bootstrap_sources, pack_directory};
pub use scratch::Scratch;
pub use verify::{verify_manifest, verify_package, Mismatch, VerifyReport};
