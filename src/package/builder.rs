// src/package/builder.rs
//! Archive builder
//!
//! Writes the manifest and hands the complete member list to the archive
//! codec in one call. The manifest file is always the last member.

use super::scratch::remove_files;
use crate::archive::{ArchiveCodec, ArchiveMember};
use crate::compression::CompressionFormat;
use crate::error::{Error, Result};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output file name for a package, with the archive suffix forced on
pub fn output_file_name(name: &str, compressed: bool) -> String {
    let format = if compressed {
        CompressionFormat::Gzip
    } else {
        CompressionFormat::None
    };
    let suffix = format.archive_suffix();
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Files generated for one build, removed when the guard goes out of scope
#[derive(Debug, Default)]
pub struct Intermediates {
    paths: Vec<PathBuf>,
}

impl Intermediates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }
}

impl Drop for Intermediates {
    fn drop(&mut self) {
        remove_files(self.paths.iter().map(PathBuf::as_path));
    }
}

/// Builds package archives through an [`ArchiveCodec`]
pub struct ArchiveBuilder<'c, C: ArchiveCodec + ?Sized> {
    codec: &'c C,
    compressed: bool,
}

impl<'c, C: ArchiveCodec + ?Sized> ArchiveBuilder<'c, C> {
    pub fn new(codec: &'c C) -> Self {
        Self {
            codec,
            compressed: true,
        }
    }

    /// Select gzip compression (the default) or a plain tar archive
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Build the archive at `output`
    ///
    /// `members` must cover every manifest entry. The manifest is written
    /// into `manifest_dir` and removed again whatever the outcome, along
    /// with anything tracked in `intermediates`.
    pub fn build(
        &self,
        manifest: &Manifest,
        members: &[ArchiveMember],
        manifest_dir: &Path,
        output: &Path,
        mut intermediates: Intermediates,
    ) -> Result<PathBuf> {
        for entry in manifest.entries() {
            let member = members
                .iter()
                .find(|m| m.name == entry.name)
                .ok_or_else(|| Error::MissingManifestFile {
                    name: entry.name.clone(),
                    path: manifest_dir.join(&entry.name),
                })?;
            if !member.source_path().is_file() {
                return Err(Error::MissingSourceFile(member.source_path()));
            }
        }

        let manifest_path = manifest_dir.join(MANIFEST_FILE);
        intermediates.track(&manifest_path);
        manifest.save(&manifest_path)?;
        debug!("Wrote {} with {} entries", manifest_path.display(), manifest.len());

        let mut all_members = members.to_vec();
        all_members.push(ArchiveMember::new(manifest_dir, MANIFEST_FILE));

        self.codec.create(output, &all_members, self.compressed)?;
        info!("Created package {}", output.display());
        Ok(output.to_path_buf())
    }
}
