// src/package/migrate.rs
//! Package migration: convert and repackage
//!
//! Both operations run the same sequence against an existing package:
//!
//! 1. extract into a private scratch area
//! 2. load the manifest
//! 3. mutate properties and/or disk images
//! 4. recompute digests
//! 5. repack under a prefixed output name
//!
//! The scratch area is dropped on every path out of the operation, so a
//! failure in any step leaves nothing behind. The source package is never
//! modified.

use super::builder::{ArchiveBuilder, Intermediates};
use super::scratch::Scratch;
use crate::archive::{ArchiveCodec, ArchiveMember};
use crate::classifier::{FileClassifier, SourceCategory};
use crate::compression::{open_decoder, CompressionFormat};
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::manifest::{Manifest, MANIFEST_FILE, PACKAGING_VERSION};
use crate::properties::migrate::migrate_to_target;
use crate::properties::{PropertyTree, IMAGE_PROPERTIES_FILE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output name prefix for converted packages
pub const CONVERT_PREFIX: &str = "vmanage_";

/// Output name prefix for repackaged packages
pub const REPACKAGE_PREFIX: &str = "repackaged_";

/// Where a migration writes its output and scratch data
#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Output directory; defaults to the source package's directory
    pub dest_dir: Option<PathBuf>,
    /// Parent of the scratch area; defaults to the system temp directory
    pub scratch_root: Option<PathBuf>,
}

/// Resolved locations for one migration
struct MigrationPlan {
    source: PathBuf,
    output: PathBuf,
    scratch_root: PathBuf,
    compressed: bool,
}

impl MigrationPlan {
    fn resolve(source: &Path, prefix: &str, options: &MigrationOptions) -> Result<Self> {
        if !source.is_file() {
            return Err(Error::MissingPath {
                what: "package",
                path: source.to_path_buf(),
            });
        }
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::MissingPath {
                what: "package",
                path: source.to_path_buf(),
            })?;

        let dest_dir = match &options.dest_dir {
            Some(dir) => dir.clone(),
            None => match source.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        if !dest_dir.is_dir() {
            return Err(Error::MissingPath {
                what: "destination directory",
                path: dest_dir,
            });
        }

        let (format, _) = open_decoder(source).map_err(|e| Error::io(source, e))?;

        Ok(Self {
            source: source.to_path_buf(),
            output: dest_dir.join(format!("{}{}", prefix, file_name)),
            scratch_root: options
                .scratch_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            compressed: format == CompressionFormat::Gzip,
        })
    }

    /// Extract the source package and load its manifest
    fn extract<C: ArchiveCodec + ?Sized>(&self, codec: &C) -> Result<(Scratch, Manifest)> {
        let scratch = Scratch::create(&self.scratch_root)?;
        codec.extract(&self.source, scratch.path())?;

        let manifest_path = scratch.path().join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(Error::MissingMember {
                name: MANIFEST_FILE.to_string(),
                archive: self.source.clone(),
            });
        }
        let manifest = Manifest::load(&manifest_path)?;
        debug!(
            "Loaded manifest of {} with {} entries",
            self.source.display(),
            manifest.len()
        );
        Ok((scratch, manifest))
    }
}

fn scratch_members(manifest: &Manifest, dir: &Path) -> Vec<ArchiveMember> {
    manifest
        .entries()
        .iter()
        .map(|entry| ArchiveMember::new(dir, entry.name.as_str()))
        .collect()
}

/// Convert a legacy package to the target dialect
///
/// The property document is migrated, every digest is recomputed with
/// the current algorithm and the manifest gains the packaging version.
pub fn convert<C: ArchiveCodec + ?Sized>(
    package: &Path,
    codec: &C,
    options: &MigrationOptions,
) -> Result<PathBuf> {
    let plan = MigrationPlan::resolve(package, CONVERT_PREFIX, options)?;
    info!("Converting {}", package.display());

    let (scratch, mut manifest) = plan.extract(codec)?;
    let dir = scratch.path();

    let properties_path = dir.join(IMAGE_PROPERTIES_FILE);
    if !properties_path.is_file() {
        return Err(Error::MissingMember {
            name: IMAGE_PROPERTIES_FILE.to_string(),
            archive: package.to_path_buf(),
        });
    }
    let mut tree = PropertyTree::load(&properties_path)?;
    migrate_to_target(&mut tree);
    tree.save(&properties_path)?;

    manifest.rehash(dir, HashAlgorithm::Sha256)?;
    manifest.set_version(Some(PACKAGING_VERSION.to_string()));

    let members = scratch_members(&manifest, dir);
    ArchiveBuilder::new(codec)
        .compressed(plan.compressed)
        .build(&manifest, &members, dir, &plan.output, Intermediates::new())?;

    scratch.close()?;
    info!("Converted package written to {}", plan.output.display());
    Ok(plan.output)
}

/// Replace the disk images of an existing package
///
/// `images` are in order, root image first. The package keeps its digest
/// algorithm: new images are hashed the same way as the retained entries.
pub fn repackage<C: ArchiveCodec + ?Sized>(
    package: &Path,
    images: &[PathBuf],
    codec: &C,
    options: &MigrationOptions,
) -> Result<PathBuf> {
    if images.is_empty() {
        return Err(Error::validation("image_list", "at least one disk image is required"));
    }
    if let Some(missing) = images.iter().find(|image| !image.is_file()) {
        return Err(Error::MissingSourceFile(missing.clone()));
    }
    let plan = MigrationPlan::resolve(package, REPACKAGE_PREFIX, options)?;
    info!("Repackaging {} with {} disk images", package.display(), images.len());

    let (scratch, mut manifest) = plan.extract(codec)?;
    let dir = scratch.path();

    for removed in manifest.remove_disk_images() {
        let path = dir.join(&removed.name);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        }
        debug!("Dropped disk image {} ({})", removed.name, removed.role);
    }

    let algorithm = manifest.digest_kind();
    debug!("Package uses {} digests", algorithm);
    manifest.rehash(dir, algorithm)?;
    let mut members = scratch_members(&manifest, dir);

    let mut classifier = FileClassifier::new(false);
    for file in classifier.classify(images, SourceCategory::DiskImage)? {
        manifest.record_file(&file.path, file.role, algorithm)?;
        members.push(ArchiveMember::from_path(&file.path)?);
    }

    ArchiveBuilder::new(codec)
        .compressed(plan.compressed)
        .build(&manifest, &members, dir, &plan.output, Intermediates::new())?;

    scratch.close()?;
    info!("Repackaged package written to {}", plan.output.display());
    Ok(plan.output)
}
