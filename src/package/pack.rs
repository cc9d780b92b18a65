// src/package/pack.rs
//! Packing an existing package directory
//!
//! The directory already holds the property documents and bootstrap
//! files; only the disk images come from the caller.

use super::builder::{output_file_name, ArchiveBuilder, Intermediates};
use super::scratch::Scratch;
use crate::archive::{ArchiveCodec, ArchiveMember};
use crate::classifier::{FileClassifier, SourceCategory};
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::properties::{PropertyTree, IMAGE_PROPERTIES_FILE, SYSTEM_PROPERTIES_FILE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bootstrap files of a package directory, by file name
///
/// HA packages list them in the property document; other packages are
/// expected to carry a previous `package.mf` naming them.
pub fn bootstrap_sources(dir: &Path, ha: bool) -> Result<Vec<String>> {
    if ha {
        let tree = PropertyTree::load(&dir.join(IMAGE_PROPERTIES_FILE))?;
        return Ok(tree.bootstrap_sources());
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() || manifest_path.is_symlink() {
        debug!("No manifest in {}; packing without bootstrap files", dir.display());
        return Ok(Vec::new());
    }
    let manifest = Manifest::load(&manifest_path)?;
    Ok(manifest
        .entries()
        .iter()
        .filter(|entry| entry.role.is_bootstrap())
        .map(|entry| entry.name.clone())
        .collect())
}

/// Pack `dir` with the given disk images (root first) into `output`
///
/// A relative `output` is resolved against the current directory and
/// gets the archive suffix appended when missing.
pub fn pack_directory<C: ArchiveCodec + ?Sized>(
    dir: &Path,
    images: &[PathBuf],
    output: &Path,
    codec: &C,
    compressed: bool,
) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::MissingPath {
            what: "package directory",
            path: dir.to_path_buf(),
        });
    }
    let properties_path = dir.join(IMAGE_PROPERTIES_FILE);
    if !properties_path.is_file() {
        return Err(Error::MissingPath {
            what: "image properties document",
            path: properties_path,
        });
    }
    if images.is_empty() {
        return Err(Error::validation("image_list", "at least one disk image is required"));
    }

    let system_path = dir.join(SYSTEM_PROPERTIES_FILE);
    let ha = system_path.is_file();
    info!("Packing {} ({} package)", dir.display(), if ha { "HA" } else { "standard" });

    let bootstrap: Vec<PathBuf> = bootstrap_sources(dir, ha)?
        .into_iter()
        .map(|name| dir.join(name))
        .collect();

    let mut classifier = FileClassifier::new(ha);
    let mut classified = classifier.classify(images, SourceCategory::DiskImage)?;
    classified.extend(classifier.classify(&bootstrap, SourceCategory::Bootstrap)?);
    classified.extend(classifier.classify(&[&properties_path], SourceCategory::ImageProperties)?);
    if ha {
        classified.extend(classifier.classify(&[&system_path], SourceCategory::SystemGeneratedProperties)?);
    }

    let mut manifest = if ha {
        Manifest::versioned()
    } else {
        Manifest::new()
    };
    let mut members = Vec::with_capacity(classified.len());
    for file in classified {
        manifest.record_file(&file.path, file.role, HashAlgorithm::Sha256)?;
        members.push(ArchiveMember::from_path(&file.path)?);
    }

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::validation("output", "output name is empty"))?;
    let output_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let output = output_dir.join(output_file_name(&file_name, compressed));

    // The manifest is staged outside the packed directory
    let scratch = Scratch::create(&output_dir)?;
    ArchiveBuilder::new(codec)
        .compressed(compressed)
        .build(&manifest, &members, scratch.path(), &output, Intermediates::new())?;
    scratch.close()?;
    Ok(output)
}
