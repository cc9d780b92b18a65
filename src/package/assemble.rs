// src/package/assemble.rs
//! Package assembly from a configuration record

use super::builder::{output_file_name, ArchiveBuilder, Intermediates};
use super::scratch::{remove_files, Scratch};
use crate::archive::{ArchiveCodec, ArchiveMember};
use crate::classifier::{order_disk_images, DiskImage, FileClassifier, SourceCategory};
use crate::config::{validate, PackageConfig};
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::manifest::Manifest;
use crate::properties::bootstrap::BootstrapAssembly;
use crate::properties::template::build_image_properties;
use crate::properties::{system_properties_document, IMAGE_PROPERTIES_FILE, SYSTEM_PROPERTIES_FILE};
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for building a package
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub compressed: bool,
    /// Remove bootstrap sources after a successful build
    pub cleanup: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            compressed: true,
            cleanup: false,
        }
    }
}

/// Build a new package from `config`, returning the archive path
pub fn build_package<C: ArchiveCodec + ?Sized>(
    config: &PackageConfig,
    codec: &C,
    options: BuildOptions,
) -> Result<PathBuf> {
    validate(config)?;

    let images: Vec<DiskImage> = config
        .image_list
        .iter()
        .map(|image| DiskImage::new(image.full_path(), image.disk.as_deref()))
        .collect();
    let disks = order_disk_images(&images)?;
    if let Some(missing) = disks.iter().find(|disk| !disk.is_file()) {
        return Err(Error::MissingSourceFile(missing.clone()));
    }

    let output_dir = config.package_output_dir.as_deref().ok_or_else(|| {
        Error::validation("package_output_dir", "package output directory is missing")
    })?;
    if !output_dir.is_dir() {
        return Err(Error::MissingPath {
            what: "package output directory",
            path: output_dir.to_path_buf(),
        });
    }

    let scratch = Scratch::create(output_dir)?;
    let ha = config.ha_package;
    let bootstrap = BootstrapAssembly::assemble(config.bootstrap.files(), ha)?;

    let tree = build_image_properties(config, &disks, &bootstrap)?;
    let properties_path = scratch.path().join(IMAGE_PROPERTIES_FILE);
    tree.save(&properties_path)?;

    let system_path = if ha {
        let path = scratch.path().join(SYSTEM_PROPERTIES_FILE);
        system_properties_document(bootstrap.system.clone()).save(&path)?;
        Some(path)
    } else {
        None
    };

    let mut manifest = if ha {
        Manifest::versioned()
    } else {
        Manifest::new()
    };
    let mut classifier = FileClassifier::new(ha);
    let mut classified = classifier.classify(&disks, SourceCategory::DiskImage)?;
    classified.extend(classifier.classify(&bootstrap.sources, SourceCategory::Bootstrap)?);
    classified.extend(classifier.classify(&[&properties_path], SourceCategory::ImageProperties)?);
    if let Some(path) = &system_path {
        classified.extend(classifier.classify(&[path], SourceCategory::SystemGeneratedProperties)?);
    }

    let mut members = Vec::with_capacity(classified.len());
    for file in classified {
        manifest.record_file(&file.path, file.role, HashAlgorithm::Sha256)?;
        members.push(ArchiveMember::from_path(&file.path)?);
    }

    let package_name = config.required("package_filename")?;
    let output = output_dir.join(output_file_name(package_name, options.compressed));

    let mut intermediates = Intermediates::new();
    intermediates.track(&properties_path);
    if let Some(path) = system_path {
        intermediates.track(path);
    }
    ArchiveBuilder::new(codec)
        .compressed(options.compressed)
        .build(&manifest, &members, scratch.path(), &output, intermediates)?;

    if options.cleanup || config.cleanup {
        info!("Removing {} bootstrap source files", bootstrap.sources.len());
        remove_files(bootstrap.sources.iter().map(PathBuf::as_path));
    }

    scratch.close()?;
    Ok(output)
}

/// Load, validate and build a package from a configuration file
pub fn build_from_file<C: ArchiveCodec + ?Sized>(
    path: &Path,
    codec: &C,
    options: BuildOptions,
) -> Result<PathBuf> {
    let config = PackageConfig::load(path)?;
    info!("Building package from {}", path.display());
    build_package(&config, codec, options)
}
