// src/commands/modify.rs

//! Commands that rewrite an existing package

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vnfpack::archive::TarCodec;
use vnfpack::package::{convert, repackage, MigrationOptions};

fn migration_options(dest_dir: Option<&Path>, scratch_dir: Option<&Path>) -> MigrationOptions {
    MigrationOptions {
        dest_dir: dest_dir.map(Path::to_path_buf),
        scratch_root: scratch_dir.map(Path::to_path_buf),
    }
}

/// Convert a legacy package to the target dialect
pub fn cmd_convert(package: &Path, dest_dir: Option<&Path>, scratch_dir: Option<&Path>) -> Result<()> {
    println!("Converting {}", package.display());

    let options = migration_options(dest_dir, scratch_dir);
    let output = convert(package, &TarCodec::new(), &options)
        .with_context(|| format!("Failed to convert {}", package.display()))?;

    println!("Converted package: {}", output.display());
    Ok(())
}

/// Replace the disk images of a package
pub fn cmd_repackage(
    package: &Path,
    images: &[PathBuf],
    dest_dir: Option<&Path>,
    scratch_dir: Option<&Path>,
) -> Result<()> {
    println!("Repackaging {} with {} disk image(s)", package.display(), images.len());

    let options = migration_options(dest_dir, scratch_dir);
    let output = repackage(package, images, &TarCodec::new(), &options)
        .with_context(|| format!("Failed to repackage {}", package.display()))?;

    println!("Repackaged package: {}", output.display());
    Ok(())
}
