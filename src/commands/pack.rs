// src/commands/pack.rs

//! Directory packing command

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vnfpack::archive::TarCodec;
use vnfpack::package::pack_directory;

/// Package the files of `dir` together with the given disk images
pub fn cmd_pack(dir: &Path, images: &[PathBuf], output: &Path, no_compress: bool) -> Result<()> {
    let output = pack_directory(dir, images, output, &TarCodec::new(), !no_compress)
        .with_context(|| format!("Failed to pack {}", dir.display()))?;

    println!("Package created: {}", output.display());
    Ok(())
}
