// src/commands/build.rs

//! Package build command

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use vnfpack::archive::TarCodec;
use vnfpack::package::{build_from_file, BuildOptions};

/// Build a package from a configuration file
pub fn cmd_build(config: &Path, no_compress: bool, cleanup: bool) -> Result<()> {
    info!("Building package from configuration {}", config.display());

    let options = BuildOptions {
        compressed: !no_compress,
        cleanup,
    };
    let output = build_from_file(config, &TarCodec::new(), options)
        .with_context(|| format!("Failed to build package from {}", config.display()))?;

    println!("Package created: {}", output.display());
    Ok(())
}
