// src/commands/verify.rs

//! Package verification command

use anyhow::{Context, Result};
use std::path::Path;
use vnfpack::archive::TarCodec;
use vnfpack::package::verify_package;

/// Verify a package against its manifest
pub fn cmd_verify(package: &Path, scratch_dir: Option<&Path>) -> Result<()> {
    let scratch_root = scratch_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    let report = verify_package(package, &TarCodec::new(), &scratch_root)
        .with_context(|| format!("Failed to verify {}", package.display()))?;

    for name in &report.matched {
        println!("  OK        {}", name);
    }
    for mismatch in &report.mismatched {
        println!(
            "  MODIFIED  {} (expected {}, got {})",
            mismatch.name, mismatch.expected, mismatch.actual
        );
    }
    for name in &report.missing {
        println!("  MISSING   {}", name);
    }

    if !report.is_ok() {
        anyhow::bail!(
            "{}: {} modified, {} missing",
            package.display(),
            report.mismatched.len(),
            report.missing.len()
        );
    }
    println!("{}: all {} files verified", package.display(), report.matched.len());
    Ok(())
}
