// src/package/verify.rs
//! Package verification
//!
//! Extracts a package and checks every manifest entry against the digest
//! it declares, using that entry's own algorithm.

use super::scratch::Scratch;
use crate::archive::ArchiveCodec;
use crate::error::{Error, Result};
use crate::hash::{verify_file, Hash};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::path::Path;
use tracing::{debug, warn};

/// A manifest entry whose file does not match its digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub name: String,
    pub expected: Hash,
    pub actual: Hash,
}

/// Outcome of verifying one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub matched: Vec<String>,
    pub mismatched: Vec<Mismatch>,
    pub missing: Vec<String>,
}

impl VerifyReport {
    /// True when every entry is present and matches
    pub fn is_ok(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }
}

/// Check a manifest against the files in `dir`
pub fn verify_manifest(manifest: &Manifest, dir: &Path) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    for entry in manifest.entries() {
        let path = dir.join(&entry.name);
        if !path.is_file() {
            warn!("{} is listed in the manifest but missing", entry.name);
            report.missing.push(entry.name.clone());
            continue;
        }
        match verify_file(&path, &entry.digest)? {
            Ok(()) => report.matched.push(entry.name.clone()),
            Err(actual) => {
                warn!("Digest mismatch for {}", entry.name);
                report.mismatched.push(Mismatch {
                    name: entry.name.clone(),
                    expected: entry.digest.clone(),
                    actual,
                });
            }
        }
    }
    Ok(report)
}

/// Extract `package` into a scratch area under `scratch_root` and verify it
pub fn verify_package<C: ArchiveCodec + ?Sized>(
    package: &Path,
    codec: &C,
    scratch_root: &Path,
) -> Result<VerifyReport> {
    if !package.is_file() {
        return Err(Error::MissingPath {
            what: "package",
            path: package.to_path_buf(),
        });
    }
    let scratch = Scratch::create(scratch_root)?;
    codec.extract(package, scratch.path())?;

    let manifest_path = scratch.path().join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(Error::MissingMember {
            name: MANIFEST_FILE.to_string(),
            archive: package.to_path_buf(),
        });
    }
    let manifest = Manifest::load(&manifest_path)?;
    debug!("Verifying {} entries of {}", manifest.len(), package.display());
    let report = verify_manifest(&manifest, scratch.path())?;

    scratch.close()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;
    use crate::manifest::FileRole;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_verify_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in ["vm.qcow2", "day0.txt", "image_properties.xml"] {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }

        let mut manifest = Manifest::new();
        manifest
            .record_file(&dir.join("vm.qcow2"), FileRole::RootImage, HashAlgorithm::Sha1)
            .unwrap();
        manifest
            .record_file(&dir.join("day0.txt"), FileRole::NumberedBootstrapFile(1), HashAlgorithm::Sha256)
            .unwrap();
        manifest
            .record_file(&dir.join("image_properties.xml"), FileRole::ImageProperties, HashAlgorithm::Sha256)
            .unwrap();

        fs::write(dir.join("day0.txt"), b"tampered").unwrap();
        fs::remove_file(dir.join("image_properties.xml")).unwrap();

        let report = verify_manifest(&manifest, dir).unwrap();
        assert_eq!(report.matched, vec!["vm.qcow2"]);
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.mismatched[0].name, "day0.txt");
        assert_eq!(report.missing, vec!["image_properties.xml"]);
        assert!(!report.is_ok());
    }
}
