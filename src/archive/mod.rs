// src/archive/mod.rs
//! Archive codec
//!
//! The engine depends only on the [`ArchiveCodec`] contract: create an
//! archive from a list of members, or extract one into a directory. Both
//! operations are all-or-nothing from the caller's point of view.
//!
//! [`TarCodec`] is the production implementation. Members are always
//! re-rooted at the archive root, whatever directory they came from, and a
//! new archive only appears at the output path once it is complete.

use crate::compression::open_decoder;
use crate::error::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use tempfile::NamedTempFile;
use tracing::debug;

/// One archive member: a file name and the directory it is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub source_dir: PathBuf,
    pub name: String,
}

impl ArchiveMember {
    pub fn new(source_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            name: name.into(),
        }
    }

    /// Split a file path into its directory and archive-relative name
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::MissingSourceFile(path.to_path_buf()))?;
        let source_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self { source_dir, name })
    }

    /// Full path of the member's source file
    pub fn source_path(&self) -> PathBuf {
        self.source_dir.join(&self.name)
    }
}

/// Contract for producing and unpacking package archives
pub trait ArchiveCodec {
    /// Write `members` into a new archive at `output`
    fn create(&self, output: &Path, members: &[ArchiveMember], compressed: bool) -> Result<()>;

    /// Unpack the archive at `input` into `dest`
    fn extract(&self, input: &Path, dest: &Path) -> Result<()>;
}

/// Tar archives, gzip-compressed on request
#[derive(Debug, Clone, Copy, Default)]
pub struct TarCodec;

impl TarCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveCodec for TarCodec {
    fn create(&self, output: &Path, members: &[ArchiveMember], compressed: bool) -> Result<()> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Stage next to the destination so the final rename stays on one filesystem
        let staging = NamedTempFile::new_in(parent).map_err(|e| Error::archive("create", output, e))?;
        write_archive(staging.as_file(), members, compressed)
            .map_err(|e| Error::archive("create", output, e))?;
        staging
            .persist(output)
            .map_err(|e| Error::archive("create", output, e.error))?;

        debug!(
            "Created {} with {} members (compressed: {})",
            output.display(),
            members.len(),
            compressed
        );
        Ok(())
    }

    fn extract(&self, input: &Path, dest: &Path) -> Result<()> {
        let (format, decoder) = open_decoder(input).map_err(|e| Error::archive("extract", input, e))?;
        debug!("Extracting {} ({}) into {}", input.display(), format, dest.display());

        let mut archive = Archive::new(decoder);
        archive
            .unpack(dest)
            .map_err(|e| Error::archive("extract", input, e))
    }
}

fn write_archive<W: Write>(writer: W, members: &[ArchiveMember], compressed: bool) -> io::Result<()> {
    if compressed {
        let mut builder = Builder::new(GzEncoder::new(writer, Compression::default()));
        append_members(&mut builder, members)?;
        builder.into_inner()?.finish()?;
    } else {
        let mut builder = Builder::new(writer);
        append_members(&mut builder, members)?;
        builder.into_inner()?;
    }
    Ok(())
}

fn append_members<W: Write>(builder: &mut Builder<W>, members: &[ArchiveMember]) -> io::Result<()> {
    for member in members {
        builder.append_path_with_name(member.source_path(), &member.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressionFormat;
    use std::fs;
    use tempfile::TempDir;

    fn sources(temp_dir: &TempDir) -> Vec<ArchiveMember> {
        let images = temp_dir.path().join("images");
        let configs = temp_dir.path().join("configs");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&configs).unwrap();
        fs::write(images.join("vm.qcow2"), b"disk").unwrap();
        fs::write(configs.join("day0.txt"), b"hostname vnf").unwrap();
        vec![
            ArchiveMember::new(&images, "vm.qcow2"),
            ArchiveMember::new(&configs, "day0.txt"),
        ]
    }

    #[test]
    fn test_member_from_path() {
        let member = ArchiveMember::from_path(Path::new("/data/images/vm.qcow2")).unwrap();
        assert_eq!(member.source_dir, PathBuf::from("/data/images"));
        assert_eq!(member.name, "vm.qcow2");

        let member = ArchiveMember::from_path(Path::new("vm.qcow2")).unwrap();
        assert_eq!(member.source_dir, PathBuf::from("."));
    }

    #[test]
    fn test_create_and_extract_flat() {
        let temp_dir = TempDir::new().unwrap();
        let members = sources(&temp_dir);
        let output = temp_dir.path().join("pkg.tar.gz");

        TarCodec.create(&output, &members, true).unwrap();
        let header = fs::read(&output).unwrap();
        assert_eq!(CompressionFormat::from_magic_bytes(&header), CompressionFormat::Gzip);

        let dest = temp_dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        TarCodec.extract(&output, &dest).unwrap();
        assert_eq!(fs::read(dest.join("vm.qcow2")).unwrap(), b"disk");
        assert_eq!(fs::read(dest.join("day0.txt")).unwrap(), b"hostname vnf");
    }

    #[test]
    fn test_create_uncompressed() {
        let temp_dir = TempDir::new().unwrap();
        let members = sources(&temp_dir);
        let output = temp_dir.path().join("pkg.tar");

        TarCodec.create(&output, &members, false).unwrap();
        let header = fs::read(&output).unwrap();
        assert_eq!(CompressionFormat::from_magic_bytes(&header), CompressionFormat::None);

        let dest = temp_dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        TarCodec.extract(&output, &dest).unwrap();
        assert!(dest.join("vm.qcow2").is_file());
    }

    #[test]
    fn test_failed_create_leaves_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let mut members = sources(&temp_dir);
        members.push(ArchiveMember::new(temp_dir.path(), "missing.qcow2"));
        let output = temp_dir.path().join("pkg.tar.gz");

        let err = TarCodec.create(&output, &members, true).unwrap_err();
        assert!(matches!(err, Error::Archive { operation: "create", .. }));
        assert!(!output.exists());
    }
}
