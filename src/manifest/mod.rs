// src/manifest/mod.rs
//! Package manifest (`package.mf`)
//!
//! The manifest lists every file in a package with its role and digest:
//!
//! ```xml
//! <!-- sha256sum - for calculating checksum -->
//! <PackageContents>
//!   <Packaging_Version>1.0</Packaging_Version>
//!   <File_Info>
//!     <name>asav.qcow2</name>
//!     <type>root_image</type>
//!     <sha256_checksum>...</sha256_checksum>
//!   </File_Info>
//! </PackageContents>
//! ```
//!
//! Entries are kept in memory until every one is resolved; the file is only
//! written once the whole manifest is known.

use crate::error::{Error, Result};
use crate::hash::{hash_file, Hash, HashAlgorithm};
use crate::markup::{Document, Node, Record};
use std::fmt;
use std::fs;
use std::path::{Component, Path};
use tracing::debug;

/// File name of the manifest inside a package
pub const MANIFEST_FILE: &str = "package.mf";

/// Packaging format version written by HA-aware packages and migrations
pub const PACKAGING_VERSION: &str = "1.0";

const ROOT_ELEMENT: &str = "PackageContents";
const ENTRY_ELEMENT: &str = "File_Info";
const VERSION_ELEMENT: &str = "Packaging_Version";

/// Role of a file within a package
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileRole {
    RootImage,
    /// Additional disk image, numbered from 1
    EphemeralDisk(u32),
    ImageProperties,
    SystemGeneratedProperties,
    /// Bootstrap file in HA packages; the VM is carried by the property document
    BootstrapFile,
    /// Numbered bootstrap file in non-HA packages, from 1
    NumberedBootstrapFile(u32),
    Unknown,
}

impl FileRole {
    /// Parse a role name; unrecognised names map to [`FileRole::Unknown`]
    ///
    /// Both `ephemeral_disk1_image` and `ephemeral_disk_1_image` are accepted.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s {
            "root_image" => return Self::RootImage,
            "image_properties" => return Self::ImageProperties,
            "system_generated_properties" => return Self::SystemGeneratedProperties,
            "bootstrap_file" => return Self::BootstrapFile,
            _ => {}
        }

        if let Some(index) = s
            .strip_prefix("ephemeral_disk")
            .and_then(|rest| rest.strip_suffix("_image"))
            .map(|n| n.trim_start_matches('_'))
            .and_then(|n| n.parse::<u32>().ok())
        {
            return Self::EphemeralDisk(index);
        }

        if let Some(index) = s
            .strip_prefix("bootstrap_file_")
            .and_then(|n| n.parse::<u32>().ok())
        {
            return Self::NumberedBootstrapFile(index);
        }

        Self::Unknown
    }

    /// Whether this role marks a disk image
    pub fn is_disk_image(&self) -> bool {
        matches!(self, Self::RootImage | Self::EphemeralDisk(_))
    }

    /// Whether this role marks a bootstrap file
    pub fn is_bootstrap(&self) -> bool {
        matches!(self, Self::BootstrapFile | Self::NumberedBootstrapFile(_))
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootImage => write!(f, "root_image"),
            Self::EphemeralDisk(n) => write!(f, "ephemeral_disk{}_image", n),
            Self::ImageProperties => write!(f, "image_properties"),
            Self::SystemGeneratedProperties => write!(f, "system_generated_properties"),
            Self::BootstrapFile => write!(f, "bootstrap_file"),
            Self::NumberedBootstrapFile(n) => write!(f, "bootstrap_file_{}", n),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One file listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Archive-relative file name
    pub name: String,
    pub role: FileRole,
    pub digest: Hash,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, role: FileRole, digest: Hash) -> Self {
        Self {
            name: name.into(),
            role,
            digest,
        }
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("name", Node::scalar(&self.name))
            .with("type", Node::scalar(self.role.to_string()))
            .with(
                self.digest.algorithm.manifest_field(),
                Node::scalar(&self.digest.value),
            )
    }

    fn from_node(node: &Node) -> Result<Self> {
        let Node::Record(record) = node else {
            return Err(Error::schema(MANIFEST_FILE, "File_Info entry has no fields"));
        };

        let name = record
            .text("name")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::schema(MANIFEST_FILE, "File_Info entry without a name"))?;
        if !is_plain_file_name(name) {
            return Err(Error::schema(
                MANIFEST_FILE,
                format!("{} is not a plain file name at the archive root", name),
            ));
        }
        let role = record
            .text("type")
            .map(FileRole::parse)
            .ok_or_else(|| Error::schema(MANIFEST_FILE, format!("{} has no type", name)))?;

        // A legacy digest wins so that legacy detection stays conservative
        let digest = [HashAlgorithm::Sha1, HashAlgorithm::Sha256]
            .into_iter()
            .find_map(|algorithm| {
                record
                    .text(algorithm.manifest_field())
                    .map(|value| Hash::new(algorithm, value))
            })
            .ok_or_else(|| Error::schema(MANIFEST_FILE, format!("{} has no checksum", name)))??;

        Ok(Self::new(name, role, digest))
    }
}

/// Whether `name` is a single normal path component
///
/// Entry names are joined onto the extraction directory, so anything that
/// could escape it (absolute paths, `..`, nested paths) is refused.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Ordered list of manifest entries plus the packaging version marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    version: Option<String>,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifest carrying the current packaging version marker
    pub fn versioned() -> Self {
        Self {
            version: Some(PACKAGING_VERSION.to_string()),
            entries: Vec::new(),
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// First entry with the given role
    pub fn find_role(&self, role: &FileRole) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| &e.role == role)
    }

    /// Append an entry; names must be unique within a manifest
    pub fn push(&mut self, entry: ManifestEntry) -> Result<()> {
        if self.get(&entry.name).is_some() {
            return Err(Error::validation(
                "image_list",
                format!("{} is listed more than once", entry.name),
            ));
        }
        if entry.role == FileRole::RootImage && self.find_role(&FileRole::RootImage).is_some() {
            return Err(Error::TooManyRootDisks(entry.name.into()));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Hash a file and append it under `role`
    pub fn record_file(
        &mut self,
        path: &Path,
        role: FileRole,
        algorithm: HashAlgorithm,
    ) -> Result<&ManifestEntry> {
        if !path.is_file() {
            return Err(Error::MissingSourceFile(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::MissingSourceFile(path.to_path_buf()))?;
        let digest = hash_file(path, algorithm)?;
        debug!("Recorded {} as {} ({})", name, role, digest);

        self.push(ManifestEntry::new(name, role, digest))?;
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Remove every disk-image entry, returning the removed entries
    pub fn remove_disk_images(&mut self) -> Vec<ManifestEntry> {
        let (images, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.role.is_disk_image());
        self.entries = rest;
        images
    }

    /// Digest kind the manifest was written with
    ///
    /// Legacy if any entry carries a legacy digest; an empty manifest uses
    /// the current algorithm.
    pub fn digest_kind(&self) -> HashAlgorithm {
        if self.entries.iter().any(|e| e.digest.algorithm.is_legacy()) {
            HashAlgorithm::Sha1
        } else {
            HashAlgorithm::Sha256
        }
    }

    /// Recompute every digest from the files in `dir` using `algorithm`
    ///
    /// All files are checked for presence before any digest changes.
    pub fn rehash(&mut self, dir: &Path, algorithm: HashAlgorithm) -> Result<()> {
        if let Some(missing) = self.entries.iter().find(|e| !dir.join(&e.name).is_file()) {
            return Err(Error::MissingManifestFile {
                name: missing.name.clone(),
                path: dir.join(&missing.name),
            });
        }
        for entry in &mut self.entries {
            entry.digest = hash_file(&dir.join(&entry.name), algorithm)?;
        }
        Ok(())
    }

    /// Parse manifest markup
    pub fn parse(content: &str) -> Result<Self> {
        let document = Document::parse(content, MANIFEST_FILE)?;
        if document.root != ROOT_ELEMENT {
            return Err(Error::schema(
                MANIFEST_FILE,
                format!("expected {} root element, found {}", ROOT_ELEMENT, document.root),
            ));
        }

        let version = document
            .body
            .text(VERSION_ELEMENT)
            .map(|v| v.trim().to_string());
        let entries = match document.body.get(ENTRY_ELEMENT) {
            Some(node) => node
                .items()
                .into_iter()
                .map(ManifestEntry::from_node)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let mut manifest = Self {
            version,
            entries: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            manifest.push(entry).map_err(|e| Error::schema(MANIFEST_FILE, e.to_string()))?;
        }
        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content)
    }

    /// Render the manifest markup, including the digest comment line
    pub fn to_xml(&self) -> Result<String> {
        let mut document = Document::new(ROOT_ELEMENT);
        if let Some(version) = &self.version {
            document.body.set_text(VERSION_ELEMENT, version.as_str());
        }
        for entry in &self.entries {
            document
                .body
                .append(ENTRY_ELEMENT, Node::Record(entry.to_record()));
        }

        let comment = format!(" {}sum - for calculating checksum ", self.digest_kind().name());
        document.to_xml_with_comment(&comment)
    }

    /// Write the manifest file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml()?).map_err(|e| Error::io(path, e))
    }
}
