// src/classifier/mod.rs
//! File classification into manifest roles
//!
//! A [`FileClassifier`] is created once per package build. Its counters
//! live for the whole build: the disk counter is shared by every call that
//! classifies disk images, so a second batch of images continues numbering
//! where the first stopped.

mod disk;

pub use disk::{order_disk_images, DiskImage};

use crate::error::{Error, Result};
use crate::manifest::FileRole;
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, Display};
use tracing::debug;

/// Kind of source file being classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SourceCategory {
    DiskImage,
    ImageProperties,
    SystemGeneratedProperties,
    Bootstrap,
    Other,
}

/// A source file with its assigned role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    pub role: FileRole,
}

/// Running role counters for one package
#[derive(Debug, Default)]
struct RoleCounter {
    root_assigned: bool,
    next_ephemeral: u32,
    next_bootstrap: u32,
}

impl RoleCounter {
    fn disk_role(&mut self) -> FileRole {
        if !self.root_assigned {
            self.root_assigned = true;
            self.next_ephemeral = 1;
            return FileRole::RootImage;
        }
        let role = FileRole::EphemeralDisk(self.next_ephemeral);
        self.next_ephemeral += 1;
        role
    }

    fn bootstrap_role(&mut self, ha: bool) -> FileRole {
        if ha {
            return FileRole::BootstrapFile;
        }
        self.next_bootstrap += 1;
        FileRole::NumberedBootstrapFile(self.next_bootstrap)
    }
}

/// Assigns manifest roles to source files
#[derive(Debug)]
pub struct FileClassifier {
    ha: bool,
    counter: RoleCounter,
}

impl FileClassifier {
    /// Create a classifier; `ha` selects shared bootstrap roles
    pub fn new(ha: bool) -> Self {
        Self {
            ha,
            counter: RoleCounter::default(),
        }
    }

    pub fn is_ha(&self) -> bool {
        self.ha
    }

    /// Assign roles to `sources` in declaration order
    ///
    /// Every source must exist; a missing file fails the whole batch.
    pub fn classify<P: AsRef<Path>>(
        &mut self,
        sources: &[P],
        category: SourceCategory,
    ) -> Result<Vec<ClassifiedFile>> {
        if let Some(missing) = sources.iter().find(|p| !p.as_ref().is_file()) {
            return Err(Error::MissingSourceFile(missing.as_ref().to_path_buf()));
        }

        let classified: Vec<ClassifiedFile> = sources
            .iter()
            .map(|path| {
                let role = match category {
                    SourceCategory::DiskImage => self.counter.disk_role(),
                    SourceCategory::ImageProperties => FileRole::ImageProperties,
                    SourceCategory::SystemGeneratedProperties => FileRole::SystemGeneratedProperties,
                    SourceCategory::Bootstrap => self.counter.bootstrap_role(self.ha),
                    SourceCategory::Other => FileRole::Unknown,
                };
                ClassifiedFile {
                    path: path.as_ref().to_path_buf(),
                    role,
                }
            })
            .collect();

        for file in &classified {
            debug!("Classified {} ({}) as {}", file.path.display(), category, file.role);
        }
        Ok(classified)
    }
}
