// src/classifier/disk.rs
//! Disk image ordering by role hint
//!
//! Configuration records may tag each image with a hint such as `root` or
//! `ephemeral2`. The root image always goes first; an `ephemeral<N>` image
//! is placed at position N. Images without a hint keep their declared
//! position relative to the others.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static EPHEMERAL_HINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").unwrap());

/// A disk image declared in a configuration record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    pub path: PathBuf,
    pub hint: Option<String>,
}

impl DiskImage {
    pub fn new(path: impl Into<PathBuf>, hint: Option<&str>) -> Self {
        Self {
            path: path.into(),
            hint: hint.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiskHint {
    Root,
    Ephemeral(usize),
    Unhinted,
}

fn parse_hint(image: &DiskImage) -> Result<DiskHint> {
    let Some(hint) = image.hint.as_deref() else {
        return Ok(DiskHint::Unhinted);
    };
    let hint = hint.trim().to_lowercase();
    if hint.is_empty() {
        return Ok(DiskHint::Unhinted);
    }
    if hint.contains("root") {
        return Ok(DiskHint::Root);
    }

    EPHEMERAL_HINT
        .captures(&hint)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .map(DiskHint::Ephemeral)
        .ok_or_else(|| {
            Error::validation(
                "image_list",
                format!(
                    "invalid number of root/ephemeral disks: {} has hint '{}'",
                    image.path.display(),
                    hint
                ),
            )
        })
}

/// Order images so that the root image is first and ephemeral disks follow
/// their declared index
///
/// More than one `root` hint is rejected with [`Error::TooManyRootDisks`],
/// naming the second root image.
pub fn order_disk_images(images: &[DiskImage]) -> Result<Vec<PathBuf>> {
    let mut keyed = Vec::with_capacity(images.len());
    let mut root_seen = false;

    for (position, image) in images.iter().enumerate() {
        let key = match parse_hint(image)? {
            DiskHint::Root => {
                if root_seen {
                    return Err(Error::TooManyRootDisks(image.path.clone()));
                }
                root_seen = true;
                0
            }
            DiskHint::Ephemeral(index) => index,
            DiskHint::Unhinted => position,
        };
        keyed.push((key, image.path.clone()));
    }

    // Stable: equal keys keep declaration order
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}
