// src/config/validate.rs
//! Configuration validation
//!
//! Checks run before anything is written. The first failing rule is
//! reported as a validation error naming the offending field.

use super::{HaMode, PackageConfig, ProfileConfig, VNF_TYPES, value_text};
use crate::error::{Error, Result};
use crate::markup::{is_valid_name, Node};
use crate::properties::custom::{legacy_custom_property, CustomProperty};
use regex::Regex;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9.]+$").unwrap());
static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+$").unwrap());
static DISK_HINT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(root|ephemeral\d+)$").unwrap());

const MAX_VOLUME_GIB: i64 = 256;
const DRIVE_TYPES: &[&str] = &["cdrom", "disk"];
const BUS_TYPES: &[&str] = &["virtio", "scsi", "ide"];
const VOLUME_DEVICE_TYPES: &[&str] = &["disk", "cdrom"];
const VOLUME_FORMATS: &[&str] = &["qcow2", "raw", "vmdk"];

/// Validate a configuration record
pub fn validate(config: &PackageConfig) -> Result<()> {
    validate_required(config)?;
    validate_images(config)?;
    validate_bootstrap_counts(config)?;
    validate_identity(config)?;
    validate_image_properties(config)?;
    validate_resources(config)?;
    validate_cloud_init(config)?;
    validate_volumes(config)?;
    validate_ha_names(config)?;
    validate_custom(config)?;
    validate_profiles(config)?;
    Ok(())
}

fn validate_required(config: &PackageConfig) -> Result<()> {
    for field in ["vnf_type", "package_filename", "vnf_version", "vnf_name", "app_vendor"] {
        config.required(field)?;
    }
    if config.image_properties.monitored.is_none() {
        return Err(Error::validation(
            "monitored",
            "monitored property for VNF is missing",
        ));
    }
    Ok(())
}

fn validate_images(config: &PackageConfig) -> Result<()> {
    if config.image_list.is_empty() {
        return Err(Error::validation("image_list", "at least one disk image is required"));
    }
    for image in &config.image_list {
        if image.image_name.len() > 5 && !image.image_name.ends_with(".qcow2") {
            return Err(Error::validation(
                "image_name",
                format!("invalid image name extension: {}", image.image_name),
            ));
        }
        if let Some(hint) = image.disk.as_deref() {
            if !DISK_HINT_PATTERN.is_match(hint) {
                return Err(Error::validation(
                    "image_list",
                    format!("invalid disk hint '{}' for {}: use root or ephemeral<N>", hint, image.image_name),
                ));
            }
        }
    }
    Ok(())
}

fn validate_bootstrap_counts(config: &PackageConfig) -> Result<()> {
    let Some(files) = &config.bootstrap.file_list else {
        return Ok(());
    };
    if let Some(ha_capable) = config.resource_properties.ha_capable {
        let needed = if ha_capable { 2 } else { 1 };
        if files.len() < needed {
            return Err(Error::validation(
                "file_list",
                format!(
                    "invalid number of bootstrap files for the chosen ha_capable value: need at least {}",
                    needed
                ),
            ));
        }
    }
    Ok(())
}

fn validate_identity(config: &PackageConfig) -> Result<()> {
    let vnf_type = config.required("vnf_type")?;
    if !VNF_TYPES.contains(&vnf_type) {
        return Err(Error::validation(
            "vnf_type",
            format!("invalid VNF type {}; allowed: {}", vnf_type, VNF_TYPES.join(", ")),
        ));
    }

    let version = config.required("vnf_version")?;
    if version.starts_with('.') || version.ends_with('.') || !VERSION_PATTERN.is_match(version) {
        return Err(Error::validation("vnf_version", format!("invalid VNF version {}", version)));
    }

    for field in ["package_filename", "vnf_name", "vnf_type", "vnf_version"] {
        let value = config.required(field)?;
        if !IDENTIFIER_PATTERN.is_match(value) {
            return Err(Error::validation(
                field,
                format!("invalid {} '{}': only letters, digits, '.' and '-' are allowed", field, value),
            ));
        }
    }
    Ok(())
}

fn validate_image_properties(config: &PackageConfig) -> Result<()> {
    if let Some(bootup_time) = config.image_properties.bootup_time {
        if !(600..=3000).contains(&bootup_time) {
            return Err(Error::validation(
                "bootup_time",
                "invalid bootup_time; can only be between 600 and 3000",
            ));
        }
    }
    Ok(())
}

fn validate_resources(config: &PackageConfig) -> Result<()> {
    let resources = &config.resource_properties;

    if let Some(vnic_max) = resources.vnic_max {
        if !(8..=256).contains(&vnic_max) {
            return Err(Error::validation("vnic_max", "allowed range is 8-256"));
        }
    }

    let vnic_max = resources.vnic_max.unwrap_or(8);
    if let Some(mgmt_vnic) = resources.mgmt_vnic {
        if !(0..=vnic_max).contains(&mgmt_vnic) {
            return Err(Error::validation("mgmt_vnic", "allowed range is 0 to vnic_max"));
        }
    }

    if let Some(count) = resources.mgmt_vnic_count {
        if !(0..=2).contains(&count) {
            return Err(Error::validation("mgmt_vnic_count", "allowed range is 0-2"));
        }
    }

    if let (Some(ha_vnic_count), Some(mgmt_vnic_count), Some(vnic_max)) = (
        resources.ha_vnic_count,
        resources.mgmt_vnic_count,
        resources.vnic_max,
    ) {
        let limit = vnic_max - mgmt_vnic_count - 2;
        if !(0..=limit).contains(&ha_vnic_count) {
            return Err(Error::validation(
                "ha_vnic_count",
                "allowed range is 0 to vnic_max-mgmt_vnic_count-2",
            ));
        }
    }

    if let Some(ha_vnic) = resources.ha_vnic {
        if !(0..=vnic_max).contains(&ha_vnic) {
            return Err(Error::validation("ha_vnic", "allowed range is 0 to vnic_max"));
        }
    }
    Ok(())
}

fn validate_cloud_init(config: &PackageConfig) -> Result<()> {
    let bootstrap = &config.bootstrap;
    if let Some(drive) = bootstrap.bootstrap_cloud_init_drive_type.as_deref() {
        if !DRIVE_TYPES.contains(&drive) {
            return Err(Error::validation(
                "bootstrap_cloud_init_drive_type",
                "cloud-init drive type can only be cdrom or disk",
            ));
        }
    }
    if let Some(bus) = bootstrap.bootstrap_cloud_init_bus_type.as_deref() {
        if !BUS_TYPES.contains(&bus) {
            return Err(Error::validation(
                "bootstrap_cloud_init_bus_type",
                "cloud-init bus type can only be ide, scsi or virtio",
            ));
        }
    }
    Ok(())
}

/// Volume size in GiB, using the decimal conversion of the input format
fn volume_size_gib(size: i64, unit: &str) -> Option<i64> {
    match unit {
        "MiB" => Some(size / 1000),
        "GiB" => Some(size),
        "TiB" => Some(size * 1000),
        _ => None,
    }
}

fn validate_volumes(config: &PackageConfig) -> Result<()> {
    for volume in &config.volumes {
        if let (Some(size), Some(unit)) = (volume.get("size"), volume.get("sizeunit")) {
            let size_text = value_text(size);
            let size: i64 = size_text.trim().parse().map_err(|_| {
                Error::validation("size", format!("invalid volume size {}", size_text))
            })?;
            if volume_size_gib(size, &value_text(unit)).is_some_and(|gib| gib > MAX_VOLUME_GIB) {
                return Err(Error::validation(
                    "size",
                    format!("max allowed volume size is {} GiB", MAX_VOLUME_GIB),
                ));
            }
        }
        if let Some(device) = volume.get("deviceType").map(value_text) {
            if !VOLUME_DEVICE_TYPES.contains(&device.as_str()) {
                return Err(Error::validation("deviceType", "volume device type has to be disk or cdrom"));
            }
        }
        if let Some(format) = volume.get("format").map(value_text) {
            if !VOLUME_FORMATS.contains(&format.as_str()) {
                return Err(Error::validation("format", "volume format has to be raw, qcow2 or vmdk"));
            }
        }
    }
    Ok(())
}

fn validate_ha_names(config: &PackageConfig) -> Result<()> {
    if !config.ha_package {
        return Ok(());
    }
    for field in ["vnf_name", "vnf_version", "vnf_type"] {
        if config.required(field)?.contains('_') {
            return Err(Error::validation(field, "'_' is not allowed in HA packaging"));
        }
    }

    for file in config.bootstrap.files() {
        let name = file
            .name
            .as_deref()
            .ok_or_else(|| Error::validation("name", "bootstrap file name is missing"))?;
        if file.mnt_point.is_none() {
            return Err(Error::validation("mnt_point", format!("mount point is missing for {}", name)));
        }
        if file.parse.is_none() {
            return Err(Error::validation("parse", format!("parse flag is missing for {}", name)));
        }
        let ha_mode = file
            .ha_mode
            .as_deref()
            .ok_or_else(|| Error::validation("ha_mode", format!("HA mode is missing for {}", name)))?;
        ha_mode.parse::<HaMode>().map_err(|_| {
            Error::validation(
                "ha_mode",
                format!("invalid HA mode '{}' for {}; expected standalone, primary or secondary", ha_mode, name),
            )
        })?;
    }
    Ok(())
}

fn validate_custom(config: &PackageConfig) -> Result<()> {
    for spec in &config.custom {
        CustomProperty::from_tokens(spec).validate()?;
        if config.ha_package {
            continue;
        }
        // Legacy keys become element names
        if let Some(Node::Record(record)) = legacy_custom_property(spec) {
            if let Some((key, _)) = record.fields.iter().find(|(key, _)| !is_valid_name(key)) {
                return Err(Error::validation(
                    "custom",
                    format!("'{}' cannot be used as a legacy custom property key", key),
                ));
            }
        }
    }
    Ok(())
}

fn validate_profile_bounds(profile: &ProfileConfig, config: &PackageConfig) -> Result<()> {
    let resources = &config.resource_properties;
    let out_of_range = |value: i64, min: Option<i64>, max: Option<i64>, scale: i64| {
        min.is_some_and(|min| value < min * scale) || max.is_some_and(|max| value > max * scale)
    };

    if out_of_range(profile.vcpus, resources.vcpu_min, resources.vcpu_max, 1) {
        return Err(Error::validation(
            "profile",
            format!("vcpus={} in profile {} is outside the vCPU range", profile.vcpus, profile.name),
        ));
    }
    if out_of_range(profile.memory_mb, resources.memory_mb_min, resources.memory_mb_max, 1) {
        return Err(Error::validation(
            "profile",
            format!("memory_mb={} in profile {} is outside the memory range", profile.memory_mb, profile.name),
        ));
    }
    if out_of_range(profile.root_disk_mb, resources.root_disk_gb_min, resources.root_disk_gb_max, 1024) {
        return Err(Error::validation(
            "profile",
            format!("root_disk_mb={} in profile {} is outside the disk range", profile.root_disk_mb, profile.name),
        ));
    }
    Ok(())
}

fn validate_profiles(config: &PackageConfig) -> Result<()> {
    if config.profiles.is_empty() {
        return Ok(());
    }
    for profile in &config.profiles {
        validate_profile_bounds(profile, config)?;
    }
    let default = config
        .default_profile
        .as_deref()
        .ok_or_else(|| Error::validation("default_profile", "default_profile must be provided with profiles"))?;
    if !config.profiles.iter().any(|p| p.name == default) {
        return Err(Error::validation(
            "default_profile",
            format!("default_profile {} is not one of the declared profiles", default),
        ));
    }
    Ok(())
}
