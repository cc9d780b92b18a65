// src/config/mod.rs

//! Packaging configuration record
//!
//! A package is described by a JSON document. Field names follow the
//! packaging tool's established input format, so existing configuration
//! files keep working; several fields accept the older aliases
//! (`min_vcpu`, `privilege`, `boot_time`, ...).

mod validate;

pub use validate::validate;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, Display, EnumString};

/// Complete packaging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    pub vnf_name: Option<String>,
    pub vnf_type: Option<String>,
    pub vnf_version: Option<String>,
    pub app_vendor: Option<String>,

    /// Output file name, without directory
    pub package_filename: Option<String>,

    /// Directory the package (and its scratch area) is written to
    pub package_output_dir: Option<PathBuf>,

    #[serde(default)]
    pub image_list: Vec<ImageEntry>,

    #[serde(default)]
    pub image_properties: ImagePropertiesConfig,

    #[serde(default)]
    pub resource_properties: ResourceConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Custom property specifications, one token list per property
    #[serde(default)]
    pub custom: Vec<Vec<String>>,

    /// Storage volumes, passed through to the property document
    #[serde(default)]
    pub volumes: Vec<Map<String, Value>>,

    /// Deployment profiles (non-HA packages only)
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,

    pub default_profile: Option<String>,

    #[serde(default)]
    pub multi_use: bool,

    /// HA-aware packaging (target dialect); defaults to on
    #[serde(default = "default_true")]
    pub ha_package: bool,

    /// Remove bootstrap sources after a successful build
    #[serde(default)]
    pub cleanup: bool,
}

fn default_true() -> bool {
    true
}

/// One disk image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    pub image_name: String,

    #[serde(default = "default_dir")]
    pub path: PathBuf,

    /// Role hint: `root` or `ephemeral<N>`
    pub disk: Option<String>,
}

impl ImageEntry {
    pub fn full_path(&self) -> PathBuf {
        self.path.join(&self.image_name)
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagePropertiesConfig {
    pub monitored: Option<bool>,

    #[serde(alias = "boot_time")]
    pub bootup_time: Option<i64>,

    #[serde(alias = "privilege")]
    pub privileged_vm: Option<bool>,

    #[serde(alias = "sriov")]
    pub sriov_supported: Option<bool>,
    pub sriov_driver_list: Option<Vec<String>>,

    #[serde(alias = "pcie")]
    pub pcie_supported: Option<bool>,
    pub pcie_driver_list: Option<Vec<String>>,

    pub console_type_serial: Option<bool>,
    pub dedicate_cores: Option<bool>,

    #[serde(alias = "optimize")]
    pub low_latency: Option<bool>,
    pub sysinfo_support: Option<bool>,

    pub virtual_interface_model: Option<String>,
    pub thick_disk_provisioning: Option<bool>,
    pub eager_zero: Option<bool>,
    pub interface_hot_add: Option<bool>,
    pub interface_hot_delete: Option<bool>,

    /// Interface names, rendered as `vnics:<name>`
    pub vnic_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(alias = "min_vcpu")]
    pub vcpu_min: Option<i64>,
    #[serde(alias = "max_vcpu")]
    pub vcpu_max: Option<i64>,
    #[serde(alias = "min_mem")]
    pub memory_mb_min: Option<i64>,
    #[serde(alias = "max_mem")]
    pub memory_mb_max: Option<i64>,
    #[serde(alias = "min_disk")]
    pub root_disk_gb_min: Option<i64>,
    #[serde(alias = "max_disk")]
    pub root_disk_gb_max: Option<i64>,

    pub vnic_max: Option<i64>,
    pub mgmt_vnic: Option<i64>,
    pub mgmt_vnic_count: Option<i64>,
    pub ha_vnic: Option<i64>,
    pub ha_vnic_count: Option<i64>,
    pub ha_capable: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub nocloud: Option<bool>,
    pub bootstrap_cloud_init_drive_type: Option<String>,
    pub bootstrap_cloud_init_bus_type: Option<String>,

    /// Present only when the record lists bootstrap files
    pub file_list: Option<Vec<BootstrapFileConfig>>,
}

impl BootstrapConfig {
    pub fn files(&self) -> &[BootstrapFileConfig] {
        self.file_list.as_deref().unwrap_or(&[])
    }
}

/// One bootstrap file and the variables it declares
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapFileConfig {
    pub name: Option<String>,

    #[serde(default = "default_dir")]
    pub path: PathBuf,

    pub mnt_point: Option<String>,
    pub parse: Option<bool>,
    pub ha_mode: Option<String>,

    #[serde(default, rename = "userInput")]
    pub user_input: Vec<UserInputVar>,

    #[serde(default, rename = "sysGen")]
    pub sys_gen: Vec<SysGenVar>,
}

/// Variable the operator supplies at deployment time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInputVar {
    pub name: String,
    pub display_str: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub mandatory: Option<Value>,
    pub value: Option<Value>,
    #[serde(default)]
    pub attributes: Vec<VarAttribute>,
}

/// Variable the platform generates at deployment time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SysGenVar {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Extra attribute on a user input variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarAttribute {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    pub description: Option<String>,
    pub vcpus: i64,
    pub memory_mb: i64,
    pub root_disk_mb: i64,
}

/// Role of a VM in an HA deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HaMode {
    Standalone,
    Primary,
    Secondary,
}

impl HaMode {
    /// VM index written to the `vm` attribute of a bootstrap node
    pub fn vm_index(&self) -> &'static str {
        match self {
            Self::Standalone => "0",
            Self::Primary => "1",
            Self::Secondary => "2",
        }
    }
}

/// Allowed VNF types
pub const VNF_TYPES: &[&str] = &[
    "FIREWALL",
    "ROUTER",
    "LOADBALANCER",
    "OTHER",
    "vWAAS",
    "vWLC",
    "WLC",
];

/// Text form of a JSON scalar; strings are taken verbatim
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl PackageConfig {
    /// Parse a configuration record from JSON
    pub fn from_json(content: &str, label: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::schema(label, e.to_string()))
    }

    /// Read a configuration record from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingPath {
                what: "configuration file",
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Whether the VM supports HA deployment
    pub fn ha_capable(&self) -> bool {
        self.resource_properties.ha_capable.unwrap_or(false)
    }

    /// Value of a required string field
    pub fn required(&self, field: &'static str) -> Result<&str> {
        let value = match field {
            "vnf_name" => self.vnf_name.as_deref(),
            "vnf_type" => self.vnf_type.as_deref(),
            "vnf_version" => self.vnf_version.as_deref(),
            "app_vendor" => self.app_vendor.as_deref(),
            "package_filename" => self.package_filename.as_deref(),
            _ => None,
        };
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::validation(field, format!("{} is missing", field)))
    }
}
