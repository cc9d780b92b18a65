// src/properties/template.rs
//! Image property document construction
//!
//! A new package's `image_properties.xml` starts from a fixed template of
//! defaults which the configuration then overrides field by field.

use super::bootstrap::BootstrapAssembly;
use super::custom::{legacy_custom_property, target_custom_properties, TYPE_SELECTION, TYPE_STRING};
use super::migrate::IMAGE_TYPE;
use super::{dedup_nodes, PropertyTree};
use crate::config::{PackageConfig, ProfileConfig, value_text};
use crate::error::{Error, Result};
use crate::markup::{AttributedText, Node, Record};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Template fields and their default values, in document order
pub const TEMPLATE_DEFAULTS: &[(&str, &str)] = &[
    ("vnf_type", ""),
    ("name", ""),
    ("version", ""),
    ("applicationVendor", ""),
    ("imageType", IMAGE_TYPE),
    ("bootup_time", "600"),
    ("root_file_disk_bus", "virtio"),
    ("root_image_disk_format", "qcow2"),
    ("vcpu_min", "1"),
    ("vcpu_max", "8"),
    ("memory_mb_min", "256"),
    ("memory_mb_max", "32768"),
    ("root_disk_gb_min", "1"),
    ("root_disk_gb_max", "256"),
    ("vnic_max", "8"),
    ("monitoring_supported", "true"),
    ("monitoring_methods", "ICMPPing"),
    ("low_latency", "true"),
    ("sysinfo_support", "false"),
    ("privileged_vm", "false"),
    ("console_type_serial", "false"),
];

/// Disk image extensions a package may carry
pub const ACCEPTED_IMAGE_EXTENSIONS: &[&str] = &["iso", "img", "qcow2", "vmdk"];

/// Property tree holding only the template defaults
pub fn template_tree() -> PropertyTree {
    let mut tree = PropertyTree::new();
    let body = tree.body_mut();
    for (name, value) in TEMPLATE_DEFAULTS {
        body.set_text(name, *value);
    }
    tree
}

/// Image format tag derived from a disk image's extension
pub fn image_format(path: &Path) -> Result<&'static str> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = ACCEPTED_IMAGE_EXTENSIONS
        .iter()
        .find(|accepted| **accepted == extension)
        .copied()
        .ok_or_else(|| {
            Error::validation(
                "image_name",
                format!(
                    "unsupported image format '.{}' for {}; supported: .{}",
                    extension,
                    path.display(),
                    ACCEPTED_IMAGE_EXTENSIONS.join(", .")
                ),
            )
        })?;
    if format != "qcow2" {
        warn!("Image {} is not in qcow2 format and may not register", path.display());
    }
    Ok(format)
}

/// Build the image property tree of a new package
///
/// `disks` must already be ordered, root image first.
pub fn build_image_properties(
    config: &PackageConfig,
    disks: &[PathBuf],
    bootstrap: &BootstrapAssembly,
) -> Result<PropertyTree> {
    let mut tree = template_tree();
    let body = tree.body_mut();

    set_identity(config, body)?;
    set_disk_formats(disks, body)?;
    set_image_options(config, body);
    set_resources(config, body);
    set_cloud_init(config, body);
    set_volumes(config, body);

    bootstrap.apply(body);

    if config.ha_package {
        let mut custom = target_custom_properties(&config.custom)?;
        custom.extend(bootstrap.custom.iter().cloned());
        let mut custom = dedup_nodes(custom);
        custom.extend(special_properties(config));
        if let Some(node) = Node::from_items(custom) {
            body.set("custom_property", node);
        }
        if config.multi_use {
            body.set("default_property", default_properties());
        }
    } else {
        let custom: Vec<Node> = config
            .custom
            .iter()
            .filter_map(|spec| legacy_custom_property(spec))
            .collect();
        if let Some(node) = Node::from_items(custom) {
            body.set("custom_property", node);
        }
        set_profiles(config, body);
    }

    if let Some(privileged) = body.remove("privileged_vm") {
        body.set("disable_spoof_check", privileged);
    }

    debug!("Built image properties with {} fields", tree.body().fields.len());
    Ok(tree)
}

fn bool_text(value: bool) -> String {
    value.to_string()
}

fn set_identity(config: &PackageConfig, body: &mut Record) -> Result<()> {
    body.set_text("vnf_type", config.required("vnf_type")?);
    body.set_text("name", config.required("vnf_name")?);
    body.set_text("version", config.required("vnf_version")?);
    body.set_text("applicationVendor", config.required("app_vendor")?);
    body.set_text("imageType", IMAGE_TYPE);
    Ok(())
}

fn set_disk_formats(disks: &[PathBuf], body: &mut Record) -> Result<()> {
    let Some(root) = disks.first() else {
        return Err(Error::validation("image_list", "at least one disk image is required"));
    };
    body.set_text("root_image_disk_format", image_format(root)?);
    for (position, disk) in disks.iter().enumerate().skip(1) {
        body.set_text(&format!("disk_{}_file_disk_bus", position), "virtio");
        body.set_text(&format!("disk_{}_image_format", position), image_format(disk)?);
    }
    Ok(())
}

fn set_image_options(config: &PackageConfig, body: &mut Record) {
    let options = &config.image_properties;

    if let Some(monitored) = options.monitored {
        body.set_text("monitoring_supported", bool_text(monitored));
    }
    if let Some(bootup_time) = options.bootup_time {
        body.set_text("bootup_time", bootup_time.to_string());
    }
    if options.monitored == Some(false) {
        body.set_text("bootup_time", "-1");
    }

    let flags = [
        ("low_latency", options.low_latency),
        ("sysinfo_support", options.sysinfo_support),
        ("privileged_vm", options.privileged_vm),
        ("console_type_serial", options.console_type_serial),
        ("dedicate_cores", options.dedicate_cores),
        ("sriov_supported", options.sriov_supported),
        ("pcie_supported", options.pcie_supported),
    ];
    for (name, value) in flags {
        if let Some(value) = value {
            body.set_text(name, bool_text(value));
        }
    }

    if let Some(model) = &options.virtual_interface_model {
        body.set_text("virtual_interface_model", model.as_str());
    }
    // Only an enabled setting is written
    for (name, value) in [
        ("thick_disk_provisioning", options.thick_disk_provisioning),
        ("eager_zero", options.eager_zero),
    ] {
        if value == Some(true) {
            body.set_text(name, "true");
        }
    }

    for (flag, list_name, list) in [
        ("sriov_supported", "sriov_driver_list", &options.sriov_driver_list),
        ("pcie_supported", "pcie_driver_list", &options.pcie_driver_list),
    ] {
        if let Some(drivers) = list {
            body.set_text(flag, "true");
            let items = drivers.iter().map(|d| Node::scalar(d.as_str())).collect();
            if let Some(node) = Node::from_items(items) {
                body.set(list_name, node);
            }
        }
    }

    if let Some(names) = &options.vnic_names {
        let items = names.iter().map(|n| Node::scalar(format!("vnics:{}", n))).collect();
        if let Some(node) = Node::from_items(items) {
            body.set("vnic_names", node);
        }
    }
    for (name, value) in [
        ("interface_hot_add", options.interface_hot_add),
        ("interface_hot_delete", options.interface_hot_delete),
    ] {
        if let Some(value) = value {
            body.set_text(name, bool_text(value));
        }
    }
}

fn set_resources(config: &PackageConfig, body: &mut Record) {
    let resources = &config.resource_properties;
    let bounds = [
        ("vcpu_min", resources.vcpu_min),
        ("vcpu_max", resources.vcpu_max),
        ("memory_mb_min", resources.memory_mb_min),
        ("memory_mb_max", resources.memory_mb_max),
        ("root_disk_gb_min", resources.root_disk_gb_min),
        ("root_disk_gb_max", resources.root_disk_gb_max),
        ("vnic_max", resources.vnic_max),
        ("mgmt_vnic", resources.mgmt_vnic),
    ];
    for (name, value) in bounds {
        if let Some(value) = value {
            body.set_text(name, value.to_string());
        }
    }

    if config.ha_capable() {
        body.set_text("ha_capable", "true");
        if let Some(ha_vnic) = resources.ha_vnic {
            body.set_text("ha_vnic", ha_vnic.to_string());
            if let Some(count) = resources.ha_vnic_count {
                body.set_text("num_ha_vnics", count.to_string());
            }
        }
    }
}

fn set_cloud_init(config: &PackageConfig, body: &mut Record) {
    let bootstrap = &config.bootstrap;
    // Defaults (ide bus, cdrom drive, config-drive) are left implicit
    if bootstrap.bootstrap_cloud_init_bus_type.as_deref() == Some("virtio") {
        body.set_text("bootstrap_cloud_init_bus_type", "virtio");
    }
    if bootstrap.bootstrap_cloud_init_drive_type.as_deref() == Some("disk") {
        body.set_text("bootstrap_cloud_init_drive_type", "disk");
    }
    if bootstrap.nocloud == Some(true) {
        body.set_text("nocloud", "true");
    }
}

/// Markup node for a JSON value
fn json_node(value: &Value) -> Node {
    match value {
        Value::Object(map) => {
            let mut record = Record::new();
            for (key, value) in map {
                record.set(key, json_node(value));
            }
            Node::Record(record)
        }
        Value::Array(items) => {
            Node::from_items(items.iter().map(json_node).collect()).unwrap_or_else(|| Node::scalar(""))
        }
        other => Node::scalar(value_text(other)),
    }
}

fn set_volumes(config: &PackageConfig, body: &mut Record) {
    let volumes: Vec<Node> = config
        .volumes
        .iter()
        .map(|volume| {
            let mut record = Record::new();
            for (key, value) in volume {
                let key = match key.as_str() {
                    "deviceType" => "device_type",
                    "storageLocation" => "storage_location",
                    other => other,
                };
                record.set(key, json_node(value));
            }
            Node::Record(record)
        })
        .collect();

    if let Some(volume) = Node::from_items(volumes) {
        let volumes = Record::new().with("volume", volume);
        body.set(
            "storage",
            Node::Record(Record::new().with("volumes", Node::Record(volumes))),
        );
    }
}

fn profile_node(profile: &ProfileConfig) -> Node {
    let description = profile.description.as_deref().unwrap_or(&profile.name);
    Node::Record(
        Record::new()
            .with("name", Node::scalar(profile.name.as_str()))
            .with("description", Node::scalar(description))
            .with("vcpus", Node::scalar(profile.vcpus.to_string()))
            .with("memory_mb", Node::scalar(profile.memory_mb.to_string()))
            .with("root_disk_mb", Node::scalar(profile.root_disk_mb.to_string())),
    )
}

fn set_profiles(config: &PackageConfig, body: &mut Record) {
    let profiles = config.profiles.iter().map(profile_node).collect();
    if let Some(profile) = Node::from_items(profiles) {
        body.set("profiles", Node::Record(Record::new().with("profile", profile)));
    }
    if let Some(default) = &config.default_profile {
        body.set_text("default_profile", default.as_str());
    }
}

/// Routing defaults written for multi-use packages
fn default_properties() -> Node {
    let property = |name: &str| {
        Node::Record(
            Record::new()
                .with("name", Node::scalar(name))
                .with("type", Node::scalar(TYPE_STRING))
                .with("val", Node::scalar("routed")),
        )
    };
    Node::List(vec![property("firewallMode"), property("terminationMode")])
}

fn special_property(name: &str, display: &str, default: &str, values: Vec<AttributedText>) -> Node {
    let mut record = Record::new()
        .with("name", AttributedText::new(name).with_attr("display", display).into_node())
        .with("type", Node::scalar(TYPE_SELECTION))
        .with("default", Node::scalar(default));
    record.set_attr("special", "true");
    if let Some(values) = Node::from_items(values.into_iter().map(AttributedText::into_node).collect()) {
        record.set("val", values);
    }
    Node::Record(record)
}

fn displayed(value: &str, display: &str) -> AttributedText {
    AttributedText::new(value).with_attr("display", display)
}

/// Platform-defined selection properties of HA packages
fn special_properties(config: &PackageConfig) -> Vec<Node> {
    let mut specials = Vec::new();

    if config.ha_capable() {
        specials.push(special_property(
            "ha",
            "Enable HA",
            "true",
            vec![displayed("true", "true"), displayed("false", "false")],
        ));
    }
    if config.multi_use {
        specials.push(special_property(
            "terminationMode",
            "Termination",
            "routed",
            vec![
                displayed("vlan", "VNF-Tagged")
                    .with_attr("help", "L3 Mode With Sub-interfaces(Trunked)"),
                displayed("vpn", "Tunneled").with_attr(
                    "help",
                    "L3 Mode With IPSEC Termination From Consumer and Routed to Provider GW",
                ),
                displayed("routed", "Hypervisor-Tagged")
                    .with_attr("help", "L3 Mode In Access Mode (Non-Trunked)"),
            ],
        ));
    }
    if config.vnf_type.as_deref() == Some("FIREWALL") {
        specials.push(special_property(
            "firewallMode",
            "Firewall Mode",
            "transparent",
            vec![displayed("transparent", "Transparent"), displayed("routed", "Routed")],
        ));
    }
    specials
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageEntry;
    use crate::error::ErrorKind;
    use serde_json::{json, Map};

    fn config(ha: bool) -> PackageConfig {
        let mut config = PackageConfig {
            vnf_name: Some("asav".into()),
            vnf_type: Some("FIREWALL".into()),
            vnf_version: Some("9.8".into()),
            app_vendor: Some("Cisco".into()),
            package_filename: Some("asav-9.8".into()),
            ha_package: ha,
            ..Default::default()
        };
        config.image_properties.monitored = Some(true);
        config.image_list.push(ImageEntry {
            image_name: "asav.qcow2".into(),
            path: PathBuf::from("/images"),
            disk: Some("root".into()),
        });
        config
    }

    fn disks() -> Vec<PathBuf> {
        vec![PathBuf::from("/images/asav.qcow2"), PathBuf::from("/images/data.vmdk")]
    }

    #[test]
    fn test_template_defaults() {
        let tree = template_tree();
        let names: Vec<&str> = tree.body().fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names[0], "vnf_type");
        assert_eq!(tree.body().text("monitoring_methods"), Some("ICMPPing"));
        assert_eq!(tree.body().text("vnf_type"), Some(""));
    }

    #[test]
    fn test_image_format() {
        assert_eq!(image_format(Path::new("a.qcow2")).unwrap(), "qcow2");
        assert_eq!(image_format(Path::new("a.iso")).unwrap(), "iso");
        let err = image_format(Path::new("a.vdi")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.field().as_deref(), Some("image_name"));
    }

    #[test]
    fn test_identity_and_disks() {
        let tree = build_image_properties(&config(true), &disks(), &BootstrapAssembly::default()).unwrap();
        let body = tree.body();
        assert_eq!(body.text("name"), Some("asav"));
        assert_eq!(body.text("version"), Some("9.8"));
        assert_eq!(body.text("applicationVendor"), Some("Cisco"));
        assert_eq!(body.text("root_image_disk_format"), Some("qcow2"));
        assert_eq!(body.text("disk_1_file_disk_bus"), Some("virtio"));
        assert_eq!(body.text("disk_1_image_format"), Some("vmdk"));
        assert!(!body.contains("privileged_vm"));
        assert_eq!(body.text("disable_spoof_check"), Some("false"));
    }

    #[test]
    fn test_unmonitored_bootup_time() {
        let mut config = config(true);
        config.image_properties.monitored = Some(false);
        config.image_properties.bootup_time = Some(900);
        let tree = build_image_properties(&config, &disks(), &BootstrapAssembly::default()).unwrap();
        assert_eq!(tree.body().text("bootup_time"), Some("-1"));
        assert_eq!(tree.body().text("monitoring_supported"), Some("false"));
    }

    #[test]
    fn test_ha_custom_and_specials() {
        let mut config = config(true);
        config.multi_use = true;
        config.resource_properties.ha_capable = Some(true);
        config.custom.push(vec!["key:mode".into(), "val1:fast".into()]);

        let tree = build_image_properties(&config, &disks(), &BootstrapAssembly::default()).unwrap();
        let body = tree.body();
        let custom = body.get("custom_property").unwrap().items();
        // mode, ha, terminationMode, firewallMode
        assert_eq!(custom.len(), 4);
        let Node::Record(ha) = custom[1] else {
            panic!("special property should be a record");
        };
        assert_eq!(ha.attr("special"), Some("true"));
        assert_eq!(ha.text("default"), Some("true"));
        assert_eq!(body.get("default_property").unwrap().items().len(), 2);
        assert_eq!(body.text("ha_capable"), Some("true"));
    }

    #[test]
    fn test_legacy_custom_and_profiles() {
        let mut config = config(false);
        config.custom.push(vec!["key:mode".into(), "val1:fast".into(), "val2:slow".into()]);
        config.profiles.push(ProfileConfig {
            name: "small".into(),
            description: None,
            vcpus: 1,
            memory_mb: 1024,
            root_disk_mb: 2048,
        });
        config.default_profile = Some("small".into());

        let tree = build_image_properties(&config, &disks(), &BootstrapAssembly::default()).unwrap();
        let body = tree.body();
        let Some(Node::Record(custom)) = body.get("custom_property") else {
            panic!("legacy custom property should be a record");
        };
        assert_eq!(custom.get("mode").unwrap().items().len(), 2);
        let Some(Node::Record(profiles)) = body.get("profiles") else {
            panic!("profiles should be a record");
        };
        let Some(Node::Record(profile)) = profiles.get("profile") else {
            panic!("single profile should be a record");
        };
        assert_eq!(profile.text("description"), Some("small"));
        assert_eq!(body.text("default_profile"), Some("small"));
        assert!(!body.contains("default_property"));
    }

    #[test]
    fn test_volumes_and_drivers() {
        let mut config = config(true);
        let mut volume = Map::new();
        volume.insert("size".into(), json!(10));
        volume.insert("deviceType".into(), json!("disk"));
        volume.insert("storageLocation".into(), json!("local"));
        config.volumes.push(volume);
        config.image_properties.sriov_driver_list = Some(vec!["igb".into(), "ixgbe".into()]);
        config.image_properties.vnic_names = Some(vec!["mgmt".into()]);

        let tree = build_image_properties(&config, &disks(), &BootstrapAssembly::default()).unwrap();
        let xml = tree.to_xml().unwrap();
        assert!(xml.contains("<device_type>disk</device_type>"));
        assert!(xml.contains("<storage_location>local</storage_location>"));
        assert!(xml.contains("<size>10</size>"));
        assert_eq!(tree.body().text("sriov_supported"), Some("true"));
        assert_eq!(tree.body().get("sriov_driver_list").unwrap().items().len(), 2);
        assert_eq!(tree.body().text("vnic_names"), Some("vnics:mgmt"));
    }
}
