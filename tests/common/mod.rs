// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vnfpack::archive::{ArchiveCodec, ArchiveMember, TarCodec};
use vnfpack::config::{BootstrapFileConfig, ImageEntry, PackageConfig, SysGenVar, UserInputVar};
use vnfpack::manifest::{Manifest, MANIFEST_FILE};
use vnfpack::{Error, Result};

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Directory layout for a package build.
///
/// Keep the TempDir alive to prevent cleanup.
pub struct Workspace {
    pub temp_dir: TempDir,
    pub images: PathBuf,
    pub configs: PathBuf,
    pub output: PathBuf,
    pub scratch: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let images = temp_dir.path().join("images");
        let configs = temp_dir.path().join("configs");
        let output = temp_dir.path().join("output");
        let scratch = temp_dir.path().join("scratch");
        for dir in [&images, &configs, &output, &scratch] {
            fs::create_dir_all(dir).unwrap();
        }
        Self {
            temp_dir,
            images,
            configs,
            output,
            scratch,
        }
    }

    /// Number of entries left in the scratch root
    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(&self.scratch).unwrap().count()
    }
}

/// HA configuration for a FIREWALL package with one root image and a
/// primary/secondary pair of bootstrap files
pub fn ha_config(ws: &Workspace) -> PackageConfig {
    write_file(&ws.images, "asav.qcow2", b"root disk contents");
    write_file(&ws.configs, "day0.txt", b"hostname ${HOSTNAME}\n");
    write_file(&ws.configs, "day0-secondary.txt", b"hostname ${HOSTNAME}-b\n");

    let mut config = PackageConfig {
        vnf_name: Some("asav".into()),
        vnf_type: Some("FIREWALL".into()),
        vnf_version: Some("9.8".into()),
        app_vendor: Some("Cisco".into()),
        package_filename: Some("asav-9.8".into()),
        package_output_dir: Some(ws.output.clone()),
        ha_package: true,
        ..Default::default()
    };
    config.image_properties.monitored = Some(true);
    config.resource_properties.ha_capable = Some(true);
    config.image_list.push(ImageEntry {
        image_name: "asav.qcow2".into(),
        path: ws.images.clone(),
        disk: Some("root".into()),
    });

    let hostname = UserInputVar {
        name: "HOSTNAME".into(),
        display_str: Some("Host Name".into()),
        kind: Some("string".into()),
        mandatory: Some(serde_json::json!(true)),
        value: None,
        attributes: Vec::new(),
    };
    let bootstrap = |name: &str, mode: &str| BootstrapFileConfig {
        name: Some(name.into()),
        path: ws.configs.clone(),
        mnt_point: Some("/".into()),
        parse: Some(true),
        ha_mode: Some(mode.into()),
        user_input: vec![hostname.clone()],
        sys_gen: vec![SysGenVar {
            name: "INSIDE_VLAN_1".into(),
            kind: None,
        }],
    };
    config.bootstrap.file_list = Some(vec![
        bootstrap("day0.txt", "primary"),
        bootstrap("day0-secondary.txt", "secondary"),
    ]);
    config
        .custom
        .push(vec!["key:mode".into(), "keyattr_display:Mode".into(), "val1:fast".into()]);
    config
}

/// Extract a package and load its manifest.
///
/// Returns (TempDir, manifest) - the TempDir holds the extracted files.
pub fn extract(package: &Path) -> (TempDir, Manifest) {
    let dir = tempfile::tempdir().unwrap();
    TarCodec::new().extract(package, dir.path()).unwrap();
    let manifest = Manifest::load(&dir.path().join(MANIFEST_FILE)).unwrap();
    (dir, manifest)
}

/// Write a legacy package: SHA-1 digests, no packaging version and a
/// legacy-dialect property document
pub fn legacy_package(ws: &Workspace) -> PathBuf {
    let staging = ws.temp_dir.path().join("legacy");
    fs::create_dir_all(&staging).unwrap();
    write_file(&staging, "old-root.qcow2", b"old root disk");
    write_file(&staging, "old-data.qcow2", b"old data disk");
    write_file(&staging, "day0.txt", b"hostname legacy\n");
    write_file(
        &staging,
        "image_properties.xml",
        br#"<?xml version="1.0" encoding="UTF-8"?>
<image_properties>
  <vnf_type>ROUTER</vnf_type>
  <name>csr</name>
  <version>16_9_1</version>
  <imageType>legacy</imageType>
  <custom_property>
    <UUID></UUID>
  </custom_property>
  <custom_property>
    <mode>fast</mode>
    <mode>slow</mode>
  </custom_property>
  <profiles>
    <profile><name>small</name></profile>
  </profiles>
  <default_profile>small</default_profile>
</image_properties>
"#,
    );

    let manifest = format!(
        "<!-- sha1sum - for calculating checksum -->\n\
<PackageContents>\n\
  <File_Info>\n    <name>old-root.qcow2</name>\n    <type>root_image</type>\n    <sha1_checksum>{}</sha1_checksum>\n  </File_Info>\n\
  <File_Info>\n    <name>old-data.qcow2</name>\n    <type>ephemeral_disk1_image</type>\n    <sha1_checksum>{}</sha1_checksum>\n  </File_Info>\n\
  <File_Info>\n    <name>day0.txt</name>\n    <type>bootstrap_file_1</type>\n    <sha1_checksum>{}</sha1_checksum>\n  </File_Info>\n\
  <File_Info>\n    <name>image_properties.xml</name>\n    <type>image_properties</type>\n    <sha1_checksum>{}</sha1_checksum>\n  </File_Info>\n\
</PackageContents>\n",
        sha1_hex(&staging.join("old-root.qcow2")),
        sha1_hex(&staging.join("old-data.qcow2")),
        sha1_hex(&staging.join("day0.txt")),
        sha1_hex(&staging.join("image_properties.xml")),
    );
    write_file(&staging, MANIFEST_FILE, manifest.as_bytes());

    let members: Vec<ArchiveMember> = [
        "old-root.qcow2",
        "old-data.qcow2",
        "day0.txt",
        "image_properties.xml",
        MANIFEST_FILE,
    ]
    .iter()
    .map(|name| ArchiveMember::new(&staging, *name))
    .collect();

    let package = ws.temp_dir.path().join("csr-16.9.tar.gz");
    TarCodec::new().create(&package, &members, true).unwrap();
    package
}

/// Write a package holding `files` and, when given, a raw `manifest`
///
/// The members are staged under a fresh directory inside the workspace.
pub fn custom_package(
    ws: &Workspace,
    file_name: &str,
    files: &[(&str, &[u8])],
    manifest: Option<&str>,
) -> PathBuf {
    let staging = tempfile::tempdir_in(ws.temp_dir.path()).unwrap();
    let mut names: Vec<&str> = Vec::new();
    for &(name, contents) in files {
        write_file(staging.path(), name, contents);
        names.push(name);
    }
    if let Some(manifest) = manifest {
        write_file(staging.path(), MANIFEST_FILE, manifest.as_bytes());
        names.push(MANIFEST_FILE);
    }

    let members: Vec<ArchiveMember> = names
        .iter()
        .map(|name| ArchiveMember::new(staging.path(), *name))
        .collect();
    let package = ws.temp_dir.path().join(file_name);
    TarCodec::new().create(&package, &members, true).unwrap();
    package
}

/// One SHA-1 `File_Info` entry of a legacy manifest
pub fn file_info(name: &str, role: &str, contents: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let digest: String = Sha1::digest(contents)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!(
        "  <File_Info>\n    <name>{}</name>\n    <type>{}</type>\n    \
         <sha1_checksum>{}</sha1_checksum>\n  </File_Info>\n",
        name, role, digest
    )
}

/// Wrap `File_Info` entries into a legacy manifest document
pub fn legacy_manifest(entries: &[String]) -> String {
    format!(
        "<!-- sha1sum - for calculating checksum -->\n<PackageContents>\n{}</PackageContents>\n",
        entries.concat()
    )
}

fn sha1_hex(path: &Path) -> String {
    vnfpack::hash::hash_file(path, vnfpack::HashAlgorithm::Sha1)
        .unwrap()
        .value
}

/// Codec that extracts normally but fails every archive creation
pub struct FailingCodec;

impl ArchiveCodec for FailingCodec {
    fn create(&self, output: &Path, _members: &[ArchiveMember], _compressed: bool) -> Result<()> {
        Err(Error::archive(
            "create",
            output,
            std::io::Error::other("simulated archiver failure"),
        ))
    }

    fn extract(&self, input: &Path, dest: &Path) -> Result<()> {
        TarCodec::new().extract(input, dest)
    }
}
