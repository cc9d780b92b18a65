// src/properties/bootstrap.rs
//! Bootstrap file assembly
//!
//! Turns the bootstrap section of a packaging configuration into property
//! nodes. HA packages describe every file with a `bootstrap_file` node
//! carrying mount point, parse flag and VM index attributes; other
//! packages use numbered `bootstrap_file_<N>` fields holding the mount
//! destination. HA files may also declare operator-supplied (`userInput`)
//! and platform-generated (`sysGen`) variables.

use super::dedup_nodes;
use crate::config::{BootstrapFileConfig, HaMode, SysGenVar, UserInputVar, value_text};
use crate::error::{Error, Result};
use crate::markup::{AttributedText, Node, Record};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

static INSIDE_VLAN: LazyLock<Regex> = LazyLock::new(|| Regex::new("INSIDE_VLAN").unwrap());
static OUTSIDE_VLAN: LazyLock<Regex> = LazyLock::new(|| Regex::new("OUTSIDE_VLAN").unwrap());

/// Everything the bootstrap section contributes to a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapAssembly {
    /// Property fields, in declaration order
    pub fields: Vec<(String, Node)>,
    /// Source files to include in the package
    pub sources: Vec<PathBuf>,
    /// Custom properties from `userInput` variables, deduplicated
    pub custom: Vec<Node>,
    /// System properties from `sysGen` variables, deduplicated
    pub system: Vec<Node>,
    pub input_vlans: Option<usize>,
    pub output_vlans: Option<usize>,
}

impl BootstrapAssembly {
    /// Assemble the bootstrap section for an HA or a numbered package
    pub fn assemble(files: &[BootstrapFileConfig], ha: bool) -> Result<Self> {
        if ha {
            Self::assemble_ha(files)
        } else {
            Self::assemble_numbered(files)
        }
    }

    fn assemble_ha(files: &[BootstrapFileConfig]) -> Result<Self> {
        let mut assembly = Self::default();
        let mut custom = Vec::new();
        let mut system = Vec::new();

        for file in files {
            let name = file
                .name
                .as_deref()
                .ok_or_else(|| Error::validation("name", "bootstrap file name is missing"))?;
            let mnt_point = file.mnt_point.as_deref().ok_or_else(|| {
                Error::validation("mnt_point", format!("mount point is missing for {}", name))
            })?;
            let parse = file.parse.ok_or_else(|| {
                Error::validation("parse", format!("parse flag is missing for {}", name))
            })?;
            let ha_mode: HaMode = file
                .ha_mode
                .as_deref()
                .ok_or_else(|| {
                    Error::validation("ha_mode", format!("HA mode is missing for {}", name))
                })?
                .parse()
                .map_err(|_| Error::validation("ha_mode", format!("invalid HA mode for {}", name)))?;

            let source = source_path(file, name)?;
            debug!("Bootstrap file {} ({})", source.display(), ha_mode);
            // Primary and secondary variants may share one source file
            if !assembly.sources.contains(&source) {
                assembly.sources.push(source);
            }

            let mnt_pnt = if mnt_point == "/" {
                format!("/{}", name)
            } else {
                mnt_point.to_string()
            };
            let node = AttributedText::new(name)
                .with_attr("mnt_pnt", mnt_pnt)
                .with_attr("parse", parse.to_string())
                .with_attr("vm", ha_mode.vm_index());
            assembly
                .fields
                .push(("bootstrap_file".to_string(), Node::Text(node)));

            custom.extend(file.user_input.iter().map(user_input_node));

            if !file.sys_gen.is_empty() {
                system.extend(file.sys_gen.iter().map(system_node));
                let inside = count_matching(&file.sys_gen, &INSIDE_VLAN);
                let outside = count_matching(&file.sys_gen, &OUTSIDE_VLAN);
                if inside > 0 {
                    assembly.input_vlans = Some(inside);
                }
                if outside > 0 {
                    assembly.output_vlans = Some(outside);
                }
            }
        }

        assembly.custom = dedup_nodes(custom);
        assembly.system = dedup_nodes(system);
        Ok(assembly)
    }

    fn assemble_numbered(files: &[BootstrapFileConfig]) -> Result<Self> {
        let mut assembly = Self::default();

        for (index, file) in files.iter().enumerate() {
            let name = file
                .name
                .as_deref()
                .ok_or_else(|| Error::validation("name", "bootstrap file name is missing"))?;
            let source = source_path(file, name)?;
            assembly.sources.push(source);

            let destination = match file.mnt_point.as_deref() {
                None | Some("") | Some("/") => format!("/{}", name),
                Some(mount) => mount.to_string(),
            };
            assembly
                .fields
                .push((format!("bootstrap_file_{}", index + 1), Node::scalar(destination)));
        }
        Ok(assembly)
    }

    /// Write the bootstrap fields and VLAN counts into a property body
    pub fn apply(&self, body: &mut Record) {
        for (name, node) in &self.fields {
            body.append(name, node.clone());
        }
        if let Some(count) = self.input_vlans {
            body.set_text("number_input_vlans", count.to_string());
        }
        if let Some(count) = self.output_vlans {
            body.set_text("number_output_vlans", count.to_string());
        }
    }
}

fn source_path(file: &BootstrapFileConfig, name: &str) -> Result<PathBuf> {
    let path = file.path.join(name);
    if !path.is_file() {
        return Err(Error::MissingSourceFile(path));
    }
    Ok(path)
}

fn count_matching(vars: &[SysGenVar], pattern: &Regex) -> usize {
    vars.iter().filter(|var| pattern.is_match(&var.name)).count()
}

/// Custom property node for an operator-supplied variable
fn user_input_node(var: &UserInputVar) -> Node {
    let mut record = Record::new();
    if let Some(mandatory) = &var.mandatory {
        record.set_attr("mandatory", value_text(mandatory));
    }
    for attribute in &var.attributes {
        record.set_attr(&attribute.kind, value_text(&attribute.value));
    }

    let name = match &var.display_str {
        Some(display) => AttributedText::new(var.name.as_str())
            .with_attr("display", display.as_str())
            .into_node(),
        None => Node::scalar(var.name.as_str()),
    };
    record.set("name", name);
    if let Some(kind) = &var.kind {
        record.set_text("type", kind.as_str());
    }
    record.set_text("val", var.value.as_ref().map(value_text).unwrap_or_default());
    Node::Record(record)
}

/// System property node for a platform-generated variable
fn system_node(var: &SysGenVar) -> Node {
    let mut record = Record::new().with("name", Node::scalar(var.name.as_str()));
    if let Some(kind) = &var.kind {
        record.set_text("type", kind.as_str());
    }
    record.set_text("val", "");
    Node::Record(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VarAttribute;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn file(dir: &TempDir, name: &str, mnt: &str, mode: &str) -> BootstrapFileConfig {
        fs::write(dir.path().join(name), "config").unwrap();
        BootstrapFileConfig {
            name: Some(name.to_string()),
            path: dir.path().to_path_buf(),
            mnt_point: Some(mnt.to_string()),
            parse: Some(true),
            ha_mode: Some(mode.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ha_nodes() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            file(&dir, "day0.txt", "/", "primary"),
            file(&dir, "day0-b.txt", "/config/day0", "Secondary"),
        ];
        let assembly = BootstrapAssembly::assemble(&files, true).unwrap();

        assert_eq!(assembly.sources.len(), 2);
        let Node::Text(first) = &assembly.fields[0].1 else {
            panic!("HA bootstrap nodes carry attributes");
        };
        assert_eq!(assembly.fields[0].0, "bootstrap_file");
        assert_eq!(first.attr("mnt_pnt"), Some("/day0.txt"));
        assert_eq!(first.attr("parse"), Some("true"));
        assert_eq!(first.attr("vm"), Some("1"));
        assert_eq!(first.text.as_deref(), Some("day0.txt"));

        let Node::Text(second) = &assembly.fields[1].1 else {
            panic!("HA bootstrap nodes carry attributes");
        };
        assert_eq!(second.attr("mnt_pnt"), Some("/config/day0"));
        assert_eq!(second.attr("vm"), Some("2"));
    }

    #[test]
    fn test_numbered_fields() {
        let dir = TempDir::new().unwrap();
        let mut files = vec![
            file(&dir, "a.cfg", "/", "standalone"),
            file(&dir, "b.cfg", "/opt/b.cfg", "standalone"),
        ];
        files[0].mnt_point = None;
        let assembly = BootstrapAssembly::assemble(&files, false).unwrap();

        let mut body = Record::new();
        assembly.apply(&mut body);
        assert_eq!(body.text("bootstrap_file_1"), Some("/a.cfg"));
        assert_eq!(body.text("bootstrap_file_2"), Some("/opt/b.cfg"));
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let mut files = vec![file(&dir, "day0.txt", "/", "primary")];
        files[0].name = Some("absent.txt".into());
        let err = BootstrapAssembly::assemble(&files, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionError);
    }

    #[test]
    fn test_missing_ha_mode() {
        let dir = TempDir::new().unwrap();
        let mut files = vec![file(&dir, "day0.txt", "/", "primary")];
        files[0].ha_mode = None;
        let err = BootstrapAssembly::assemble(&files, true).unwrap_err();
        assert_eq!(err.field().as_deref(), Some("ha_mode"));
    }

    #[test]
    fn test_variables_deduplicated() {
        let dir = TempDir::new().unwrap();
        let hostname = UserInputVar {
            name: "HOSTNAME".into(),
            display_str: Some("Host Name".into()),
            kind: Some("string".into()),
            mandatory: Some(json!(true)),
            value: None,
            attributes: vec![VarAttribute {
                kind: "common".into(),
                value: json!("true"),
            }],
        };
        let vlans = vec![
            SysGenVar { name: "INSIDE_VLAN_1".into(), kind: None },
            SysGenVar { name: "INSIDE_VLAN_2".into(), kind: None },
            SysGenVar { name: "OUTSIDE_VLAN_1".into(), kind: None },
        ];

        let mut primary = file(&dir, "day0.txt", "/", "primary");
        primary.user_input = vec![hostname.clone()];
        primary.sys_gen = vlans.clone();
        let mut secondary = file(&dir, "day0.txt", "/", "secondary");
        secondary.user_input = vec![hostname];
        secondary.sys_gen = vlans;

        let assembly = BootstrapAssembly::assemble(&[primary, secondary], true).unwrap();
        assert_eq!(assembly.fields.len(), 2);
        assert_eq!(assembly.sources.len(), 1);
        assert_eq!(assembly.custom.len(), 1);
        assert_eq!(assembly.system.len(), 3);
        assert_eq!(assembly.input_vlans, Some(2));
        assert_eq!(assembly.output_vlans, Some(1));

        let Node::Record(custom) = &assembly.custom[0] else {
            panic!("custom property should be a record");
        };
        assert_eq!(custom.attr("mandatory"), Some("true"));
        assert_eq!(custom.attr("common"), Some("true"));
        let fields: Vec<&str> = custom.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(fields, vec!["name", "type", "val"]);
        assert_eq!(custom.text("val"), Some(""));
    }
}
