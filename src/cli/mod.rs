// src/cli/mod.rs
//! CLI definitions for vnfpack
//!
//! Argument parsing only; the command implementations live in the
//! `commands` module.
//!
//! - `build` - Build a package from a JSON configuration record
//! - `convert` - Convert a legacy package to the target property dialect
//! - `repackage` - Replace the disk images of an existing package
//! - `pack` - Package an existing directory of property/bootstrap files
//! - `verify` - Check a package's files against its manifest

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vnfpack")]
#[command(author = "vnfpack Contributors")]
#[command(version)]
#[command(about = "Build, convert and repackage VM artifact packages", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the log to a file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a package from a JSON configuration record
    Build {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Write a plain tar archive instead of .tar.gz
        #[arg(long)]
        no_compress: bool,

        /// Delete the bootstrap source files after a successful build
        #[arg(long)]
        cleanup: bool,
    },

    /// Convert a legacy package to the target property dialect
    Convert {
        /// Package to convert
        package: PathBuf,

        /// Output directory (default: the package's directory)
        #[arg(long)]
        dest_dir: Option<PathBuf>,

        /// Parent directory for the scratch area (default: system temp dir)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Replace the disk images of an existing package
    Repackage {
        /// Package to repackage
        package: PathBuf,

        /// Disk images, root image first (comma-separated or repeated)
        #[arg(long, value_delimiter = ',', required = true)]
        image: Vec<PathBuf>,

        /// Output directory (default: the package's directory)
        #[arg(long)]
        dest_dir: Option<PathBuf>,

        /// Parent directory for the scratch area (default: system temp dir)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Package a directory holding image_properties.xml
    Pack {
        /// Directory to package
        dir: PathBuf,

        /// Disk images, root image first (comma-separated or repeated)
        #[arg(long, value_delimiter = ',', required = true)]
        image: Vec<PathBuf>,

        /// Output package name or path
        #[arg(short, long)]
        output: PathBuf,

        /// Write a plain tar archive instead of .tar.gz
        #[arg(long)]
        no_compress: bool,
    },

    /// Verify a package's files against its manifest
    Verify {
        /// Package to verify
        package: PathBuf,

        /// Parent directory for the scratch area (default: system temp dir)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },
}
