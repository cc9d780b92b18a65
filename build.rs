// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: output directory for migrations
fn dest_dir_arg() -> Arg {
    Arg::new("dest_dir")
        .long("dest-dir")
        .value_name("DIR")
        .help("Output directory (default: the package's directory)")
}

/// Common argument: parent directory of the scratch area
fn scratch_dir_arg() -> Arg {
    Arg::new("scratch_dir")
        .long("scratch-dir")
        .value_name("DIR")
        .help("Parent directory for the scratch area (default: system temp dir)")
}

/// Common argument: disk image list
fn image_arg() -> Arg {
    Arg::new("image")
        .long("image")
        .value_name("IMG[,IMG...]")
        .value_delimiter(',')
        .required(true)
        .help("Disk images, root image first")
}

fn no_compress_arg() -> Arg {
    Arg::new("no_compress")
        .long("no-compress")
        .action(ArgAction::SetTrue)
        .help("Write a plain tar archive instead of .tar.gz")
}

fn build_cli() -> Command {
    Command::new("vnfpack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("vnfpack Contributors")
        .about("Build, convert and repackage VM artifact packages")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("log_file")
                .long("log-file")
                .value_name("PATH")
                .global(true)
                .help("Write the log to a file instead of stderr"),
        )
        .subcommand(
            Command::new("build")
                .about("Build a package from a JSON configuration record")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .required(true)
                        .help("Path to the configuration file"),
                )
                .arg(no_compress_arg())
                .arg(
                    Arg::new("cleanup")
                        .long("cleanup")
                        .action(ArgAction::SetTrue)
                        .help("Delete the bootstrap source files after a successful build"),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert a legacy package to the target property dialect")
                .arg(Arg::new("package").required(true).help("Package to convert"))
                .arg(dest_dir_arg())
                .arg(scratch_dir_arg()),
        )
        .subcommand(
            Command::new("repackage")
                .about("Replace the disk images of an existing package")
                .arg(Arg::new("package").required(true).help("Package to repackage"))
                .arg(image_arg())
                .arg(dest_dir_arg())
                .arg(scratch_dir_arg()),
        )
        .subcommand(
            Command::new("pack")
                .about("Package a directory holding image_properties.xml")
                .arg(Arg::new("dir").required(true).help("Directory to package"))
                .arg(image_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .help("Output package name or path"),
                )
                .arg(no_compress_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify a package's files against its manifest")
                .arg(Arg::new("package").required(true).help("Package to verify"))
                .arg(scratch_dir_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("vnfpack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
