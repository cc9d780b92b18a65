// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", path.display(), e))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Single-line JSON description of a failure
fn error_descriptor(err: &anyhow::Error) -> String {
    let engine_error = err.chain().find_map(|e| e.downcast_ref::<vnfpack::Error>());
    let (error_type, key) = match engine_error {
        Some(e) => (e.kind().to_string(), e.field().unwrap_or_default()),
        None => ("InternalError".to_string(), String::new()),
    };
    serde_json::json!({
        "errorType": error_type,
        "key": key,
        "errorMessage": format!("{:#}", err),
    })
    .to_string()
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            config,
            no_compress,
            cleanup,
        } => commands::cmd_build(&config, no_compress, cleanup),
        Commands::Convert {
            package,
            dest_dir,
            scratch_dir,
        } => commands::cmd_convert(&package, dest_dir.as_deref(), scratch_dir.as_deref()),
        Commands::Repackage {
            package,
            image,
            dest_dir,
            scratch_dir,
        } => commands::cmd_repackage(
            &package,
            &image,
            dest_dir.as_deref(),
            scratch_dir.as_deref(),
        ),
        Commands::Pack {
            dir,
            image,
            output,
            no_compress,
        } => commands::cmd_pack(&dir, &image, &output, no_compress),
        Commands::Verify {
            package,
            scratch_dir,
        } => commands::cmd_verify(&package, scratch_dir.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{}", error_descriptor(&e));
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{}", error_descriptor(&e));
            ExitCode::FAILURE
        }
    }
}
