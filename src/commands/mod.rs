// src/commands/mod.rs
//! Command handlers for the vnfpack CLI

mod build;
mod modify;
mod pack;
mod verify;

pub use build::cmd_build;
pub use modify::{cmd_convert, cmd_repackage};
pub use pack::cmd_pack;
pub use verify::cmd_verify;
