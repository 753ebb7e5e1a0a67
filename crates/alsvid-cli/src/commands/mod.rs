//! CLI command implementations.

pub mod collect;
pub mod common;
pub mod process;
pub mod run;
pub mod status;
pub mod submit;
pub mod verify;
