// src/exec/mod.rs

//! Process execution for command-based components.

pub mod process;

pub use process::{ProcessOutput, run_shell_command};
