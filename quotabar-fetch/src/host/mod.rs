//! Host APIs used by provider adapters.
//!
//! - [`process`] - Subprocess execution for command-backed providers

pub mod process;

pub use process::{ProcessOutput, ProcessRunner};
