//! CLI command implementations.

pub mod config;
pub mod providers;
pub mod refresh;
pub mod watch;
