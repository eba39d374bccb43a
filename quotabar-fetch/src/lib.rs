// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # QuotaBar Fetch
//!
//! The provider side of QuotaBar: the adapter contract and the registry the
//! refresh engine fetches through.
//!
//! - [`registry::ProviderFetcher`] - Trait every provider adapter implements
//! - [`registry::ProviderRegistry`] - Provider id to adapter map
//! - [`command::CommandFetcher`] - Adapter that runs a command printing JSON
//! - [`host::process`] - Subprocess execution with hard timeouts
//!
//! ## Example
//!
//! ```ignore
//! use quotabar_fetch::{CommandFetcher, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new().with(Arc::new(
//!     CommandFetcher::new(ProviderKind::Claude, "claude-usage-json"),
//! ));
//! let snapshot = registry.fetch_usage(ProviderKind::Claude).await?;
//! ```

pub mod command;
pub mod error;
pub mod host;
pub mod registry;

pub use command::{parse_snapshot, CommandFetcher, MAX_COMMAND_TIMEOUT};
pub use error::{FetchError, ProcessError};
pub use host::process::{ProcessOutput, ProcessRunner};
pub use registry::{ProviderFetcher, ProviderRegistry};
