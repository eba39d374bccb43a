//! Output formatting for CLI.

mod json;
mod text;

pub use json::{JsonFormatter, provider_info};
pub use text::TextFormatter;
