//! Configuration loading, merging and validation
//!
//! Resolves the run configuration from defaults, an optional JSON config file
//! and command-line options, with precedence CLI > File > Defaults.

pub mod loader;
pub mod merge;
pub mod resolve;
pub mod validate;

pub use loader::load_json;
pub use merge::{deep_merge, merged};
pub use resolve::resolve;
pub use validate::validate;
