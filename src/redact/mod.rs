//! Secret redaction for log output

pub mod reporter;

pub use reporter::{describe, redact_value, REDACTION_MARKER};
