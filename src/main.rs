//! docsign: place and sign a visible signature field in a PDF document

use anyhow::Result;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    docsign::cli::run()
}
