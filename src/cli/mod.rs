//! Command-line interface for docsign
//!
//! clap handles the logging flags and `--version`. Every other token is kept
//! raw and handed to the configuration resolver, which owns option precedence.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::resolve::CLI_OPTIONS;
use crate::config::{resolve, validate};
use crate::engine::{Pkcs12Engine, PdfEngine};
use crate::error::SignError;
use crate::redact::describe;
use crate::sign::sign_document;

pub mod scanner;
mod usage;

pub use usage::usage;

/// Sign a PDF document with a PKCS#12 certificate
#[derive(Parser, Debug)]
#[command(name = "docsign")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Signing options: --config, --input, --output, --cert, --pass, --where, --img, --help
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "OPTIONS")]
    args: Vec<String>,
}

fn init_logging(cli: &Cli) {
    // RUST_LOG in the environment always takes precedence.
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

const LOGGING_FLAGS: &[&str] = &["-v", "--verbose", "-q", "--quiet"];

/// Logging flags found among the signing options, where clap no longer sees
/// them. A token right after a value option is that option's value.
fn stray_logging_flags(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .enumerate()
        .filter(|(i, token)| {
            let is_value = i.checked_sub(1).is_some_and(|prev| takes_value(&tokens[prev]));
            LOGGING_FLAGS.contains(&token.as_str()) && !is_value
        })
        .map(|(_, token)| token.as_str())
        .collect()
}

fn takes_value(token: &str) -> bool {
    token
        .strip_prefix("--")
        .is_some_and(|name| name == "config" || CLI_OPTIONS.contains(&name))
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    for flag in stray_logging_flags(&cli.args) {
        tracing::warn!("Ignoring '{}': logging flags must come before the signing options", flag);
    }

    match execute(&cli.args) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// One run over the raw option tokens: resolve, validate, sign.
pub fn execute(tokens: &[String]) -> Result<(), SignError> {
    let config = resolve(tokens)?;

    if config.help {
        println!("{}", usage());
        return Ok(());
    }

    tracing::info!("Params: {}", describe(&config));

    let documents = PdfEngine;
    validate(&config, &documents)?;
    sign_document(&config, &documents, &Pkcs12Engine)
}
