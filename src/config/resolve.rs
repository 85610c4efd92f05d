//! Layered resolution: defaults, then the config file, then command-line options.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use super::loader::load_json;
use super::merge::{deep_merge, merged};
use crate::cli::scanner::{long_flag, long_option};
use crate::domain::config::{KNOWN_KEYS, KNOWN_SIGNATURE_KEYS};
use crate::domain::Configuration;
use crate::error::SignError;

/// Options read from the command line after the config file, in merge order.
pub const CLI_OPTIONS: &[&str] = &["input", "output", "cert", "pass", "where", "img"];

/// Build the configuration for one run from the raw option tokens.
///
/// Precedence, strongest first: command-line options, config file, defaults.
/// `--help` is looked at before anything else and stops resolution early.
/// An unreadable config file is logged and skipped.
pub fn resolve(tokens: &[String]) -> Result<Configuration, SignError> {
    let mut tree = default_tree()?;

    if let Some(help) = long_flag(tokens, "help") {
        deep_merge(&mut tree, &help);
        tracing::debug!("help requested; skipping config file and options");
        return into_configuration(tree);
    }

    if let Some(config_layer) = long_option(tokens, "config") {
        deep_merge(&mut tree, &config_layer);
        if let Some(path) = config_layer.get("config").and_then(Value::as_str) {
            apply_config_file(&mut tree, Path::new(path));
        }
    }

    for name in CLI_OPTIONS {
        if let Some(option) = long_option(tokens, name) {
            deep_merge(&mut tree, &option);
        }
    }

    warn_unknown_keys(&tree);
    into_configuration(tree)
}

fn default_tree() -> Result<Value, SignError> {
    serde_json::to_value(Configuration::default())
        .map_err(|e| SignError::InvalidConfiguration(e.to_string()))
}

fn apply_config_file(tree: &mut Value, path: &Path) {
    let payload = match load_json(path) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("{}", err);
            return;
        }
    };

    // Only keep the layer if the result still fits the schema.
    let candidate = merged(tree.clone(), &payload);
    match Configuration::deserialize(&candidate) {
        Ok(_) => {
            tracing::debug!("merged config file {}", path.display());
            *tree = candidate;
        }
        Err(e) => {
            tracing::warn!("Ignoring config file '{}': {}", path.display(), e);
        }
    }
}

fn warn_unknown_keys(tree: &Value) {
    let Some(map) = tree.as_object() else {
        return;
    };
    for key in map.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        tracing::warn!("Ignoring unknown configuration key '{}'", key);
    }
    if let Some(visual) = map.get("signatureConfig").and_then(Value::as_object) {
        for key in visual.keys().filter(|k| !KNOWN_SIGNATURE_KEYS.contains(&k.as_str())) {
            tracing::warn!("Ignoring unknown configuration key 'signatureConfig.{}'", key);
        }
    }
}

fn into_configuration(tree: Value) -> Result<Configuration, SignError> {
    serde_json::from_value(tree).map_err(|e| SignError::InvalidConfiguration(e.to_string()))
}
