//! Loggable rendering of a configuration with secrets masked

use serde::Serialize;
use serde_json::Value;

use crate::domain::Configuration;

/// Replacement for secret values.
pub const REDACTION_MARKER: &str = "***";

/// Keys whose values are never printed.
const SECRET_KEYS: &[&str] = &["pass"];

/// Pretty JSON for `config`, with the password masked.
///
/// Keys are sorted, so the same configuration always renders the same way.
pub fn describe(config: &Configuration) -> String {
    describe_value(config)
}

/// [`describe`] for any serializable value.
pub fn describe_value<T: Serialize>(value: &T) -> String {
    let mut tree = match serde_json::to_value(value) {
        Ok(tree) => tree,
        Err(e) => return format!("<unprintable configuration: {e}>"),
    };
    redact_value(&mut tree);
    serde_json::to_string_pretty(&tree)
        .unwrap_or_else(|e| format!("<unprintable configuration: {e}>"))
}

/// Mask every secret key in `tree`, at any depth.
pub fn redact_value(tree: &mut Value) {
    match tree {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) {
                    *value = Value::String(REDACTION_MARKER.to_string());
                } else {
                    redact_value(value);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_is_masked() {
        let config = Configuration {
            pass: Some("hunter2-secret".to_string()),
            input: Some("in.pdf".to_string()),
            ..Configuration::default()
        };

        let text = describe(&config);
        assert!(!text.contains("hunter2-secret"));
        assert!(text.contains(r#""pass": "***""#));
        assert!(text.contains(r#""input": "in.pdf""#));
    }

    #[test]
    fn other_fields_pass_through() {
        let text = describe(&Configuration::default());
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed, serde_json::to_value(Configuration::default()).expect("value"));
        assert!(parsed.get("pass").is_none(), "unset password is not invented");
    }

    #[test]
    fn output_is_stable() {
        let config = Configuration { pass: Some("x".into()), ..Configuration::default() };
        assert_eq!(describe(&config), describe(&config.clone()));
    }

    #[test]
    fn nested_secrets_are_masked() {
        let mut tree = json!({"outer": {"pass": "deep"}, "list": [{"pass": "inner"}], "keep": "me"});
        redact_value(&mut tree);
        assert_eq!(
            tree,
            json!({"outer": {"pass": "***"}, "list": [{"pass": "***"}], "keep": "me"})
        );
    }

    #[test]
    fn two_space_indentation() {
        let text = describe(&Configuration::default());
        assert!(text.starts_with("{\n  \""));
    }
}
