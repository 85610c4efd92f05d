//! Long option scanning over raw command-line tokens.
//!
//! Each lookup returns a one-key JSON layer (`{"input": "a.pdf"}`) ready to be
//! deep-merged over the configuration tree. When an option is repeated the
//! rightmost occurrence wins.

use serde_json::{Map, Value};

fn last_index_of(tokens: &[String], name: &str) -> Option<usize> {
    let needle = format!("--{name}");
    tokens.iter().rposition(|token| *token == needle)
}

fn layer(name: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    Value::Object(map)
}

/// `--name value`: the token after the last `--name`.
///
/// Returns `None` when the option is absent or its last occurrence is the
/// final token.
pub fn long_option(tokens: &[String], name: &str) -> Option<Value> {
    let index = last_index_of(tokens, name)?;
    let value = tokens.get(index + 1)?;
    Some(layer(name, Value::String(value.clone())))
}

/// `--name` without a value: `{name: true}` when present.
pub fn long_flag(tokens: &[String], name: &str) -> Option<Value> {
    last_index_of(tokens, name).map(|_| layer(name, Value::Bool(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn option_takes_following_token() {
        let args = tokens(&["--input", "in.pdf", "--output", "out.pdf"]);
        assert_eq!(long_option(&args, "input"), Some(json!({"input": "in.pdf"})));
        assert_eq!(long_option(&args, "output"), Some(json!({"output": "out.pdf"})));
    }

    #[test]
    fn last_occurrence_wins() {
        let args = tokens(&["--where", "1,0,0,1,1", "--where", "2,0,0,2,2"]);
        assert_eq!(long_option(&args, "where"), Some(json!({"where": "2,0,0,2,2"})));
    }

    #[test]
    fn absent_option_is_none() {
        let args = tokens(&["--input", "in.pdf"]);
        assert_eq!(long_option(&args, "cert"), None);
        assert_eq!(long_flag(&args, "help"), None);
    }

    #[test]
    fn trailing_option_without_value_is_none() {
        let args = tokens(&["--cert", "a.p12", "--cert"]);
        assert_eq!(long_option(&args, "cert"), None);
    }

    #[test]
    fn option_value_may_look_like_a_flag() {
        let args = tokens(&["--pass", "--help"]);
        assert_eq!(long_option(&args, "pass"), Some(json!({"pass": "--help"})));
    }

    #[test]
    fn flag_needs_no_value() {
        let args = tokens(&["--input", "in.pdf", "--help"]);
        assert_eq!(long_flag(&args, "help"), Some(json!({"help": true})));
    }

    #[test]
    fn names_must_match_exactly() {
        let args = tokens(&["--inputs", "x", "-input", "y", "input", "z"]);
        assert_eq!(long_option(&args, "input"), None);
    }
}
