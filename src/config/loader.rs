//! Config file loading

use crate::error::SignError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read `path` and decode it as a JSON object.
///
/// Read and decode failures come back as [`SignError::ConfigFileUnreadable`];
/// the caller decides that they are not fatal.
pub fn load_json(path: &Path) -> Result<Value, SignError> {
    let unreadable = |reason: String| SignError::ConfigFileUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

    if !value.is_object() {
        return Err(unreadable("expected a JSON object at the top level".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_json_object() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("sign.json");
        fs::write(&path, r#"{"output": "signed.pdf", "signatureConfig": {"showDate": true}}"#)
            .expect("write");

        let value = load_json(&path).expect("config");
        assert_eq!(value["output"], json!("signed.pdf"));
        assert_eq!(value["signatureConfig"]["showDate"], json!(true));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("absent.json");

        let err = load_json(&path).expect_err("missing file");
        assert!(matches!(err, SignError::ConfigFileUnreadable { .. }));
        assert!(err.to_string().starts_with("Could not parse '"));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn invalid_json_is_unreadable() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{ output: signed.pdf").expect("write");

        let err = load_json(&path).expect_err("invalid json");
        assert!(matches!(err, SignError::ConfigFileUnreadable { .. }));
    }

    #[test]
    fn non_object_json_is_unreadable() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("list.json");
        fs::write(&path, "[1, 2, 3]").expect("write");

        let err = load_json(&path).expect_err("array payload");
        assert!(err.to_string().contains("expected a JSON object"));
    }
}
