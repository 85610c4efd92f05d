//! The resolved configuration of a signing run.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SIGNATURE_NAME: &str = "signature";
pub const DEFAULT_WHERE: &str = "0,0,0,100,200";
pub const DEFAULT_OUTPUT: &str = "output.pdf";

/// Keys recognized at the top level of a configuration tree.
pub const KNOWN_KEYS: &[&str] = &[
    "signatureName",
    "where",
    "output",
    "help",
    "config",
    "input",
    "cert",
    "pass",
    "img",
    "reason",
    "location",
    "signatureConfig",
];

/// Keys recognized inside `signatureConfig`.
pub const KNOWN_SIGNATURE_KEYS: &[&str] =
    &["showLabels", "showDN", "showTextName", "showDate", "showGraphicName", "showLogo"];

/// Final configuration for one invocation.
///
/// Field names on the wire follow the JSON config file (`signatureName`,
/// `signatureConfig`, ...). Optional paths stay `None` until validation
/// decides whether their absence is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    pub signature_name: String,
    /// Position spec `page,x1,y1,x2,y2`.
    #[serde(rename = "where")]
    pub where_: String,
    pub output: String,
    pub help: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    /// Certificate password. Never logged in plaintext.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    pub reason: String,
    pub location: String,
    pub signature_config: SignatureConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            signature_name: DEFAULT_SIGNATURE_NAME.to_string(),
            where_: DEFAULT_WHERE.to_string(),
            output: DEFAULT_OUTPUT.to_string(),
            help: false,
            config: None,
            input: None,
            cert: None,
            pass: None,
            img: None,
            reason: String::new(),
            location: String::new(),
            signature_config: SignatureConfig::default(),
        }
    }
}

/// Visual presentation of the signature widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignatureConfig {
    /// Label each value on the right hand side ("Date: ...").
    pub show_labels: bool,
    /// Distinguished name of the signer on the right hand side.
    #[serde(rename = "showDN")]
    pub show_dn: bool,
    /// Signer name on the right hand side.
    pub show_text_name: bool,
    pub show_date: bool,
    /// Signer name drawn large on the left hand side.
    pub show_graphic_name: bool,
    pub show_logo: bool,
}
