use crate::domain::config::{DEFAULT_OUTPUT, DEFAULT_WHERE};

/// Help text printed for `--help`.
pub fn usage() -> String {
    format!(
        "\
USAGE:
  docsign [-v|-q] <options...>

OPTIONS:
If an option is marked as \"optional\" or has a default value,
it may be omitted.

  --config <file>  The JSON config file. Further options
                   override settings in this file
  --input <file>   The input PDF file
  --output <file>  The output file
                   (default: '{DEFAULT_OUTPUT}')
  --cert <file>    The PKCS#12 certificate file
  --pass <pass>    The password to unlock the certificate
  --where <pos>    The signature position: page,x1,y1,x2,y2
                   (default: '{DEFAULT_WHERE}')
  --img <file>     The signature image, JPEG (optional)
  --help           Show this help

  -v, --verbose    Debug logging
  -q, --quiet      Only log warnings and errors
  -V, --version    Print version
The logging flags must come before the options above."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_lists_every_option_with_defaults() {
        let text = usage();
        for option in ["--config", "--input", "--output", "--cert", "--pass", "--where", "--img", "--help"] {
            assert!(text.contains(option), "missing {option}");
        }
        assert!(text.contains("(default: 'output.pdf')"));
        assert!(text.contains("(default: '0,0,0,100,200')"));
        assert!(text.contains("must come before"));
    }
}
