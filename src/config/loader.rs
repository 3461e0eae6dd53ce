//! Options loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerOptions;
use crate::config::validation::{validate_options, ValidationError};

/// Error type for options loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate options from TOML text.
pub fn parse_options(content: &str) -> Result<ServerOptions, ConfigError> {
    let options: ServerOptions = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_options(&options).map_err(ConfigError::Validation)?;
    Ok(options)
}

/// Load and validate options from a TOML file.
pub fn load_options(path: &Path) -> Result<ServerOptions, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let options = parse_options(&content)?;

    tracing::debug!(path = %path.display(), app_name = %options.app_name, "Options loaded");
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let options = parse_options("").unwrap();
        assert_eq!(options.app_name, "api-server");
        assert!(!options.body_parser.enabled);
        assert!(!options.swagger.enabled);
        assert_eq!(options.port, None);
    }

    #[test]
    fn test_nested_fields_default_individually() {
        let options = parse_options(
            r#"
            app_name = "catalog"
            acceptable = ["application/vnd.catalog+json"]

            [body_parser]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(options.app_name, "catalog");
        assert!(options.body_parser.enabled);
        assert_eq!(options.body_parser.max_bytes, 1024 * 1024);
        assert_eq!(options.acceptable, vec!["application/vnd.catalog+json"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = parse_options("app_nme = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = parse_options("[swagger]\nenable = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_options("acceptable = [\"json\"]").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "app_name = \"from-disk\"\nport = 4100").unwrap();
        let options = load_options(file.path()).unwrap();
        assert_eq!(options.app_name, "from-disk");
        assert_eq!(options.port, Some(4100));
    }

    #[test]
    fn test_missing_file() {
        let err = load_options(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
