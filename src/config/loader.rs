//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::DemoConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
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

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<DemoConfig, ConfigError> {
    let config: DemoConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;

    tracing::debug!(
        path = %path.display(),
        components = config.components.len(),
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_parse_minimal() {
        let config = parse_config("").unwrap();
        assert_eq!(config.dispatcher.name, "dispatcher");
        assert!(config.components.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let config = parse_config(
            r#"
            [dispatcher]
            name = "edge"
            ready_timeout_ms = 250

            [observability]
            log_level = "debug"
            log_format = "json"

            [[components]]
            name = "tchannel"
            kind = "transport"
            start_delay_ms = 20

            [[components]]
            name = "http-in"
            kind = "inbound"
            fail_stop = true
            "#,
        )
        .unwrap();

        assert_eq!(config.dispatcher.ready_timeout_ms, 250);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.components.len(), 2);
        assert_eq!(config.components[0].kind, ComponentKind::Transport);
        assert_eq!(config.components[0].heartbeat_ms, 1_000);
        assert!(config.components[1].fail_stop);
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let err = parse_config(
            r#"
            [[components]]
            name = "x"
            kind = "sidecar"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_are_listed() {
        let err = parse_config(
            r#"
            [dispatcher]
            ready_timeout_ms = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
