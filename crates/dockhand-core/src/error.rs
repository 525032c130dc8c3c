//! Error types for dockhand-core

use thiserror::Error;

/// Result type alias using dockhand-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment override could not be parsed
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid environment override error
    pub fn invalid_env(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var: var.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::config_not_found("/etc/dockhand.yaml");
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /etc/dockhand.yaml"
        );

        let err = Error::invalid_env("DOCKHAND_BACKUP_ROTATION_COUNT", "many");
        assert!(err.to_string().contains("DOCKHAND_BACKUP_ROTATION_COUNT"));
    }
}
