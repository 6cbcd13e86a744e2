//! # Driver Configuration
//!
//! Optional TOML file with a `[params]` table holding [`CredParams`] fields
//! under their camelCase names. Every key is optional; command-line flags
//! are applied on top.
//!
//! ```toml
//! [params]
//! alpha = 0.2
//! beta = 0.4
//! gammaForward = 0.1
//! maxIterations = 500
//! ```

use credrank_core::{CredError, CredParams};
use serde::Deserialize;
use std::path::Path;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub params: CredParams,
}

impl Config {
    /// Parse a config document.
    pub fn parse(contents: &str) -> Result<Self, CredError> {
        toml::from_str(contents)
            .map_err(|e| CredError::Parameter(format!("failed to parse config: {}", e)))
    }

    /// Load `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, CredError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let metadata = std::fs::metadata(path).map_err(|e| {
            CredError::Io(format!("cannot read config {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CredError::Parameter(format!(
                "config {} is {} bytes, maximum is {}",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CredError::Io(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&contents)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credrank_core::IntervalLength;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::parse("").expect("parse");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn params_table_overrides_named_fields() {
        let config = Config::parse(
            r#"
            [params]
            alpha = 0.3
            gammaBackward = 0.05
            maxIterations = 500
            intervalLength = "weekly"
            "#,
        )
        .expect("parse");
        assert_eq!(config.params.alpha, 0.3);
        assert_eq!(config.params.gamma_backward, 0.05);
        assert_eq!(config.params.max_iterations, 500);
        assert_eq!(config.params.interval_length, IntervalLength::Weekly);
        assert_eq!(config.params.beta, CredParams::default().beta);
    }

    #[test]
    fn unknown_table_rejected() {
        assert!(Config::parse("[server]\nport = 1").is_err());
    }

    #[test]
    fn unsupported_interval_length_rejected() {
        assert!(Config::parse("[params]\nintervalLength = \"daily\"").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = Config::load(Some(Path::new("/nonexistent/credrank.toml")));
        assert!(matches!(result, Err(CredError::Io(_))));
    }
}
