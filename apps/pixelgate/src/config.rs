//! # Application Configuration
//!
//! Optional TOML file layered under the command-line flags:
//!
//! ```toml
//! [engine]
//! target_hz = 60
//! max_graph_nodes = 500
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! Missing sections and fields fall back to their defaults.

use pixelgate_core::{EngineConfig, PixelgateError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "pixelgate.toml";

/// Configuration files are small; anything larger is refused unread.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// A bare level (`debug`) or a full `EnvFilter` directive.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse `PIXELGATE_LOG_FORMAT`-style values. Unknown values are `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, PixelgateError> {
        let config: Self =
            toml::from_str(text).map_err(|e| PixelgateError::InvalidConfig(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load `path`, or `pixelgate.toml` from the working directory if it
    /// exists, or the defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, PixelgateError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(&path).map_err(|e| {
            PixelgateError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(PixelgateError::InvalidConfig(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(&path)
            .map_err(|e| PixelgateError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml_str(&text)
    }

    /// `EnvFilter` directive for the configured level.
    ///
    /// A bare level applies to both pixelgate crates; anything else is
    /// passed through as a full directive.
    pub fn filter_directive(&self) -> String {
        let level = self.logging.level.trim();
        match level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                format!("pixelgate={0},pixelgate_core={0}", level)
            }
            _ => level.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.engine.target_hz, 30);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            "[engine]\ntarget_hz = 60\n\n[logging]\nformat = \"json\"\n",
        )
        .expect("parse");
        assert_eq!(config.engine.target_hz, 60);
        assert_eq!(config.engine.max_graph_nodes, 1000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn invalid_engine_values_are_rejected() {
        let err = AppConfig::from_toml_str("[engine]\ntarget_hz = 0\n").expect_err("rate");
        assert!(matches!(err, PixelgateError::InvalidConfig(_)));

        let err = AppConfig::from_toml_str("[engine]\ntarget_hz = \"fast\"\n").expect_err("type");
        assert!(matches!(err, PixelgateError::InvalidConfig(_)));
    }

    #[test]
    fn bare_levels_expand_to_both_crates() {
        let mut config = AppConfig::default();
        assert_eq!(config.filter_directive(), "pixelgate=info,pixelgate_core=info");

        config.logging.level = "pixelgate_core=trace".to_string();
        assert_eq!(config.filter_directive(), "pixelgate_core=trace");
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" text "), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
    }
}
