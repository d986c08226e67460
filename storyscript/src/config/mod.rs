//! Runtime configuration
//!
//! Limits and switches read by the runtime through `EvalContext::config`.
//! Loaded from TOML; any field left out takes its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Nested evaluation frames allowed before an operation error
    pub max_frame_depth: usize,
    /// Size limit in bytes for each compiled pattern matcher
    pub pattern_size_limit: usize,
    /// Longest array `(range:)` may produce
    pub max_range_len: usize,
    /// Emit a debug log line for every macro dispatch
    pub log_dispatch: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_frame_depth: 256,
            pattern_size_limit: 1 << 20,
            max_range_len: 1 << 16,
            log_dispatch: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        Ok(config.sanitized())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // A zero depth would make every lambda call fail
    fn sanitized(mut self) -> Self {
        let defaults = RuntimeConfig::default();
        if self.max_frame_depth == 0 {
            log::warn!(
                "max_frame_depth of 0 is unusable, falling back to {}",
                defaults.max_frame_depth
            );
            self.max_frame_depth = defaults.max_frame_depth;
        }
        if self.pattern_size_limit == 0 {
            log::warn!(
                "pattern_size_limit of 0 is unusable, falling back to {}",
                defaults.pattern_size_limit
            );
            self.pattern_size_limit = defaults.pattern_size_limit;
        }
        if self.max_range_len == 0 {
            log::warn!(
                "max_range_len of 0 is unusable, falling back to {}",
                defaults.max_range_len
            );
            self.max_range_len = defaults.max_range_len;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let config = RuntimeConfig::from_toml_str("max_frame_depth = 8\n").unwrap();
        assert_eq!(
            config,
            RuntimeConfig {
                max_frame_depth: 8,
                ..RuntimeConfig::default()
            }
        );
    }

    #[test]
    fn zero_limits_fall_back() {
        let config = RuntimeConfig::from_toml_str(
            "max_frame_depth = 0\npattern_size_limit = 0\nmax_range_len = 0\n",
        )
        .unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = RuntimeConfig::from_toml_str("max_frame_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
