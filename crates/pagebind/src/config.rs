//! Runtime configuration.
//!
//! ```yaml
//! highlight_on_locate: true
//! default_wait_timeout_ms: 2000
//! log_filter: "pagebind=debug"
//! tokens:
//!   customer: "ACME"
//! ```

use crate::builder::PageBuilder;
use crate::result::PageResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Settings applied to the action repository and page builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagebindConfig {
    /// Highlight every element as it is located
    pub highlight_on_locate: bool,
    /// Existence timeout for element checks, in milliseconds
    pub default_wait_timeout_ms: u64,
    /// Filter used by [`PagebindConfig::init_tracing`] when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit JSON log lines instead of the compact format
    pub json_logs: bool,
    /// Named tokens available to `{name}` expansion
    pub tokens: HashMap<String, String>,
}

impl Default for PagebindConfig {
    fn default() -> Self {
        Self {
            highlight_on_locate: false,
            default_wait_timeout_ms: 5_000,
            log_filter: "warn,pagebind=info".to_string(),
            json_logs: false,
            tokens: HashMap::new(),
        }
    }
}

impl PagebindConfig {
    /// Parse YAML
    ///
    /// # Errors
    /// Returns error if YAML parsing fails
    pub fn from_yaml(yaml: &str) -> PageResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read a YAML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> PageResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&text)
    }

    /// Serialize to YAML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> PageResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Existence timeout
    #[must_use]
    pub const fn default_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.default_wait_timeout_ms)
    }

    /// Apply the timeout to a page builder
    pub fn apply_to(&self, builder: &PageBuilder) {
        builder.set_wait_timeout(self.default_wait_timeout());
    }

    /// Install a global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over `log_filter`. Returns `false` when a
    /// subscriber was already installed, which leaves the existing one alone.
    pub fn init_tracing(&self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_filter));

        let installed = if self.json_logs {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_target(false))
                .try_init()
        };
        installed.is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = PagebindConfig::from_yaml("highlight_on_locate: true").unwrap();
        assert!(config.highlight_on_locate);
        assert_eq!(config.default_wait_timeout(), Duration::from_secs(5));
        assert!(config.tokens.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_wait_timeout_ms: 250\ntokens:\n  customer: ACME\n  region: north"
        )
        .unwrap();

        let config = PagebindConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_wait_timeout(), Duration::from_millis(250));
        assert_eq!(config.tokens.get("customer").map(String::as_str), Some("ACME"));
        assert_eq!(config.tokens.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PagebindConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert_eq!(err.kind(), crate::result::ErrorKind::Io);
    }

    #[test]
    fn test_bad_yaml_is_error() {
        assert!(PagebindConfig::from_yaml("default_wait_timeout_ms: [1, 2]").is_err());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_tokens() {
        let mut config = PagebindConfig::default();
        config.tokens.insert("order".into(), "42".into());
        let back = PagebindConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_apply_to_builder() {
        let builder = PageBuilder::new();
        let config = PagebindConfig {
            default_wait_timeout_ms: 10,
            ..PagebindConfig::default()
        };
        config.apply_to(&builder);
        assert_eq!(builder.wait_timeout(), Duration::from_millis(10));
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let config = PagebindConfig::default();
        let _ = config.init_tracing();
        assert!(!config.init_tracing());
    }
}
