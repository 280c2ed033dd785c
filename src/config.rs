//! Runtime configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `CAMXUC__SECTION__KEY` environment variables. CLI flags are
//! applied on top by the binary.

use crate::error::{CamXucError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "camxuc.toml";

const ENV_PREFIX: &str = "CAMXUC";

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

/// Classification service connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL; `/detect_emotion/` is appended
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Camera and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Fixed camera index; `None` tries 0 then 1
    pub camera_index: Option<u32>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub poll_interval_ms: u64,
    pub countdown_secs: u32,
    pub photo_jpeg_quality: u8,
    pub video_jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: None,
            width: 640,
            height: 480,
            fps: 30,
            poll_interval_ms: 1000,
            countdown_secs: 3,
            photo_jpeg_quality: 95,
            video_jpeg_quality: 92,
        }
    }
}

impl CaptureConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// File logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    /// `EnvFilter` directive, e.g. `info` or `camxuc=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("camxuc.log"),
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `path` (or `camxuc.toml` if present), then env vars
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(
                    config::File::with_name(DEFAULT_CONFIG_FILE)
                        .format(config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let loaded: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects settings the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(CamXucError::Config("server.base_url is empty".to_string()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(CamXucError::Config(
                "server.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.capture.poll_interval_ms == 0 {
            return Err(CamXucError::Config(
                "capture.poll_interval_ms must be positive".to_string(),
            ));
        }
        for (name, quality) in [
            ("photo_jpeg_quality", self.capture.photo_jpeg_quality),
            ("video_jpeg_quality", self.capture.video_jpeg_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(CamXucError::Config(format!(
                    "capture.{name} must be within 1..=100, got {quality}"
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.capture.countdown_secs, 3);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
base_url = "http://emotion.local:9000"

[capture]
countdown_secs = 0
camera_index = 2
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.base_url, "http://emotion.local:9000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.capture.countdown_secs, 0);
        assert_eq!(config.capture.camera_index, Some(2));
        assert_eq!(config.capture.poll_interval_ms, 1000);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/camxuc.toml")));
        assert!(matches!(result, Err(CamXucError::Config(_))));
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let mut config = AppConfig::default();
        config.capture.photo_jpeg_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = AppConfig::default();
        config.capture.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
