//! Application configuration
//!
//! All collaborator credentials and stream parameters live in explicit
//! config structs handed to constructors. Core logic never reads the
//! process environment; the binaries overlay `AZAAN_*` variables onto a
//! loaded or default config at the edge.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};

/// Parameters of one streaming session (sender or receiver)
///
/// Immutable once a session has been started with it. Both endpoints of a
/// feed must be configured identically; there is no in-band negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Relay host name (also used for TLS hostname verification)
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Channel count of the PCM feed
    pub channels: u16,
    /// Sample rate of the PCM feed
    pub sample_rate: u32,
    /// Capture chunk size in samples per channel
    pub chunk_samples: usize,
    /// Optional trust-anchor certificate bundle (PEM); system roots when absent
    pub ca_cert: Option<PathBuf>,
    /// RMS threshold for the energy-gate noise fallback
    pub gate_threshold: u32,
}

impl StreamConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Size of one capture chunk in bytes
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_samples * self.channels as usize * SAMPLE_WIDTH
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9443,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            ca_cert: None,
            gate_threshold: DEFAULT_GATE_THRESHOLD,
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Provider API key; required before the auth client can be built
    pub api_key: String,
}

/// Group registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry project identifier; required before the client can be built
    pub project_id: String,
}

/// Offline playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Directory containing the stored azaan recordings
    pub assets_dir: PathBuf,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Push service server key; sending is unavailable without it
    pub server_key: Option<String>,
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from a file if it exists, otherwise return defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bytes_accounts_for_channels_and_width() {
        let mut config = StreamConfig::default();
        assert_eq!(config.chunk_bytes(), 1024 * 2);

        config.channels = 2;
        config.chunk_samples = 512;
        assert_eq!(config.chunk_bytes(), 512 * 2 * 2);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [stream]
            host = "relay.example.org"
            port = 8443
            channels = 1
            sample_rate = 16000
            chunk_samples = 1024
            gate_threshold = 400
            "#,
        )
        .unwrap();

        assert_eq!(config.stream.host, "relay.example.org");
        assert_eq!(config.stream.gate_threshold, 400);
        assert!(config.auth.api_key.is_empty());
        assert_eq!(config.offline.assets_dir, PathBuf::from("assets"));
    }
}
