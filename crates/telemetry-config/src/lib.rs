//! Configuration for the telemetry relay.
//!
//! Both processes read the same JSON file (`GTPConfig.txt` by convention,
//! but the path is always injected by the host). Unknown fields are
//! ignored and missing fields take their defaults, so old config files
//! keep working across releases.

#![deny(static_mut_refs)]

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default UDP port for the record stream.
pub const DEFAULT_UDP_PORT: u16 = 6969;

/// Default producer target address.
pub const DEFAULT_UDP_IP: &str = "127.0.0.1";

/// Configuration errors. A missing file is not an error (defaults apply);
/// a file that exists but does not parse is.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Pause-hotkey binding on the producer side. Registration itself is a
/// host concern; the relay only carries the choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotkeyConfig {
    pub enabled: bool,
    pub key: String,
    pub windows: bool,
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key: "P".to_string(),
            windows: false,
            alt: false,
            shift: false,
            ctrl: true,
        }
    }
}

/// Producer-side options: where to publish and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProducerConfig {
    /// Destination address for UDP publishing.
    #[serde(rename = "udpIP")]
    pub udp_ip: String,
    /// Destination port for UDP publishing.
    pub udp_port: u16,
    /// Publish each frame as a UDP datagram.
    #[serde(rename = "sendUDP")]
    pub send_udp: bool,
    /// Keep the shared-memory mapping filled.
    #[serde(rename = "fillMMF")]
    pub fill_mmf: bool,
    /// Pause-toggle hotkey binding.
    pub hotkey: HotkeyConfig,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            udp_ip: DEFAULT_UDP_IP.to_string(),
            udp_port: DEFAULT_UDP_PORT,
            send_udp: true,
            fill_mmf: true,
            hotkey: HotkeyConfig::default(),
        }
    }
}

/// Consumer-side options: where to listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumerConfig {
    /// Port to bind for UDP ingest.
    pub udp_port: u16,
    /// Ingest over UDP instead of the shared-memory mapping.
    #[serde(rename = "receiveUDP")]
    pub receive_udp: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            receive_udp: false,
        }
    }
}

fn load_json<T>(path: &Path) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
{
    let path_display = path.display().to_string();
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path_display, "config file absent, using defaults");
            Ok(T::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path_display,
            source,
        }),
    }
}

impl ProducerConfig {
    /// Load producer options, falling back to defaults when the file is
    /// absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = load_json::<Self>(path.as_ref())?;
        debug!(?config, "producer config loaded");
        Ok(config)
    }
}

impl ConsumerConfig {
    /// Load consumer options, falling back to defaults when the file is
    /// absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = load_json::<Self>(path.as_ref())?;
        debug!(?config, "consumer config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_defaults() {
        let producer = ProducerConfig::default();
        assert_eq!(producer.udp_ip, "127.0.0.1");
        assert_eq!(producer.udp_port, 6969);
        assert!(producer.send_udp);
        assert!(producer.fill_mmf);
        assert!(!producer.hotkey.enabled);

        let consumer = ConsumerConfig::default();
        assert_eq!(consumer.udp_port, 6969);
        assert!(!consumer.receive_udp);
    }

    #[test]
    fn test_load_producer_json() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"udpIP":"192.168.1.20","udpPort":7001,"sendUDP":false,
                "hotkey":{{"enabled":true,"key":"M","ctrl":false,"alt":true}}}}"#
        )?;
        let config = ProducerConfig::load_or_default(file.path())?;
        assert_eq!(config.udp_ip, "192.168.1.20");
        assert_eq!(config.udp_port, 7001);
        assert!(!config.send_udp);
        // Unspecified fields keep their defaults.
        assert!(config.fill_mmf);
        assert!(config.hotkey.enabled);
        assert_eq!(config.hotkey.key, "M");
        assert!(config.hotkey.alt);
        assert!(!config.hotkey.ctrl);
        Ok(())
    }

    #[test]
    fn test_load_consumer_json() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"udpPort":7100,"receiveUDP":true}}"#)?;
        let config = ConsumerConfig::load_or_default(file.path())?;
        assert_eq!(config.udp_port, 7100);
        assert!(config.receive_udp);
        Ok(())
    }

    #[test]
    fn test_absent_file_uses_defaults() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = ConsumerConfig::load_or_default(dir.path().join("GTPConfig.txt"))?;
        assert_eq!(config, ConsumerConfig::default());
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "not json at all")?;
        assert!(matches!(
            ProducerConfig::load_or_default(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }
}
