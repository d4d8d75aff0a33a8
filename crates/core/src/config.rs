//! Configuration types shared across crates.

use crate::checksum::ChecksumAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/courier.db"),
        }
    }
}

/// Peer presence configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Seconds since the last registration before a peer counts as offline.
    #[serde(default = "default_liveness_threshold_secs")]
    pub liveness_threshold_secs: u64,
    /// Interval in seconds between client presence polls (and heartbeats).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_liveness_threshold_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            liveness_threshold_secs: default_liveness_threshold_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl PresenceConfig {
    /// Liveness threshold as a `time::Duration` for cutoff arithmetic.
    pub fn liveness_threshold(&self) -> time::Duration {
        let secs = i64::try_from(self.liveness_threshold_secs).unwrap_or(i64::MAX);
        time::Duration::seconds(secs)
    }

    /// Poll interval as a std Duration for timers.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate presence configuration.
    ///
    /// Returns warnings for configs that are legal but likely mistakes,
    /// and errors for configs that would break timers at runtime.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if self.poll_interval_secs == 0 {
            return Err("presence.poll_interval_secs cannot be 0. \
                 This would cause a panic when creating the poll timer. \
                 Use a value >= 1 second."
                .to_string());
        }
        if self.liveness_threshold_secs == 0 {
            return Err(
                "presence.liveness_threshold_secs cannot be 0: every peer would \
                 be offline the instant it registered."
                    .to_string(),
            );
        }
        if self.liveness_threshold_secs < self.poll_interval_secs {
            warnings.push(format!(
                "presence.liveness_threshold_secs={} is shorter than \
                 poll_interval_secs={}; peers will flap offline between heartbeats.",
                self.liveness_threshold_secs, self.poll_interval_secs
            ));
        }

        Ok(warnings)
    }
}

/// Transfer coordination configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Upper bound on simultaneous in-flight deliveries during fan-out.
    #[serde(default = "default_max_concurrent_deliveries")]
    pub max_concurrent_deliveries: u32,
    /// Per-recipient delivery timeout in seconds.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    /// Checksum algorithm used for claims and post-transfer verification.
    ///
    /// Must be consistent between the registering client and the transport,
    /// otherwise every delivery fails verification.
    #[serde(default)]
    pub checksum: ChecksumAlgorithm,
}

fn default_max_concurrent_deliveries() -> u32 {
    4
}

fn default_delivery_timeout_secs() -> u64 {
    30
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: default_max_concurrent_deliveries(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            checksum: ChecksumAlgorithm::default(),
        }
    }
}

impl TransferConfig {
    /// Per-recipient delivery timeout as a Duration.
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    /// Validate transfer configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_deliveries == 0 {
            return Err(
                "transfer.max_concurrent_deliveries cannot be 0: fan-out would \
                 never dispatch any delivery."
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Peer presence configuration.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Transfer coordination configuration.
    #[serde(default)]
    pub transfer: TransferConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses an in-repo SQLite path that tests are
    /// expected to override with a tempdir.
    pub fn for_testing() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.presence.validate().unwrap().is_empty());
        assert!(config.transfer.validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let presence = PresenceConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(presence.validate().is_err());
    }

    #[test]
    fn short_liveness_threshold_warns() {
        let presence = PresenceConfig {
            liveness_threshold_secs: 5,
            poll_interval_secs: 30,
        };
        let warnings = presence.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn zero_fanout_bound_rejected() {
        let transfer = TransferConfig {
            max_concurrent_deliveries: 0,
            ..Default::default()
        };
        assert!(transfer.validate().is_err());
    }

    #[test]
    fn deserialize_without_optional_fields() {
        let json = r#"{"presence": {"liveness_threshold_secs": 90}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.presence.liveness_threshold_secs, 90);
        assert_eq!(config.presence.poll_interval_secs, 30);
        assert_eq!(config.transfer.checksum, ChecksumAlgorithm::Sha256);
    }
}
