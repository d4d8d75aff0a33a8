//! Peer identity validation and liveness status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a peer name.
pub const MAX_PEER_NAME_LEN: usize = 64;

/// Validate a peer name.
///
/// Names act as primary keys in the registry and appear in URL paths, so
/// they must be non-empty, at most [`MAX_PEER_NAME_LEN`] bytes, and free of
/// path separators and control characters.
pub fn validate_peer_name(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(crate::Error::InvalidPeerName(
            "name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_PEER_NAME_LEN {
        return Err(crate::Error::InvalidPeerName(format!(
            "name exceeds {MAX_PEER_NAME_LEN} bytes"
        )));
    }
    if name == crate::WILDCARD_RECIPIENT {
        return Err(crate::Error::InvalidPeerName(
            "name is reserved for wildcard sends".to_string(),
        ));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(crate::Error::InvalidPeerName(format!(
            "name contains forbidden characters: {name:?}"
        )));
    }
    Ok(())
}

/// Validate a transfer port.
///
/// The wire type is `u32` so an out-of-range value can be reported instead
/// of failing JSON deserialization with an opaque error.
pub fn validate_port(port: u32) -> crate::Result<u16> {
    if port == 0 || port > u16::MAX as u32 {
        return Err(crate::Error::InvalidPort(port));
    }
    Ok(port as u16)
}

/// Registry liveness status of a peer.
///
/// `Offline` only records an explicit unregister; a peer whose heartbeats
/// stopped is still `Online` here and filtered out lazily by the
/// `last_seen` cutoff at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Online,
    Offline,
}

impl PeerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            other => Err(crate::Error::InvalidPeerStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        for name in ["PC1", "build-host", "alice.laptop", "x"] {
            assert!(validate_peer_name(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_peer_name("").is_err());
        assert!(validate_peer_name("*").is_err());
        assert!(validate_peer_name("a/b").is_err());
        assert!(validate_peer_name("a\\b").is_err());
        assert!(validate_peer_name("tab\there").is_err());
        assert!(validate_peer_name(&"x".repeat(MAX_PEER_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn port_range() {
        assert!(validate_port(0).is_err());
        assert!(validate_port(65536).is_err());
        assert_eq!(validate_port(1).unwrap(), 1);
        assert_eq!(validate_port(65535).unwrap(), 65535);
        assert_eq!(validate_port(5001).unwrap(), 5001);
    }

    #[test]
    fn status_roundtrip() {
        assert_eq!(PeerStatus::parse("online").unwrap(), PeerStatus::Online);
        assert_eq!(PeerStatus::parse("offline").unwrap(), PeerStatus::Offline);
        assert!(PeerStatus::parse("away").is_err());
    }
}
