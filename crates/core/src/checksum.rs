//! Content checksum types and utilities.
//!
//! The checksum registered with a file intent is a *claim* made by the
//! sender. The coordinator only trusts it after the byte transport reports
//! the digest it computed over the bytes actually moved.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Supported checksum algorithms.
///
/// Every algorithm produces a fixed-length lowercase hex digest, so the
/// claim supplied at registration time can be validated syntactically before
/// any bytes move.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5 (32 hex chars). Kept for compatibility with older clients.
    Md5,
    /// SHA-256 (64 hex chars).
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    /// Length of the hex digest this algorithm produces.
    pub fn digest_hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Compute the checksum of a byte slice.
    pub fn compute(self, data: &[u8]) -> Checksum {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create an incremental hasher for this algorithm.
    pub fn hasher(self) -> ChecksumHasher {
        match self {
            Self::Md5 => ChecksumHasher::Md5(Md5::new()),
            Self::Sha256 => ChecksumHasher::Sha256(Sha256::new()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checksum digest in lowercase hex, tagged with its algorithm.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl Checksum {
    /// Parse and validate a hex digest for the given algorithm.
    ///
    /// Accepts uppercase input; the stored form is always lowercase so
    /// digest comparison is a plain string equality.
    pub fn from_hex(algorithm: ChecksumAlgorithm, s: &str) -> crate::Result<Self> {
        let expected = algorithm.digest_hex_len();
        if s.len() != expected {
            return Err(crate::Error::InvalidChecksum(format!(
                "expected {} hex chars for {}, got {}",
                expected,
                algorithm,
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidChecksum(
                "digest contains non-hex characters".to_string(),
            ));
        }
        Ok(Self {
            algorithm,
            hex: s.to_ascii_lowercase(),
        })
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// The lowercase hex digest.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({}:{})", self.algorithm, &self.hex)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Incremental checksum hasher.
pub enum ChecksumHasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl ChecksumHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Finalize and return the checksum.
    pub fn finalize(self) -> Checksum {
        let (algorithm, bytes) = match self {
            Self::Md5(h) => (ChecksumAlgorithm::Md5, h.finalize().to_vec()),
            Self::Sha256(h) => (ChecksumAlgorithm::Sha256, h.finalize().to_vec()),
        };
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Checksum { algorithm, hex }
    }
}
