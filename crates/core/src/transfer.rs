//! Transfer permissions, delivery outcomes, and fan-out lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visibility of a registered file transfer.
///
/// Derived from the recipient count, never chosen by the caller: a single
/// recipient makes the transfer `private`, more than one makes it `public`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Private,
    Public,
}

impl Permission {
    /// Derive the permission from the (non-empty) recipient set size.
    pub fn from_recipient_count(count: usize) -> Self {
        if count > 1 { Self::Public } else { Self::Private }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }

    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(crate::Error::InvalidPermission(other.to_string())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of delivering one file to one recipient.
///
/// A delivery result is write-once: it starts `Pending` and transitions
/// exactly once to a terminal state, after which it is immutable history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
}

impl DeliveryStatus {
    /// Whether this status closes the delivery.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::InvalidDeliveryStatus(other.to_string())),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fan-out progress of one file record across all its recipients.
///
/// Not stored; derived from the delivery rows so it can never drift from
/// them. `Complete` is terminal and the record becomes immutable history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutState {
    Created,
    InProgress,
    Complete,
}

impl FanoutState {
    /// Derive the state from pending/terminal delivery counts.
    pub fn from_counts(pending: u64, terminal: u64) -> Self {
        match (pending, terminal) {
            (_, 0) => Self::Created,
            (0, _) => Self::Complete,
            _ => Self::InProgress,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for FanoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_derivation() {
        assert_eq!(Permission::from_recipient_count(1), Permission::Private);
        assert_eq!(Permission::from_recipient_count(2), Permission::Public);
        assert_eq!(Permission::from_recipient_count(10), Permission::Public);
    }

    #[test]
    fn delivery_status_terminality() {
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(DeliveryStatus::Success.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
    }

    #[test]
    fn delivery_status_roundtrip() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Success,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(DeliveryStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(DeliveryStatus::parse("done").is_err());
    }

    #[test]
    fn fanout_state_from_counts() {
        assert_eq!(FanoutState::from_counts(3, 0), FanoutState::Created);
        assert_eq!(FanoutState::from_counts(2, 1), FanoutState::InProgress);
        assert_eq!(FanoutState::from_counts(0, 3), FanoutState::Complete);
        // Degenerate zero/zero reads as freshly created.
        assert_eq!(FanoutState::from_counts(0, 0), FanoutState::Created);
    }
}
