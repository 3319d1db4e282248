//! Core types for the steering simulation library
//!
//! This module defines the fundamental types shared by the broker, the ECU
//! and the visualization model: signal references, signal updates and the
//! library error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the simulation
pub type Timestamp = DateTime<Utc>;

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur in the simulation library
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid broker endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Signal not found: {0}")]
    SignalNotFound(SignalRef),

    #[error("Signal {signal} is not declared by publisher '{client_id}'")]
    UndeclaredSignal { client_id: String, signal: SignalRef },

    #[error("Client id already registered: {0}")]
    DuplicateClient(String),

    #[error("Subscription '{0}' is disconnected")]
    Disconnected(String),
}

/// Reference to a signal on the bus (message name + signal name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalRef {
    /// Message (frame) name, e.g. "SteeringCommand"
    pub message: String,
    /// Signal name within the message, e.g. "SteeringAngle"
    pub signal: String,
}

impl SignalRef {
    pub fn new(message: impl Into<String>, signal: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            signal: signal.into(),
        }
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.message, self.signal)
    }
}

/// A raw signal value delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalUpdate {
    /// Which signal changed
    pub signal: SignalRef,
    /// Raw on-bus integer value
    pub raw: i64,
    /// Time the broker accepted the write
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_ref_display() {
        let signal = SignalRef::new("SteeringCommand", "SteeringAngle");
        assert_eq!(signal.to_string(), "SteeringCommand.SteeringAngle");
    }

    #[test]
    fn test_error_messages() {
        let err = SimError::UndeclaredSignal {
            client_id: "steering_gateway".to_string(),
            signal: SignalRef::new("SteeringStatus", "CurrentAngle"),
        };
        assert_eq!(
            err.to_string(),
            "Signal SteeringStatus.CurrentAngle is not declared by publisher 'steering_gateway'"
        );
    }
}
