//! Steering bus signal database
//!
//! Message and signal definitions for the virtual steering bus, with the
//! raw ↔ physical scaling used when values are written to the broker.

use crate::types::{Result, SignalRef, SimError};
use std::collections::BTreeMap;

/// Message name for gateway → ECU commands
pub const STEERING_COMMAND: &str = "SteeringCommand";
/// Message name for ECU → gateway status
pub const STEERING_STATUS: &str = "SteeringStatus";

pub const STEERING_ANGLE: &str = "SteeringAngle";
pub const STEERING_SPEED: &str = "SteeringSpeed";
pub const CURRENT_ANGLE: &str = "CurrentAngle";
pub const ECU_READY: &str = "ECU_Ready";

/// CAN ID of SteeringCommand
pub const STEERING_COMMAND_ID: u32 = 100;
/// CAN ID of SteeringStatus
pub const STEERING_STATUS_ID: u32 = 200;

/// A CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Sender node name
    pub sender: String,
    /// All signals in this message
    pub signals: Vec<SignalDefinition>,
}

/// A signal definition with linear scaling
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    /// Signal name
    pub name: String,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "deg", "deg/s")
    pub unit: Option<String>,
}

impl SignalDefinition {
    fn new(name: &str, factor: f64, min: f64, max: f64, unit: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            factor,
            offset: 0.0,
            min,
            max,
            unit: unit.map(str::to_string),
        }
    }

    /// Physical value → raw integer (truncates toward zero)
    pub fn encode(&self, physical: f64) -> i64 {
        ((physical - self.offset) * self.factor.recip()) as i64
    }

    /// Raw integer → physical value
    pub fn decode(&self, raw: i64) -> f64 {
        raw as f64 / self.factor.recip() + self.offset
    }
}

/// Signal database for the steering bus
#[derive(Debug, Clone)]
pub struct SignalDatabase {
    /// Messages by name
    messages: BTreeMap<String, MessageDefinition>,
}

impl SignalDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
        }
    }

    /// The demo bus: SteeringCommand (ID 100) and SteeringStatus (ID 200)
    pub fn steering_bus() -> Self {
        let mut db = Self::new();
        db.add_message(MessageDefinition {
            id: STEERING_COMMAND_ID,
            name: STEERING_COMMAND.to_string(),
            sender: "Gateway".to_string(),
            signals: vec![
                SignalDefinition::new(STEERING_ANGLE, 0.1, -2000.0, 2000.0, Some("deg")),
                SignalDefinition::new(STEERING_SPEED, 1.0, 0.0, 1000.0, Some("deg/s")),
            ],
        });
        db.add_message(MessageDefinition {
            id: STEERING_STATUS_ID,
            name: STEERING_STATUS.to_string(),
            sender: "Steering_ECU".to_string(),
            signals: vec![
                SignalDefinition::new(CURRENT_ANGLE, 0.1, -2000.0, 2000.0, Some("deg")),
                SignalDefinition::new(ECU_READY, 1.0, 0.0, 1.0, None),
            ],
        });
        db
    }

    pub fn add_message(&mut self, message: MessageDefinition) {
        if self.messages.contains_key(&message.name) {
            log::warn!("Replacing message definition '{}'", message.name);
        }
        self.messages.insert(message.name.clone(), message);
    }

    pub fn message(&self, name: &str) -> Option<&MessageDefinition> {
        self.messages.get(name)
    }

    pub fn message_by_id(&self, id: u32) -> Option<&MessageDefinition> {
        self.messages.values().find(|m| m.id == id)
    }

    /// Look up a signal definition
    pub fn signal(&self, signal: &SignalRef) -> Result<&SignalDefinition> {
        self.messages
            .get(&signal.message)
            .and_then(|m| m.signals.iter().find(|s| s.name == signal.signal))
            .ok_or_else(|| SimError::SignalNotFound(signal.clone()))
    }

    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    pub fn num_signals(&self) -> usize {
        self.messages.values().map(|m| m.signals.len()).sum()
    }
}

impl Default for SignalDatabase {
    fn default() -> Self {
        Self::steering_bus()
    }
}

/// Shorthand for the steering bus signal references
pub fn steering_angle() -> SignalRef {
    SignalRef::new(STEERING_COMMAND, STEERING_ANGLE)
}

pub fn steering_speed() -> SignalRef {
    SignalRef::new(STEERING_COMMAND, STEERING_SPEED)
}

pub fn current_angle() -> SignalRef {
    SignalRef::new(STEERING_STATUS, CURRENT_ANGLE)
}

pub fn ecu_ready() -> SignalRef {
    SignalRef::new(STEERING_STATUS, ECU_READY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steering_bus_contents() {
        let db = SignalDatabase::steering_bus();
        assert_eq!(db.num_messages(), 2);
        assert_eq!(db.num_signals(), 4);
        assert_eq!(db.message_by_id(100).unwrap().name, STEERING_COMMAND);
        assert_eq!(db.message(STEERING_STATUS).unwrap().sender, "Steering_ECU");
    }

    #[test]
    fn test_angle_scaling() {
        let db = SignalDatabase::steering_bus();
        let angle = db.signal(&steering_angle()).unwrap();
        assert_eq!(angle.encode(12.34), 123);
        assert_eq!(angle.encode(-12.34), -123);
        assert_eq!(angle.encode(500.0), 5000);
        assert!((angle.decode(-4794) - -479.4).abs() < 1e-9);
    }

    #[test]
    fn test_angle_decode_is_exact() {
        let db = SignalDatabase::steering_bus();
        let angle = db.signal(&current_angle()).unwrap();
        assert_eq!(angle.decode(4794), 479.4);
        assert_eq!(angle.decode(-4794), -479.4);
        assert_eq!(angle.decode(123), 12.3);
    }

    #[test]
    fn test_unit_factor_signals() {
        let db = SignalDatabase::steering_bus();
        assert_eq!(db.signal(&ecu_ready()).unwrap().encode(1.0), 1);
        assert_eq!(db.signal(&steering_speed()).unwrap().decode(100), 100.0);
    }

    #[test]
    fn test_unknown_signal() {
        let db = SignalDatabase::steering_bus();
        let err = db.signal(&SignalRef::new(STEERING_COMMAND, "Brake")).unwrap_err();
        assert!(matches!(err, SimError::SignalNotFound(_)));
        assert!(db.signal(&SignalRef::new("Missing", STEERING_ANGLE)).is_err());
    }
}
