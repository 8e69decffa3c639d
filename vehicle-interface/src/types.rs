//! Core types for the vehicle interface library
//!
//! This module defines the values exchanged at the boundary with the bus:
//! named signal mappings, raw frames, outgoing frame descriptions and the
//! library error type.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Result type for vehicle interface operations
pub type Result<T> = std::result::Result<T, InterfaceError>;

/// Signal name -> physical value mapping for one message
pub type SignalValues = HashMap<String, f64>;

/// Bus segment a frame is received from or sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    /// Powertrain bus (wheel speeds, steering sensors, body)
    Primary,
    /// Advanced driver-assist bus
    Adas,
    /// Camera bus (stock lane keeping / cruise messages)
    Camera,
}

impl Bus {
    /// Bus number used on the wire
    pub fn number(self) -> u8 {
        match self {
            Bus::Primary => 0,
            Bus::Adas => 1,
            Bus::Camera => 2,
        }
    }

    /// Map a wire bus number back to a segment
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(Bus::Primary),
            1 => Some(Bus::Adas),
            2 => Some(Bus::Camera),
            _ => None,
        }
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bus::Primary => write!(f, "primary"),
            Bus::Adas => write!(f, "adas"),
            Bus::Camera => write!(f, "camera"),
        }
    }
}

/// Raw CAN frame as seen on (or written to) the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// CAN message ID (11-bit)
    pub address: u32,
    /// Bus number (0 = primary, 1 = adas, 2 = camera)
    pub bus: u8,
    /// Frame data bytes
    pub data: Vec<u8>,
}

impl CanFrame {
    /// Create a new frame
    pub fn new(address: u32, bus: u8, data: Vec<u8>) -> Self {
        Self { address, bus, data }
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// A message the command synthesizer wants sent this cycle
///
/// The catalog adapter renders it into a [`CanFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingFrame {
    /// Message name from the signal catalog
    pub message: String,
    /// Destination bus
    pub bus: Bus,
    /// Every signal value to encode, checksum and counter included
    pub values: SignalValues,
}

impl OutgoingFrame {
    pub fn new(message: impl Into<String>, bus: Bus, values: SignalValues) -> Self {
        Self {
            message: message.into(),
            bus,
            values,
        }
    }

    /// Read a signal value, 0 when the signal is not part of this frame
    pub fn value(&self, signal: &str) -> f64 {
        self.values.get(signal).copied().unwrap_or(0.0)
    }
}

/// HUD alert requested by the planner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualAlert {
    #[default]
    None,
    /// Driver must put hands on the wheel
    SteerRequired,
    /// Any alert the stock display has no dedicated lamp for
    Other,
}

/// Errors raised while loading catalogs or rendering frames
///
/// None of these occur inside a control cycle once the interface is built
/// against a catalog that declares every message the variant uses.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Signal not found: {signal} in {message}")]
    SignalNotFound { message: String, signal: String },

    #[error("Unknown vehicle variant: {0}")]
    UnknownVariant(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_numbers_round_trip() {
        for bus in [Bus::Primary, Bus::Adas, Bus::Camera] {
            assert_eq!(Bus::from_number(bus.number()), Some(bus));
        }
        assert_eq!(Bus::from_number(7), None);
    }

    #[test]
    fn test_outgoing_frame_value_defaults_to_zero() {
        let mut values = SignalValues::new();
        values.insert("Counter".to_string(), 3.0);
        let frame = OutgoingFrame::new("ES_LKAS", Bus::Primary, values);
        assert_eq!(frame.value("Counter"), 3.0);
        assert_eq!(frame.value("Checksum"), 0.0);
    }

    #[test]
    fn test_error_display() {
        let err = InterfaceError::SignalNotFound {
            message: "ES_LKAS".to_string(),
            signal: "Bogus".to_string(),
        };
        assert_eq!(format!("{}", err), "Signal not found: Bogus in ES_LKAS");
        assert_eq!(
            format!("{}", InterfaceError::MessageNotFound("ES_Bogus".to_string())),
            "Message not found: ES_Bogus"
        );
    }
}
