//! Unified signal database
//!
//! Holds the message and signal definitions of one vehicle catalog and
//! answers lookups by CAN ID and by message name.

use crate::types::{InterfaceError, Result};
use std::collections::HashMap;

/// A complete CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// Sender ECU name (optional)
    pub sender: Option<String>,
    /// All signals in this message
    pub signals: Vec<SignalDefinition>,
    /// Source file (DBC filename)
    pub source: String,
}

impl MessageDefinition {
    /// Find a signal of this message by name
    pub fn signal(&self, name: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    /// Signal name
    pub name: String,
    /// Start bit in the CAN frame (DBC numbering)
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    /// Byte order
    pub byte_order: ByteOrder,
    /// Value type (signed/unsigned)
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "km/h", "deg")
    pub unit: Option<String>,
}

impl SignalDefinition {
    /// Convert a raw bus value to its physical value
    pub fn to_physical(&self, raw: i64) -> f64 {
        self.offset + self.factor * (raw as f64)
    }

    /// Convert a physical value to the raw integer carried on the bus
    pub fn to_raw(&self, physical: f64) -> i64 {
        if self.factor == 0.0 {
            return 0;
        }
        ((physical - self.offset) / self.factor).round() as i64
    }
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Signed integer
    Signed,
    /// Unsigned integer
    Unsigned,
}

/// The unified signal database
#[derive(Debug, Clone, Default)]
pub struct SignalDatabase {
    /// All message definitions by CAN ID
    messages: HashMap<u32, MessageDefinition>,

    /// Key: message name, Value: CAN ID
    message_lookup: HashMap<String, u32>,
}

impl SignalDatabase {
    /// Create a new empty signal database
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message definition to the database
    ///
    /// A later definition for the same CAN ID replaces the earlier one.
    pub fn add_message(&mut self, message: MessageDefinition) {
        if let Some(previous) = self.messages.get(&message.id) {
            log::warn!(
                "Message 0x{:X} ({}) redefined by {}",
                message.id,
                previous.name,
                message.source
            );
            let previous_name = previous.name.clone();
            self.message_lookup.remove(&previous_name);
        }
        self.message_lookup.insert(message.name.clone(), message.id);
        self.messages.insert(message.id, message);
    }

    /// Get a message definition by CAN ID
    pub fn get_message(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages.get(&can_id)
    }

    /// Get a message definition by name
    pub fn get_message_by_name(&self, message_name: &str) -> Option<&MessageDefinition> {
        self.message_lookup
            .get(message_name)
            .and_then(|can_id| self.messages.get(can_id))
    }

    /// Like [`get_message_by_name`](Self::get_message_by_name) but an error when absent
    pub fn require_message(&self, message_name: &str) -> Result<&MessageDefinition> {
        self.get_message_by_name(message_name)
            .ok_or_else(|| InterfaceError::MessageNotFound(message_name.to_string()))
    }

    /// Look up one signal of a named message
    pub fn require_signal(&self, message_name: &str, signal_name: &str) -> Result<&SignalDefinition> {
        self.require_message(message_name)?
            .signal(signal_name)
            .ok_or_else(|| InterfaceError::SignalNotFound {
                message: message_name.to_string(),
                signal: signal_name.to_string(),
            })
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.values().map(|msg| msg.signals.len()).sum(),
        }
    }

    /// Get all CAN IDs in the database, sorted
    pub fn get_all_can_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.messages.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}
