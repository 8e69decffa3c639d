//! Message parsing
//!
//! Decodes raw frames of one bus into per-message signal mappings and tracks
//! whether the expected traffic is arriving. This is the read half of the
//! catalog adapter: every declared signal always has a value, its default
//! until the first frame carrying it is seen.

use crate::can::bitfield;
use crate::signals::{MessageDefinition, SignalDatabase};
use crate::types::{Bus, CanFrame, InterfaceError, Result, SignalValues};
use serde::Serialize;
use std::collections::HashMap;

/// Number of expected periods a checked message may be missing before the
/// bus is reported invalid
const STALE_PERIODS: f64 = 5.0;

/// A signal the parser must provide: (signal, message, default)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSpec {
    pub signal: &'static str,
    pub message: &'static str,
    pub default: f64,
}

/// A message whose arrival rate is monitored: (message, expected Hz)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageCheck {
    pub message: &'static str,
    pub frequency_hz: f64,
}

/// Per-cycle view of one bus: every declared signal plus link health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusSignals {
    pub bus: Bus,
    /// Message name -> signal values
    pub messages: HashMap<String, SignalValues>,
    /// False while any checked message is missing or stale
    pub can_valid: bool,
}

impl BusSignals {
    /// Empty, valid snapshot
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            messages: HashMap::new(),
            can_valid: true,
        }
    }

    /// Builder method: set one signal value
    pub fn with(mut self, message: &str, signal: &str, value: f64) -> Self {
        self.set(message, signal, value);
        self
    }

    /// Builder method: set the link health flag
    pub fn with_can_valid(mut self, can_valid: bool) -> Self {
        self.can_valid = can_valid;
        self
    }

    pub fn set(&mut self, message: &str, signal: &str, value: f64) {
        self.messages
            .entry(message.to_string())
            .or_default()
            .insert(signal.to_string(), value);
    }

    /// Value of a declared signal
    ///
    /// An undeclared signal reads as 0 and is reported, since the catalog
    /// declarations and the estimator disagree.
    pub fn get(&self, message: &str, signal: &str) -> f64 {
        match self.messages.get(message).and_then(|m| m.get(signal)) {
            Some(value) => *value,
            None => {
                log::warn!("Undeclared signal {}.{} read on {} bus", message, signal, self.bus);
                0.0
            }
        }
    }

    /// Signal value interpreted as a flag
    pub fn flag(&self, message: &str, signal: &str) -> bool {
        self.get(message, signal) != 0.0
    }

    /// All values of one message (empty mapping if undeclared)
    pub fn message(&self, message: &str) -> SignalValues {
        self.messages.get(message).cloned().unwrap_or_default()
    }
}

/// Parser for one bus
#[derive(Debug, Clone)]
pub struct CanParser {
    bus: Bus,
    /// Declared messages by CAN ID, with the declared signal names
    messages: HashMap<u32, (MessageDefinition, Vec<&'static str>)>,
    /// CAN ID -> expected period in nanoseconds
    checks: HashMap<u32, f64>,
    /// CAN ID -> last receive time
    last_seen_ns: HashMap<u32, u64>,
    snapshot: BusSignals,
}

impl CanParser {
    /// Create a parser from declarations
    ///
    /// Every declared message and signal must exist in the database.
    pub fn new(
        db: &SignalDatabase,
        bus: Bus,
        signals: &[SignalSpec],
        checks: &[MessageCheck],
    ) -> Result<Self> {
        let mut messages: HashMap<u32, (MessageDefinition, Vec<&'static str>)> = HashMap::new();
        let mut snapshot = BusSignals::new(bus);

        for spec in signals {
            db.require_signal(spec.message, spec.signal)?;
            let message_def = db.require_message(spec.message)?;
            messages
                .entry(message_def.id)
                .or_insert_with(|| (message_def.clone(), Vec::new()))
                .1
                .push(spec.signal);
            snapshot.set(spec.message, spec.signal, spec.default);
        }

        let mut check_periods = HashMap::new();
        for check in checks {
            let message_def = db.require_message(check.message)?;
            if check.frequency_hz <= 0.0 {
                return Err(InterfaceError::InvalidSignalDefinition(format!(
                    "Check for {} needs a positive frequency",
                    check.message
                )));
            }
            check_periods.insert(message_def.id, 1e9 / check.frequency_hz);
        }

        log::info!(
            "CAN parser on {} bus: {} messages, {} signals, {} checks",
            bus,
            messages.len(),
            signals.len(),
            check_periods.len()
        );

        let mut parser = Self {
            bus,
            messages,
            checks: check_periods,
            last_seen_ns: HashMap::new(),
            snapshot,
        };
        parser.snapshot.can_valid = parser.compute_valid(0);
        Ok(parser)
    }

    pub fn bus(&self) -> Bus {
        self.bus
    }

    /// Decode this cycle's frames and refresh link health
    pub fn update(&mut self, frames: &[CanFrame], now_ns: u64) -> &BusSignals {
        let bus_number = self.bus.number();

        for frame in frames.iter().filter(|f| f.bus == bus_number) {
            let Some((message_def, declared)) = self.messages.get(&frame.address) else {
                continue;
            };

            // Malformed frames do not count as seen
            if frame.data.len() != message_def.size {
                log::warn!(
                    "{} on {} bus: {} bytes, expected {}; frame ignored",
                    message_def.name,
                    self.bus,
                    frame.data.len(),
                    message_def.size
                );
                continue;
            }

            let mut complete = true;
            for name in declared {
                let Some(signal) = message_def.signal(name) else {
                    continue;
                };
                match bitfield::extract(&frame.data, signal) {
                    Some(raw) => self.snapshot.set(&message_def.name, name, signal.to_physical(raw)),
                    None => complete = false,
                }
            }

            if complete {
                self.last_seen_ns.insert(frame.address, now_ns);
            } else {
                log::warn!("{} on {} bus: undecodable signals", message_def.name, self.bus);
            }
        }

        let can_valid = self.compute_valid(now_ns);
        if self.snapshot.can_valid && !can_valid {
            log::warn!("{} bus invalid: checked message missing or stale", self.bus);
        }
        self.snapshot.can_valid = can_valid;
        &self.snapshot
    }

    /// Latest decoded values
    pub fn signals(&self) -> &BusSignals {
        &self.snapshot
    }

    fn compute_valid(&self, now_ns: u64) -> bool {
        self.checks.iter().all(|(address, period_ns)| {
            match self.last_seen_ns.get(address) {
                Some(seen) => (now_ns.saturating_sub(*seen) as f64) <= STALE_PERIODS * period_ns,
                None => false,
            }
        })
    }
}
