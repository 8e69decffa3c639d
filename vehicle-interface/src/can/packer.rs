//! Message packing
//!
//! Renders a named signal mapping into raw frame bytes using the signal
//! catalog. This is the write half of the catalog adapter.

use crate::can::bitfield;
use crate::signals::SignalDatabase;
use crate::types::{CanFrame, InterfaceError, OutgoingFrame, Result, SignalValues};

/// Contract the frame builders rely on to render payloads
///
/// Checksums are computed over the rendered bytes, so frame construction
/// needs both the address and the byte layout of a message.
pub trait MessagePacker {
    /// CAN ID of a named message
    fn address(&self, message: &str) -> Result<u32>;

    /// Encode a signal mapping; signals not supplied are zero
    fn pack(&self, message: &str, values: &SignalValues) -> Result<Vec<u8>>;
}

/// Packer backed by a signal database
#[derive(Debug, Clone)]
pub struct CanPacker {
    db: SignalDatabase,
}

impl CanPacker {
    pub fn new(db: &SignalDatabase) -> Self {
        Self { db: db.clone() }
    }

    /// Render an outgoing frame description into a raw CAN frame
    pub fn make_can_msg(&self, frame: &OutgoingFrame) -> Result<CanFrame> {
        let address = self.address(&frame.message)?;
        let data = self.pack(&frame.message, &frame.values)?;
        log::trace!("Packed {} (0x{:X}) on {}: {:02X?}", frame.message, address, frame.bus, data);
        Ok(CanFrame::new(address, frame.bus.number(), data))
    }
}

impl MessagePacker for CanPacker {
    fn address(&self, message: &str) -> Result<u32> {
        Ok(self.db.require_message(message)?.id)
    }

    fn pack(&self, message: &str, values: &SignalValues) -> Result<Vec<u8>> {
        let message_def = self.db.require_message(message)?;
        let mut data = vec![0u8; message_def.size];

        for (name, value) in values {
            let signal = message_def
                .signal(name)
                .ok_or_else(|| InterfaceError::SignalNotFound {
                    message: message.to_string(),
                    signal: name.clone(),
                })?;
            bitfield::insert(&mut data, signal, signal.to_raw(*value));
        }

        Ok(data)
    }
}
