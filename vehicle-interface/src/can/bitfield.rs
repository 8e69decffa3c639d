//! Bit-level signal access
//!
//! Reads and writes raw signal values inside a frame payload. Handles both
//! DBC byte orders and sign extension. Physical scaling lives with the
//! signal definition.

use crate::signals::database::{ByteOrder, SignalDefinition, ValueType};

/// Number of payload bytes a signal touches, used to validate frame length
pub fn required_bytes(signal: &SignalDefinition) -> usize {
    bit_positions(signal.start_bit as usize, signal.length as usize, signal.byte_order)
        .map(|pos| pos / 8 + 1)
        .max()
        .unwrap_or(0)
}

/// Extract a raw (sign-extended) value from frame data
///
/// Returns `None` when the signal does not fit the payload.
pub fn extract(data: &[u8], signal: &SignalDefinition) -> Option<i64> {
    let length = signal.length as usize;
    if required_bytes(signal) > data.len() {
        log::warn!(
            "Signal '{}' requires {} bytes but frame only has {} bytes",
            signal.name,
            required_bytes(signal),
            data.len()
        );
        return None;
    }

    let mut raw: u64 = 0;
    for (i, pos) in bit_positions(signal.start_bit as usize, length, signal.byte_order).enumerate() {
        let bit = (data[pos / 8] >> (pos % 8)) & 0x01;
        raw |= (bit as u64) << significance(i, length, signal.byte_order);
    }

    Some(match signal.value_type {
        ValueType::Unsigned => raw as i64,
        ValueType::Signed => sign_extend(raw, length),
    })
}

/// Write a raw value into frame data, truncated to the signal width
///
/// Bits outside the payload are dropped.
pub fn insert(data: &mut [u8], signal: &SignalDefinition, raw: i64) {
    let length = signal.length as usize;
    let value = raw as u64;

    for (i, pos) in bit_positions(signal.start_bit as usize, length, signal.byte_order).enumerate() {
        let byte_idx = pos / 8;
        if byte_idx >= data.len() {
            continue;
        }
        let bit = (value >> significance(i, length, signal.byte_order)) & 0x01;
        let mask = 1u8 << (pos % 8);
        if bit == 1 {
            data[byte_idx] |= mask;
        } else {
            data[byte_idx] &= !mask;
        }
    }
}

/// Payload bit positions (byte * 8 + bit, bit 0 = LSB) in traversal order
///
/// Little-endian signals are walked from their LSB upwards. Big-endian
/// signals start at their MSB and follow the DBC sawtooth: down within a
/// byte, then to bit 7 of the next byte.
fn bit_positions(start_bit: usize, length: usize, byte_order: ByteOrder) -> impl Iterator<Item = usize> {
    let mut pos = start_bit;
    (0..length).map(move |i| match byte_order {
        ByteOrder::LittleEndian => start_bit + i,
        ByteOrder::BigEndian => {
            let current = pos;
            pos = if pos % 8 == 0 { pos + 15 } else { pos - 1 };
            current
        }
    })
}

/// Bit significance of the i-th traversed bit
fn significance(i: usize, length: usize, byte_order: ByteOrder) -> usize {
    match byte_order {
        ByteOrder::LittleEndian => i,
        ByteOrder::BigEndian => length - 1 - i,
    }
}

/// Sign-extend a value from N bits to 64 bits
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        let mask = !0u64 << bit_length;
        (value | mask) as i64
    } else {
        value as i64
    }
}
