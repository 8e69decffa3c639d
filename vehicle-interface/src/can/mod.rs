//! Catalog adapter: raw frames <-> named signal mappings
//!
//! The control core only talks to this module through [`BusSignals`] on the
//! way in and [`MessagePacker`] on the way out.

pub mod bitfield;
pub mod packer;
pub mod parser;

pub use packer::{CanPacker, MessagePacker};
pub use parser::{BusSignals, CanParser, MessageCheck, SignalSpec};
