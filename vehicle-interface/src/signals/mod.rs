//! Signal database and DBC parser
//!
//! This module contains the DBC loader and the signal database it fills.

pub mod database;
pub mod dbc;

// Re-export key types for convenience
pub use database::{
    ByteOrder, DatabaseStats, MessageDefinition, SignalDatabase, SignalDefinition, ValueType,
};
pub use dbc::{load_dbc_file, parse_dbc_file, parse_dbc_str};
