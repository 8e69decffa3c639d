//! Vehicle variants and their tuned constants
//!
//! **WARNING**
//!
//! The limiter values listed here bound how fast and how hard the steering
//! actuator may be driven. Changing them risks commanding torque outside of
//! what the vehicle's steering ECU accepts, which faults the lane keeping
//! system until the next ignition cycle.

use crate::types::InterfaceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported vehicles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CarVariant {
    /// Impreza 2017+, global platform
    Impreza,
    /// Outback 2015-2017 with EyeSight, pre-global platform
    Outback,
    /// Legacy 2015-2017 with EyeSight, pre-global platform
    Legacy,
}

/// Protocol family of a variant: checksum and counter conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFamily {
    /// Address-salted checksum over bytes 1.., 4-bit counters
    Global,
    /// Plain sum over bytes 0..7, 3-bit counters
    PreGlobal,
}

impl ProtocolFamily {
    /// Modulus of the rolling counter
    pub fn counter_modulus(self) -> u64 {
        match self {
            ProtocolFamily::Global => 16,
            ProtocolFamily::PreGlobal => 8,
        }
    }
}

impl CarVariant {
    pub const ALL: [CarVariant; 3] = [CarVariant::Impreza, CarVariant::Outback, CarVariant::Legacy];

    pub fn family(self) -> ProtocolFamily {
        match self {
            CarVariant::Impreza => ProtocolFamily::Global,
            CarVariant::Outback | CarVariant::Legacy => ProtocolFamily::PreGlobal,
        }
    }

    /// Name of the signal catalog this variant is described by
    pub fn dbc_name(self) -> &'static str {
        match self.family() {
            ProtocolFamily::Global => "subaru_global_2017",
            ProtocolFamily::PreGlobal => "subaru_outback_2015_eyesight",
        }
    }
}

impl fmt::Display for CarVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarVariant::Impreza => write!(f, "IMPREZA"),
            CarVariant::Outback => write!(f, "OUTBACK"),
            CarVariant::Legacy => write!(f, "LEGACY"),
        }
    }
}

impl FromStr for CarVariant {
    type Err = InterfaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IMPREZA" => Ok(CarVariant::Impreza),
            "OUTBACK" => Ok(CarVariant::Outback),
            "LEGACY" => Ok(CarVariant::Legacy),
            _ => Err(InterfaceError::UnknownVariant(s.to_string())),
        }
    }
}

/// Steering limiter constants, in integer torque units per steering update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CarControllerParams {
    /// Maximum commanded torque magnitude
    pub steer_max: i32,
    /// Frames between steering updates
    pub steer_step: u64,
    /// Max change per update when moving away from zero
    pub steer_delta_up: i32,
    /// Max change per update when moving toward zero
    pub steer_delta_down: i32,
    /// Driver torque tolerated before the limit starts shrinking
    pub steer_driver_allowance: i32,
    /// Weight of driver torque beyond the allowance
    pub steer_driver_multiplier: i32,
    /// Driver torque signal scale, from the catalog
    pub steer_driver_factor: i32,
}

impl CarControllerParams {
    pub fn new(variant: CarVariant) -> Self {
        let (allowance, multiplier, factor) = match variant.family() {
            ProtocolFamily::Global => (60, 10, 1),
            ProtocolFamily::PreGlobal => (600, 1, 1),
        };

        Self {
            steer_max: 2047,
            steer_step: 2,
            steer_delta_up: 60,
            steer_delta_down: 60,
            steer_driver_allowance: allowance,
            steer_driver_multiplier: multiplier,
            steer_driver_factor: factor,
        }
    }
}
