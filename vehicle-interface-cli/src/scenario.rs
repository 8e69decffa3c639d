//! Synthetic stock bus traffic
//!
//! Generates what the vehicle and its stock camera would put on the bus
//! during a steady drive, each message at its nominal rate, plus the
//! planner's request for every cycle.

use crate::config::ScenarioConfig;
use std::f64::consts::PI;
use thiserror::Error;
use vehicle_interface::{
    Bus, CanFrame, CanPacker, CarVariant, ControlRequest, InterfaceError, OutgoingFrame, ProtocolFamily,
    SignalValues,
};

/// Control loop rate
pub const CYCLE_HZ: f64 = 100.0;

/// Nanoseconds per control cycle
pub const CYCLE_NS: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Cannot render stock {message} frame: {source}")]
    Render {
        message: &'static str,
        #[source]
        source: InterfaceError,
    },
}

/// One stock message and how often it is sent
struct StockMessage {
    name: &'static str,
    bus: Bus,
    /// Cycles between two frames
    period: u64,
    /// Whether it carries a rolling counter
    counted: bool,
}

const fn stock(name: &'static str, bus: Bus, period: u64, counted: bool) -> StockMessage {
    StockMessage {
        name,
        bus,
        period,
        counted,
    }
}

const GLOBAL_TRAFFIC: &[StockMessage] = &[
    stock("Wheel_Speeds", Bus::Primary, 2, false),
    stock("Steering_Torque", Bus::Primary, 2, false),
    stock("Dashlights", Bus::Primary, 10, false),
    stock("BodyInfo", Bus::Primary, 10, false),
    stock("CruiseControl", Bus::Primary, 5, false),
    stock("ES_Distance", Bus::Camera, 5, true),
    stock("ES_LKAS_State", Bus::Camera, 10, true),
    stock("ES_DashStatus", Bus::Camera, 10, true),
];

const PRE_GLOBAL_TRAFFIC: &[StockMessage] = &[
    stock("Wheel_Speeds", Bus::Primary, 2, false),
    stock("Steering_Torque", Bus::Primary, 2, false),
    stock("Dash_State", Bus::Primary, 10, false),
    stock("BodyInfo", Bus::Primary, 10, false),
    stock("CruiseControl", Bus::Primary, 5, false),
    stock("ES_CruiseThrottle", Bus::Camera, 5, true),
    stock("ES_DashStatus", Bus::Camera, 5, true),
];

pub struct Scenario {
    config: ScenarioConfig,
    family: ProtocolFamily,
    packer: CanPacker,
}

impl Scenario {
    pub fn new(config: ScenarioConfig, packer: CanPacker) -> Self {
        let family = config.vehicle.variant.family();
        Self {
            config,
            family,
            packer,
        }
    }

    pub fn variant(&self) -> CarVariant {
        self.config.vehicle.variant
    }

    pub fn cycles(&self) -> u64 {
        self.config.run.cycles
    }

    /// Simulated time of a cycle in nanoseconds
    pub fn time_ns(cycle: u64) -> u64 {
        cycle * CYCLE_NS
    }

    /// Frames the stock system sends during `cycle`
    pub fn traffic(&self, cycle: u64) -> Result<Vec<CanFrame>, ScenarioError> {
        let messages = match self.family {
            ProtocolFamily::Global => GLOBAL_TRAFFIC,
            ProtocolFamily::PreGlobal => PRE_GLOBAL_TRAFFIC,
        };

        let mut frames = Vec::new();
        for msg in messages.iter().filter(|m| cycle % m.period == 0) {
            let mut values = self.values(msg.name);
            if msg.counted {
                let counter = (cycle / msg.period) % self.family.counter_modulus();
                values.insert("Counter".to_string(), counter as f64);
            }

            let frame = self
                .packer
                .make_can_msg(&OutgoingFrame::new(msg.name, msg.bus, values))
                .map_err(|source| ScenarioError::Render {
                    message: msg.name,
                    source,
                })?;
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Signal values of a stock message; everything else stays zero
    fn values(&self, message: &str) -> SignalValues {
        let run = &self.config.run;
        let mut values = SignalValues::new();
        let mut set = |signal: &str, value: f64| {
            values.insert(signal.to_string(), value);
        };

        match message {
            "Wheel_Speeds" => {
                for wheel in ["FL", "FR", "RL", "RR"] {
                    set(wheel, run.wheel_speed_kph);
                }
            }
            "Steering_Torque" => set("Steer_Torque_Sensor", run.driver_torque),
            "CruiseControl" => {
                set("Cruise_On", if run.cruise_main_on { 1.0 } else { 0.0 });
                set("Cruise_Activated", if run.cruise_main_on { 1.0 } else { 0.0 });
            }
            "ES_DashStatus" => set("Cruise_Set_Speed", run.stock_set_speed),
            _ => {}
        }
        values
    }

    /// Planner request for `cycle`
    pub fn request(&self, cycle: u64) -> ControlRequest {
        let steer = &self.config.steer;
        let t = cycle as f64 / CYCLE_HZ;

        let enabled = t >= steer.enable_at_s && steer.disable_at_s.map_or(true, |end| t < end);
        let cancel_requested = steer.cancel_at_s.map_or(false, |at| t >= at);

        ControlRequest {
            enabled: enabled && !cancel_requested,
            steer: steer.amplitude * (2.0 * PI * t / steer.period_s).sin(),
            cancel_requested,
            left_line: enabled,
            right_line: enabled,
            target_set_speed: self.config.run.target_set_speed,
            ..Default::default()
        }
    }
}
