//! State estimator
//!
//! Turns one cycle of decoded bus signals into a [`VehicleState`] snapshot:
//! wheel speeds and a filtered velocity/acceleration estimate, steering
//! sensors, edge-detectable blinkers, doors, cruise state, link health and
//! the stock messages the command synthesizer forwards.

use crate::can::BusSignals;
use crate::catalog::Catalog;
use crate::kalman::KalmanFilter1D;
use crate::types::SignalValues;
use crate::values::{CarVariant, ProtocolFamily};
use serde::Serialize;

/// Wheel speed signals are in km/h
pub const KPH_TO_MS: f64 = 1.0 / 3.6;

/// Below this raw speed (m/s) the vehicle is at a standstill
pub const STANDSTILL_THRESHOLD: f64 = 0.01;

/// Raw-vs-estimate gap (m/s) above which the filter is re-seeded
pub const DIVERGENCE_RESET_THRESHOLD: f64 = 2.0;

/// Driver torque magnitude above which the driver is overriding
pub const STEER_OVERRIDE_THRESHOLD: f64 = 2.0;

/// Per-wheel speed in m/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelSpeeds {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

impl WheelSpeeds {
    pub fn mean(&self) -> f64 {
        (self.fl + self.fr + self.rl + self.rr) / 4.0
    }
}

/// Link health of each bus segment, as reported by its parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkHealth {
    pub primary: bool,
    pub camera: bool,
    pub adas: bool,
}

impl LinkHealth {
    pub fn all_valid(&self) -> bool {
        self.primary && self.camera && self.adas
    }
}

/// A lamp sampled once per cycle, with last cycle's sample kept for edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Blinker {
    pub previous: bool,
    pub current: bool,
}

impl Blinker {
    /// Start a new cycle: current becomes previous
    fn shift(&mut self, current: bool) {
        self.previous = self.current;
        self.current = current;
    }

    pub fn rising_edge(&self) -> bool {
        self.current && !self.previous
    }

    pub fn falling_edge(&self) -> bool {
        !self.current && self.previous
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Doors {
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

impl Doors {
    pub fn any_open(&self) -> bool {
        self.front_left || self.front_right || self.rear_left || self.rear_right
    }
}

/// Native adaptive cruise control state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CruiseState {
    /// Main switch on
    pub main_on: bool,
    /// Cruise engaged
    pub active: bool,
    /// Set-speed shown by the stock system, km/h
    pub stock_set_speed: f64,
    /// Button code the stock system is sending (pre-global only)
    pub stock_button: u8,
}

/// Normalized vehicle state for one control cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleState {
    pub link: LinkHealth,

    pub wheel_speeds: WheelSpeeds,
    /// Mean wheel speed, m/s, never negative
    pub velocity_raw: f64,
    /// Filtered velocity, m/s, never negative
    pub velocity_estimate: f64,
    /// Filtered acceleration, m/s^2
    pub acceleration_estimate: f64,
    pub standstill: bool,

    pub steering_angle: f64,
    pub driver_torque: f64,
    pub steer_override: bool,

    pub left_blinker: Blinker,
    pub right_blinker: Blinker,

    pub doors: Doors,
    pub any_door_open: bool,

    pub cruise: CruiseState,
    /// Links up and doors closed: the stock cruise may be switched on
    pub ready: bool,

    /// Stock `ES_Distance` (global platform)
    pub es_distance_msg: SignalValues,
    /// Stock `ES_LKAS_State` (global platform)
    pub es_lkas_msg: SignalValues,
    /// Stock `ES_CruiseThrottle` (pre-global platform)
    pub es_throttle_msg: SignalValues,
    /// Stock steering command seen on the adas bus
    pub stock_lkas_msg: SignalValues,
}

impl VehicleState {
    /// Counter of a forwarded stock message, `None` when not received
    pub fn message_counter(msg: &SignalValues) -> Option<i64> {
        msg.get("Counter").map(|c| *c as i64)
    }
}

fn is_standstill(velocity_raw: f64) -> bool {
    velocity_raw < STANDSTILL_THRESHOLD
}

/// Owns the velocity filter and the edge-detection memory
#[derive(Debug, Clone)]
pub struct CarState {
    variant: CarVariant,
    catalog: &'static Catalog,
    v_ego_kf: KalmanFilter1D,
    state: VehicleState,
}

impl CarState {
    pub fn new(variant: CarVariant) -> Self {
        Self {
            variant,
            catalog: Catalog::for_family(variant.family()),
            v_ego_kf: KalmanFilter1D::velocity(),
            state: VehicleState::default(),
        }
    }

    pub fn variant(&self) -> CarVariant {
        self.variant
    }

    /// Latest snapshot
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Decode one cycle of signals
    ///
    /// Never fails: invalid links are only flagged, values fall back to the
    /// last received or declared defaults.
    pub fn update(&mut self, cp: &BusSignals, cp_adas: &BusSignals, cp_cam: &BusSignals) -> &VehicleState {
        let s = &mut self.state;

        s.link = LinkHealth {
            primary: cp.can_valid,
            camera: cp_cam.can_valid,
            adas: cp_adas.can_valid,
        };

        s.wheel_speeds = WheelSpeeds {
            fl: cp.get("Wheel_Speeds", "FL") * KPH_TO_MS,
            fr: cp.get("Wheel_Speeds", "FR") * KPH_TO_MS,
            rl: cp.get("Wheel_Speeds", "RL") * KPH_TO_MS,
            rr: cp.get("Wheel_Speeds", "RR") * KPH_TO_MS,
        };

        let v_wheel = s.wheel_speeds.mean().max(0.0);

        // Re-seed instead of integrating a large jump, e.g. when starting
        // while already moving. Compared against the raw filter state, which
        // may be below zero while the reported estimate is clamped.
        let v_ego_prev = self.v_ego_kf.state()[0];
        if (v_wheel - v_ego_prev).abs() > DIVERGENCE_RESET_THRESHOLD {
            log::debug!(
                "Velocity filter reset: raw {:.3} m/s vs estimate {:.3} m/s",
                v_wheel,
                v_ego_prev
            );
            self.v_ego_kf.reset([v_wheel, 0.0]);
        }

        s.velocity_raw = v_wheel;
        let [v_ego, a_ego] = self.v_ego_kf.update(v_wheel);
        s.velocity_estimate = v_ego.max(0.0);
        s.acceleration_estimate = a_ego;
        s.standstill = is_standstill(s.velocity_raw);

        let lights = self.catalog.lights_message;
        s.left_blinker.shift(cp.flag(lights, "LEFT_BLINKER"));
        s.right_blinker.shift(cp.flag(lights, "RIGHT_BLINKER"));

        s.driver_torque = cp.get("Steering_Torque", "Steer_Torque_Sensor");
        s.steering_angle = cp.get("Steering_Torque", "Steering_Angle");
        s.steer_override = s.driver_torque.abs() > STEER_OVERRIDE_THRESHOLD;

        s.doors = Doors {
            front_left: cp.flag("BodyInfo", "DOOR_OPEN_FL"),
            front_right: cp.flag("BodyInfo", "DOOR_OPEN_FR"),
            rear_left: cp.flag("BodyInfo", "DOOR_OPEN_RL"),
            rear_right: cp.flag("BodyInfo", "DOOR_OPEN_RR"),
        };
        s.any_door_open = s.doors.any_open();

        s.cruise.main_on = cp.flag("CruiseControl", "Cruise_On");
        s.cruise.active = cp.flag("CruiseControl", "Cruise_Activated");
        s.cruise.stock_set_speed = cp_cam.get("ES_DashStatus", "Cruise_Set_Speed");
        s.ready = s.link.primary && s.link.camera && !s.any_door_open;

        s.stock_lkas_msg = cp_adas.message("ES_LKAS");
        match self.variant.family() {
            ProtocolFamily::Global => {
                s.es_distance_msg = cp_cam.message("ES_Distance");
                s.es_lkas_msg = cp_cam.message("ES_LKAS_State");
            }
            ProtocolFamily::PreGlobal => {
                s.es_throttle_msg = cp_cam.message("ES_CruiseThrottle");
                s.cruise.stock_button = cp_cam.get("ES_CruiseThrottle", "Button") as u8;
            }
        }

        &self.state
    }
}
