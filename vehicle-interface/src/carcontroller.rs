//! Command synthesizer
//!
//! Produces the frames sent each control cycle: the rate-limited steering
//! command, the stock camera messages forwarded at their own cadence, and on
//! pre-global vehicles a synthesized cruise button that walks the stock set
//! speed toward the requested one.

use crate::can::{CanPacker, MessagePacker};
use crate::carstate::VehicleState;
use crate::limits::apply_std_steer_torque_limits;
use crate::subarucan;
use crate::types::{OutgoingFrame, Result, SignalValues, VisualAlert};
use crate::values::{CarControllerParams, CarVariant, ProtocolFamily};
use serde::{Deserialize, Serialize};

/// Frames between two evaluations of the button state machine
pub const BUTTON_STEP: u64 = 5;

/// Frames between two set-speed nudges
pub const BUTTON_NUDGE_PERIOD: u64 = 15;

/// Identical steering evaluations tolerated before the command is perturbed
pub const STEER_REPEAT_LIMIT: u32 = 50;

/// Scale applied to a steering command held for too long
const STEER_PERTURBATION: f64 = 0.99;

/// Set-speed gap (km/h) from which the deep button variants are used
const DEEP_PRESS_GAP: f64 = 10.0;

/// Speed (m/s) at or below which the vehicle counts as nearly stopped
const NEAR_STOP_SPEED: f64 = 1.0;

/// Per-cycle request from the planner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlRequest {
    pub enabled: bool,
    /// Steering actuator fraction in `[-1, 1]`
    pub steer: f64,
    pub cancel_requested: bool,
    pub visual_alert: VisualAlert,
    pub left_line: bool,
    pub right_line: bool,
    /// Cruise set-speed the stock system should be walked to, km/h
    pub target_set_speed: f64,
}

/// Button codes understood by the stock cruise control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CruiseButton {
    #[default]
    None = 0,
    Main = 1,
    /// Set, or slow down by 1
    SetShallow = 2,
    /// Set, or slow down by 10
    SetDeep = 3,
    /// Resume, or speed up by 1
    ResumeShallow = 4,
    /// Resume, or speed up by 10
    ResumeDeep = 5,
}

impl CruiseButton {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Memory carried from one cycle to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControllerState {
    /// Last emitted steering command
    pub apply_steer_last: i32,
    /// Consecutive enabled evaluations with an unchanged command
    pub repeat_count: u32,
    /// Counter of the last forwarded `ES_Distance`
    pub es_distance_cnt: Option<i64>,
    /// Counter of the last forwarded `ES_LKAS_State`
    pub es_lkas_cnt: Option<i64>,
    /// Button chosen last evaluation, before debouncing
    pub fake_button_prev: CruiseButton,
}

#[derive(Debug, Clone)]
pub struct CarController<P: MessagePacker = CanPacker> {
    variant: CarVariant,
    family: ProtocolFamily,
    params: CarControllerParams,
    packer: P,
    state: ControllerState,
}

/// Messages a family emits
fn emitted_messages(family: ProtocolFamily) -> &'static [&'static str] {
    match family {
        ProtocolFamily::Global => &["ES_LKAS", "ES_Distance", "ES_LKAS_State"],
        ProtocolFamily::PreGlobal => &["ES_LKAS", "ES_CruiseThrottle"],
    }
}

impl<P: MessagePacker> CarController<P> {
    /// Create a controller, checking the packer knows every emitted message
    pub fn new(variant: CarVariant, packer: P) -> Result<Self> {
        let family = variant.family();
        for message in emitted_messages(family) {
            packer.address(message)?;
        }

        let params = CarControllerParams::new(variant);
        log::info!("Car controller for {} ({:?}): {:?}", variant, family, params);

        Ok(Self {
            variant,
            family,
            params,
            packer,
            state: ControllerState::default(),
        })
    }

    pub fn variant(&self) -> CarVariant {
        self.variant
    }

    pub fn params(&self) -> &CarControllerParams {
        &self.params
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Run one control cycle, returning the frames to send in order
    pub fn update(
        &mut self,
        cs: &VehicleState,
        frame: u64,
        request: &ControlRequest,
    ) -> Result<Vec<OutgoingFrame>> {
        let mut can_sends = Vec::new();

        if frame % self.params.steer_step == 0 {
            let apply_steer = self.steering_command(cs, request);
            can_sends.push(subarucan::create_steering_control(
                &self.packer,
                self.family,
                apply_steer,
                frame,
                self.params.steer_step,
            )?);
            self.state.apply_steer_last = apply_steer;
        }

        if self.family == ProtocolFamily::Global {
            if let Some(cnt) = changed_counter(&cs.es_distance_msg, self.state.es_distance_cnt) {
                can_sends.push(subarucan::create_es_distance(
                    &self.packer,
                    &cs.es_distance_msg,
                    request.cancel_requested,
                )?);
                self.state.es_distance_cnt = Some(cnt);
            }

            if let Some(cnt) = changed_counter(&cs.es_lkas_msg, self.state.es_lkas_cnt) {
                can_sends.push(subarucan::create_es_lkas(
                    &self.packer,
                    &cs.es_lkas_msg,
                    request.visual_alert,
                    request.left_line,
                    request.right_line,
                )?);
                self.state.es_lkas_cnt = Some(cnt);
            }
        }

        if self.family == ProtocolFamily::PreGlobal && frame % BUTTON_STEP == 0 {
            let button = self.cruise_button(cs, frame, request);
            can_sends.push(subarucan::create_es_throttle_control(
                &self.packer,
                frame,
                &cs.es_throttle_msg,
                button.code(),
            )?);
        }

        Ok(can_sends)
    }

    /// Limited steering command for this evaluation
    fn steering_command(&mut self, cs: &VehicleState, request: &ControlRequest) -> i32 {
        let final_steer = if request.enabled { request.steer } else { 0.0 };
        let apply_steer = (final_steer * f64::from(self.params.steer_max)).round() as i32;

        let mut apply_steer = apply_std_steer_torque_limits(
            apply_steer,
            self.state.apply_steer_last,
            cs.driver_torque,
            &self.params,
        );

        if !request.enabled {
            apply_steer = 0;
        }

        // The pre-global EPS faults on a torque held constant for over a second
        if self.family == ProtocolFamily::PreGlobal {
            if request.enabled && apply_steer == self.state.apply_steer_last {
                self.state.repeat_count += 1;
                if self.state.repeat_count == STEER_REPEAT_LIMIT {
                    let perturbed = (f64::from(apply_steer) * STEER_PERTURBATION).round() as i32;
                    log::debug!(
                        "Steer held at {} for {} updates, perturbing to {}",
                        apply_steer,
                        STEER_REPEAT_LIMIT,
                        perturbed
                    );
                    apply_steer = perturbed;
                    self.state.repeat_count = 0;
                }
            } else {
                self.state.repeat_count = 0;
            }
        }

        apply_steer
    }

    /// Button press for this evaluation of the state machine
    fn cruise_button(&mut self, cs: &VehicleState, frame: u64, request: &ControlRequest) -> CruiseButton {
        let mut button = CruiseButton::None;

        let moving = cs.velocity_raw > NEAR_STOP_SPEED;
        if request.enabled && moving && frame % BUTTON_NUDGE_PERIOD == 0 {
            let stock = cs.cruise.stock_set_speed;
            let target = request.target_set_speed;
            if stock != target {
                // Sequential on purpose: a later match overwrites an earlier one
                if target - stock >= DEEP_PRESS_GAP {
                    button = CruiseButton::ResumeDeep;
                }
                if 0.0 < target - stock && target - stock < DEEP_PRESS_GAP {
                    button = CruiseButton::ResumeShallow;
                }
                if stock - target >= DEEP_PRESS_GAP {
                    button = CruiseButton::SetDeep;
                }
                if 0.0 < stock - target && stock - target < DEEP_PRESS_GAP {
                    button = CruiseButton::SetShallow;
                }
            }
        }

        if request.cancel_requested {
            button = CruiseButton::Main;
        }
        if !cs.cruise.main_on && cs.ready {
            button = CruiseButton::Main;
        }

        let candidate = button;
        if button != CruiseButton::None && button == self.state.fake_button_prev {
            button = CruiseButton::None;
        }

        if request.enabled && !moving {
            button = CruiseButton::SetShallow;
        }

        self.state.fake_button_prev = candidate;
        if button != CruiseButton::None {
            log::debug!("Frame {}: pressing {:?}", frame, button);
        }
        button
    }
}

/// Counter of `msg` when it differs from the last forwarded one
fn changed_counter(msg: &SignalValues, last: Option<i64>) -> Option<i64> {
    match VehicleState::message_counter(msg) {
        Some(cnt) if Some(cnt) != last => Some(cnt),
        _ => None,
    }
}
