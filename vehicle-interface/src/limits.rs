//! Standard steering torque limiter
//!
//! Bounds a requested torque by magnitude, by rate of change relative to the
//! previous command, and by how hard the driver is steering against it.

use crate::values::CarControllerParams;

/// Command range allowed given the driver's torque: `(min, max)`
///
/// Driver torque beyond the allowance shrinks the range on the side that
/// opposes the driver by `(|driver| - allowance) * multiplier` (with the
/// catalog factor applied to the driver torque), so the command yields
/// instead of fighting the driver.
pub fn driver_torque_limits(driver_torque: f64, params: &CarControllerParams) -> (f64, f64) {
    let steer_max = params.steer_max as f64;
    let allowance = params.steer_driver_allowance as f64;
    let multiplier = params.steer_driver_multiplier as f64;
    let factor = params.steer_driver_factor as f64;

    let driver_max_torque = steer_max + (allowance + driver_torque * factor) * multiplier;
    let driver_min_torque = -steer_max + (-allowance + driver_torque * factor) * multiplier;

    let max_steer_allowed = driver_max_torque.min(steer_max).max(0.0);
    let min_steer_allowed = driver_min_torque.max(-steer_max).min(0.0);
    (min_steer_allowed, max_steer_allowed)
}

/// Limit `apply_torque` against the last command and the driver torque
pub fn apply_std_steer_torque_limits(
    apply_torque: i32,
    apply_torque_last: i32,
    driver_torque: f64,
    params: &CarControllerParams,
) -> i32 {
    let (min_steer_allowed, max_steer_allowed) = driver_torque_limits(driver_torque, params);
    let mut torque = (apply_torque as f64).clamp(min_steer_allowed, max_steer_allowed);

    let last = apply_torque_last as f64;
    let delta_up = params.steer_delta_up as f64;
    let delta_down = params.steer_delta_down as f64;

    // slow rate if steer torque increases in magnitude
    torque = if last > 0.0 {
        torque.clamp((last - delta_down).max(-delta_up), last + delta_up)
    } else {
        torque.clamp(last - delta_up, (last + delta_down).min(delta_up))
    };

    torque.round() as i32
}
