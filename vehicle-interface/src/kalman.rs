//! Constant-gain Kalman filter for a scalar observation
//!
//! State is `[value, rate]` with a constant-rate transition
//! `value' = value + dt * rate`, and only `value` is observed. The gain is a
//! pre-tuned constant: no covariance is tracked and nothing is re-estimated
//! at runtime. Downstream tuning assumes exactly this gain.

/// Velocity filter time step, seconds
pub const VELOCITY_DT: f64 = 0.01;

/// Steady-state gain of the velocity filter, `[velocity, acceleration]`
pub const VELOCITY_GAIN: [f64; 2] = [0.122_876_73, 0.296_663_09];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanFilter1D {
    x: [f64; 2],
    dt: f64,
    k: [f64; 2],
}

impl KalmanFilter1D {
    pub fn new(x0: [f64; 2], dt: f64, k: [f64; 2]) -> Self {
        Self { x: x0, dt, k }
    }

    /// Wheel-speed velocity filter starting at rest
    pub fn velocity() -> Self {
        Self::new([0.0, 0.0], VELOCITY_DT, VELOCITY_GAIN)
    }

    /// Current `[value, rate]`
    pub fn state(&self) -> [f64; 2] {
        self.x
    }

    /// Overwrite the state vector
    pub fn reset(&mut self, x: [f64; 2]) {
        self.x = x;
    }

    /// Predict one step, correct with `measurement`, return the new state
    pub fn update(&mut self, measurement: f64) -> [f64; 2] {
        let predicted = [self.x[0] + self.dt * self.x[1], self.x[1]];
        let innovation = measurement - predicted[0];
        self.x = [
            predicted[0] + self.k[0] * innovation,
            predicted[1] + self.k[1] * innovation,
        ];
        self.x
    }
}

impl Default for KalmanFilter1D {
    fn default() -> Self {
        Self::velocity()
    }
}
