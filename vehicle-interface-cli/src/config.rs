//! Scenario configuration loading and parsing

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vehicle_interface::CarVariant;

/// Drive scenario (loaded from scenario.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub steer: SteerProfile,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehicleConfig {
    pub variant: CarVariant,
    /// DBC file; the bundled catalog for the variant when absent
    pub dbc: Option<PathBuf>,
}

/// Simulated vehicle behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Control cycles to run at 100 Hz
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    #[serde(default = "default_wheel_speed")]
    pub wheel_speed_kph: f64,
    /// Constant driver torque on the steering column
    #[serde(default)]
    pub driver_torque: f64,
    /// Set-speed reported by the stock cruise control
    #[serde(default = "default_set_speed")]
    pub stock_set_speed: f64,
    /// Set-speed the stock cruise control is walked to
    #[serde(default = "default_set_speed")]
    pub target_set_speed: f64,
    #[serde(default = "default_true")]
    pub cruise_main_on: bool,
}

/// Steering request: a sine wave inside an enable window
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SteerProfile {
    /// Peak actuator fraction
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_period")]
    pub period_s: f64,
    #[serde(default = "default_enable_at")]
    pub enable_at_s: f64,
    pub disable_at_s: Option<f64>,
    /// Request a cruise cancel from this time on
    pub cancel_at_s: Option<f64>,
}

fn default_cycles() -> u64 {
    1000
}

fn default_wheel_speed() -> f64 {
    60.0
}

fn default_set_speed() -> f64 {
    80.0
}

fn default_true() -> bool {
    true
}

fn default_amplitude() -> f64 {
    0.3
}

fn default_period() -> f64 {
    4.0
}

fn default_enable_at() -> f64 {
    0.5
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            wheel_speed_kph: default_wheel_speed(),
            driver_torque: 0.0,
            stock_set_speed: default_set_speed(),
            target_set_speed: default_set_speed(),
            cruise_main_on: true,
        }
    }
}

impl Default for SteerProfile {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            period_s: default_period(),
            enable_at_s: default_enable_at(),
            disable_at_s: None,
            cancel_at_s: None,
        }
    }
}

impl ScenarioConfig {
    /// Default scenario for a variant
    pub fn for_variant(variant: CarVariant) -> Self {
        Self {
            vehicle: VehicleConfig { variant, dbc: None },
            run: RunConfig::default(),
            steer: SteerProfile::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.cycles == 0 {
            bail!("run.cycles must be at least 1");
        }
        if !(-1.0..=1.0).contains(&self.steer.amplitude) {
            bail!("steer.amplitude must be within [-1, 1], got {}", self.steer.amplitude);
        }
        if self.steer.period_s <= 0.0 {
            bail!("steer.period_s must be positive, got {}", self.steer.period_s);
        }
        if self.run.wheel_speed_kph < 0.0 {
            bail!("run.wheel_speed_kph must not be negative");
        }
        if let Some(disable_at) = self.steer.disable_at_s {
            if disable_at < self.steer.enable_at_s {
                bail!("steer.disable_at_s is before steer.enable_at_s");
            }
        }
        Ok(())
    }
}

/// Load a scenario from a TOML file
pub fn load_config(path: &Path) -> Result<ScenarioConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {:?}", path))?;

    let config: ScenarioConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse scenario file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid scenario file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [vehicle]
            variant = "OUTBACK"
            dbc = "dbc/subaru_outback_2015_eyesight.dbc"

            [run]
            cycles = 300
            wheel_speed_kph = 30.0

            [steer]
            amplitude = 0.5
            cancel_at_s = 2.0
        "#;

        let config: ScenarioConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.vehicle.variant, CarVariant::Outback);
        assert_eq!(config.run.cycles, 300);
        assert_eq!(config.run.stock_set_speed, 80.0);
        assert!(config.run.cruise_main_on);
        assert_eq!(config.steer.amplitude, 0.5);
        assert_eq!(config.steer.period_s, 4.0);
        assert_eq!(config.steer.cancel_at_s, Some(2.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ScenarioConfig = toml::from_str("[vehicle]\nvariant = \"IMPREZA\"\n").unwrap();
        assert_eq!(config.vehicle.dbc, None);
        assert_eq!(config.run.cycles, 1000);
        assert_eq!(config.steer.enable_at_s, 0.5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ScenarioConfig::for_variant(CarVariant::Impreza);
        config.steer.amplitude = 1.5;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::for_variant(CarVariant::Impreza);
        config.steer.disable_at_s = Some(0.1);
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::for_variant(CarVariant::Impreza);
        config.run.cycles = 0;
        assert!(config.validate().is_err());
    }
}
