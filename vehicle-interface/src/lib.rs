//! Vehicle Interface Library
//!
//! Lateral control interface for Subaru vehicles with EyeSight: turns raw
//! CAN traffic into a normalized vehicle state estimate and turns a steering
//! request back into the frames the vehicle expects.
//!
//! # Architecture
//!
//! - [`carstate`]: state estimator (wheel speed filtering, blinkers, doors,
//!   cruise state, stock messages to forward)
//! - [`carcontroller`]: command synthesizer (torque rate limiting, anti-fault
//!   perturbation, stock message passthrough, virtual cruise buttons)
//! - [`subarucan`]: frame builders with the two checksum conventions
//! - [`can`], [`signals`], [`catalog`]: the catalog adapter mapping raw
//!   frames to named signals using DBC definitions
//!
//! The core runs single threaded, one state update and one command update
//! per control cycle, at about 100 Hz.
//!
//! # Example Usage
//!
//! ```no_run
//! use vehicle_interface::{CarInterface, CarVariant, ControlRequest, InterfaceConfig};
//!
//! let config = InterfaceConfig::new(CarVariant::Impreza).with_dbc_dir("dbc");
//! let mut interface = CarInterface::new(&config).unwrap();
//!
//! let request = ControlRequest {
//!     enabled: true,
//!     steer: 0.25,
//!     ..Default::default()
//! };
//!
//! // frames received since the previous cycle
//! let received = Vec::new();
//! let output = interface.step(&received, 10_000_000, 1, &request).unwrap();
//! println!("{} frames to send, v_ego {:.2}", output.can_sends.len(), output.state.velocity_estimate);
//! ```

// Public modules
pub mod can;
pub mod carcontroller;
pub mod carstate;
pub mod catalog;
pub mod config;
pub mod interface;
pub mod kalman;
pub mod limits;
pub mod signals;
pub mod subarucan;
pub mod types;
pub mod values;

// Re-export main types for convenience
pub use can::{BusSignals, CanPacker, CanParser, MessagePacker};
pub use carcontroller::{CarController, ControlRequest, ControllerState, CruiseButton};
pub use carstate::{CarState, VehicleState};
pub use config::InterfaceConfig;
pub use interface::{CarInterface, StepOutput};
pub use signals::{DatabaseStats, SignalDatabase};
pub use types::{Bus, CanFrame, InterfaceError, OutgoingFrame, Result, SignalValues, VisualAlert};
pub use values::{CarControllerParams, CarVariant, ProtocolFamily};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
