//! Vehicle interface
//!
//! Ties the catalog adapter to the control core. One [`CarInterface::step`]
//! is one control cycle: parse the received frames of all three buses,
//! update the state estimate, synthesize commands and render them.

use crate::can::{CanPacker, CanParser};
use crate::carcontroller::{CarController, ControlRequest};
use crate::carstate::{CarState, VehicleState};
use crate::catalog::Catalog;
use crate::config::InterfaceConfig;
use crate::signals::{self, DatabaseStats, SignalDatabase};
use crate::types::{CanFrame, Result};
use crate::values::CarVariant;

/// Result of one control cycle
#[derive(Debug)]
pub struct StepOutput<'a> {
    /// Frames to transmit, in send order
    pub can_sends: Vec<CanFrame>,
    /// State estimate the commands were computed from
    pub state: &'a VehicleState,
}

#[derive(Debug)]
pub struct CarInterface {
    variant: CarVariant,
    database: SignalDatabase,
    cp: CanParser,
    cp_adas: CanParser,
    cp_cam: CanParser,
    packer: CanPacker,
    car_state: CarState,
    controller: CarController,
}

impl CarInterface {
    /// Load the configured catalog and build the interface
    pub fn new(config: &InterfaceConfig) -> Result<Self> {
        let db = signals::load_dbc_file(&config.dbc_file())?;
        Self::from_database(config.variant, db)
    }

    /// Build the interface against an already loaded catalog
    pub fn from_database(variant: CarVariant, database: SignalDatabase) -> Result<Self> {
        let catalog = Catalog::for_family(variant.family());
        let parsers = catalog.parsers(&database)?;
        let packer = CanPacker::new(&database);
        let controller = CarController::new(variant, packer.clone())?;

        let stats = database.stats();
        log::info!(
            "Interface for {} ready: {} messages, {} signals",
            variant,
            stats.num_messages,
            stats.num_signals
        );

        Ok(Self {
            variant,
            database,
            cp: parsers.primary,
            cp_adas: parsers.adas,
            cp_cam: parsers.camera,
            packer,
            car_state: CarState::new(variant),
            controller,
        })
    }

    pub fn variant(&self) -> CarVariant {
        self.variant
    }

    /// Loaded signal catalog
    pub fn database(&self) -> &SignalDatabase {
        &self.database
    }

    pub fn database_stats(&self) -> DatabaseStats {
        self.database.stats()
    }

    /// Packer over the loaded catalog
    pub fn packer(&self) -> &CanPacker {
        &self.packer
    }

    pub fn controller(&self) -> &CarController {
        &self.controller
    }

    /// Run one control cycle over the frames received since the last one
    pub fn step(
        &mut self,
        frames: &[CanFrame],
        now_ns: u64,
        frame: u64,
        request: &ControlRequest,
    ) -> Result<StepOutput<'_>> {
        let cp = self.cp.update(frames, now_ns);
        let cp_adas = self.cp_adas.update(frames, now_ns);
        let cp_cam = self.cp_cam.update(frames, now_ns);
        let state = self.car_state.update(cp, cp_adas, cp_cam);

        let commands = self.controller.update(state, frame, request)?;
        let can_sends = commands
            .iter()
            .map(|command| self.packer.make_can_msg(command))
            .collect::<Result<Vec<_>>>()?;

        log::trace!("Frame {}: {} frames out", frame, can_sends.len());

        Ok(StepOutput { can_sends, state })
    }
}
