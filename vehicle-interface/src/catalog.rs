//! Signal declarations per protocol family
//!
//! Lists, for each bus, the signals the state estimator reads (with the
//! value assumed until the first frame arrives) and the messages whose
//! arrival rate decides link health.

use crate::can::{CanParser, MessageCheck, SignalSpec};
use crate::signals::SignalDatabase;
use crate::types::{Bus, Result};
use crate::values::ProtocolFamily;

macro_rules! sig {
    ($signal:literal, $message:literal, $default:expr) => {
        SignalSpec {
            signal: $signal,
            message: $message,
            default: $default,
        }
    };
}

macro_rules! check {
    ($message:literal, $hz:expr) => {
        MessageCheck {
            message: $message,
            frequency_hz: $hz,
        }
    };
}

/// Declarations of one protocol family
#[derive(Debug)]
pub struct Catalog {
    pub family: ProtocolFamily,
    pub primary_signals: &'static [SignalSpec],
    pub primary_checks: &'static [MessageCheck],
    pub adas_signals: &'static [SignalSpec],
    pub adas_checks: &'static [MessageCheck],
    pub camera_signals: &'static [SignalSpec],
    pub camera_checks: &'static [MessageCheck],
    /// Message carrying the blinker lamps
    pub lights_message: &'static str,
}

/// Parsers for the three bus segments
#[derive(Debug, Clone)]
pub struct BusParsers {
    pub primary: CanParser,
    pub adas: CanParser,
    pub camera: CanParser,
}

impl Catalog {
    pub fn for_family(family: ProtocolFamily) -> &'static Catalog {
        match family {
            ProtocolFamily::Global => &GLOBAL,
            ProtocolFamily::PreGlobal => &PRE_GLOBAL,
        }
    }

    /// Build the three parsers against a signal database
    pub fn parsers(&self, db: &SignalDatabase) -> Result<BusParsers> {
        Ok(BusParsers {
            primary: CanParser::new(db, Bus::Primary, self.primary_signals, self.primary_checks)?,
            adas: CanParser::new(db, Bus::Adas, self.adas_signals, self.adas_checks)?,
            camera: CanParser::new(db, Bus::Camera, self.camera_signals, self.camera_checks)?,
        })
    }
}

static GLOBAL: Catalog = Catalog {
    family: ProtocolFamily::Global,
    primary_signals: &[
        sig!("FL", "Wheel_Speeds", 0.0),
        sig!("FR", "Wheel_Speeds", 0.0),
        sig!("RL", "Wheel_Speeds", 0.0),
        sig!("RR", "Wheel_Speeds", 0.0),
        sig!("DOOR_OPEN_FR", "BodyInfo", 1.0),
        sig!("DOOR_OPEN_FL", "BodyInfo", 1.0),
        sig!("DOOR_OPEN_RR", "BodyInfo", 1.0),
        sig!("DOOR_OPEN_RL", "BodyInfo", 1.0),
        sig!("Steer_Torque_Sensor", "Steering_Torque", 0.0),
        sig!("Steering_Angle", "Steering_Torque", 0.0),
        sig!("LEFT_BLINKER", "Dashlights", 0.0),
        sig!("RIGHT_BLINKER", "Dashlights", 0.0),
        sig!("Cruise_On", "CruiseControl", 0.0),
        sig!("Cruise_Activated", "CruiseControl", 0.0),
    ],
    primary_checks: &[
        check!("Wheel_Speeds", 50.0),
        check!("Steering_Torque", 50.0),
        check!("Dashlights", 10.0),
        check!("BodyInfo", 10.0),
        check!("CruiseControl", 20.0),
    ],
    adas_signals: &[
        sig!("Counter", "ES_LKAS", 0.0),
        sig!("LKAS_Output", "ES_LKAS", 0.0),
        sig!("LKAS_Request", "ES_LKAS", 0.0),
    ],
    adas_checks: &[],
    camera_signals: &[
        sig!("Checksum", "ES_Distance", 0.0),
        sig!("Counter", "ES_Distance", 0.0),
        sig!("Signal1", "ES_Distance", 0.0),
        sig!("Cruise_Throttle", "ES_Distance", 0.0),
        sig!("Signal2", "ES_Distance", 0.0),
        sig!("Car_Follow", "ES_Distance", 0.0),
        sig!("Distance_Swap", "ES_Distance", 0.0),
        sig!("Close_Distance", "ES_Distance", 0.0),
        sig!("Main", "ES_Distance", 0.0),
        sig!("Cruise_Set", "ES_Distance", 0.0),
        sig!("Cruise_Resume", "ES_Distance", 0.0),
        sig!("Checksum", "ES_LKAS_State", 0.0),
        sig!("Counter", "ES_LKAS_State", 0.0),
        sig!("Keep_Hands_On_Wheel", "ES_LKAS_State", 0.0),
        sig!("Empty_Box", "ES_LKAS_State", 0.0),
        sig!("LKAS_ACTIVE", "ES_LKAS_State", 0.0),
        sig!("LKAS_Dash_State", "ES_LKAS_State", 0.0),
        sig!("LKAS_Left_Line_Visible", "ES_LKAS_State", 0.0),
        sig!("LKAS_Right_Line_Visible", "ES_LKAS_State", 0.0),
        sig!("Backward_Speed_Limit_Menu", "ES_LKAS_State", 0.0),
        sig!("Cruise_Set_Speed", "ES_DashStatus", 0.0),
    ],
    camera_checks: &[
        check!("ES_Distance", 20.0),
        check!("ES_LKAS_State", 10.0),
        check!("ES_DashStatus", 10.0),
    ],
    lights_message: "Dashlights",
};

static PRE_GLOBAL: Catalog = Catalog {
    family: ProtocolFamily::PreGlobal,
    primary_signals: &[
        sig!("FL", "Wheel_Speeds", 0.0),
        sig!("FR", "Wheel_Speeds", 0.0),
        sig!("RL", "Wheel_Speeds", 0.0),
        sig!("RR", "Wheel_Speeds", 0.0),
        sig!("DOOR_OPEN_FR", "BodyInfo", 1.0),
        sig!("DOOR_OPEN_FL", "BodyInfo", 1.0),
        sig!("DOOR_OPEN_RR", "BodyInfo", 1.0),
        sig!("DOOR_OPEN_RL", "BodyInfo", 1.0),
        sig!("Steer_Torque_Sensor", "Steering_Torque", 0.0),
        sig!("Steering_Angle", "Steering_Torque", 0.0),
        sig!("LEFT_BLINKER", "Dash_State", 0.0),
        sig!("RIGHT_BLINKER", "Dash_State", 0.0),
        sig!("Cruise_On", "CruiseControl", 0.0),
        sig!("Cruise_Activated", "CruiseControl", 0.0),
    ],
    primary_checks: &[
        check!("Wheel_Speeds", 50.0),
        check!("Steering_Torque", 50.0),
        check!("Dash_State", 10.0),
        check!("BodyInfo", 10.0),
        check!("CruiseControl", 20.0),
    ],
    adas_signals: &[
        sig!("Counter", "ES_LKAS", 0.0),
        sig!("LKAS_Command", "ES_LKAS", 0.0),
        sig!("LKAS_Active", "ES_LKAS", 0.0),
    ],
    adas_checks: &[],
    camera_signals: &[
        sig!("Throttle_Cruise", "ES_CruiseThrottle", 0.0),
        sig!("Signal1", "ES_CruiseThrottle", 0.0),
        sig!("Cruise_Activated", "ES_CruiseThrottle", 0.0),
        sig!("Signal2", "ES_CruiseThrottle", 0.0),
        sig!("Brake_On", "ES_CruiseThrottle", 0.0),
        sig!("DistanceSwap", "ES_CruiseThrottle", 0.0),
        sig!("Standstill", "ES_CruiseThrottle", 0.0),
        sig!("Signal3", "ES_CruiseThrottle", 0.0),
        sig!("CloseDistance", "ES_CruiseThrottle", 0.0),
        sig!("Signal4", "ES_CruiseThrottle", 0.0),
        sig!("Standstill_2", "ES_CruiseThrottle", 0.0),
        sig!("Button", "ES_CruiseThrottle", 0.0),
        sig!("Signal5", "ES_CruiseThrottle", 0.0),
        sig!("Counter", "ES_CruiseThrottle", 0.0),
        sig!("Signal6", "ES_CruiseThrottle", 0.0),
        sig!("Checksum", "ES_CruiseThrottle", 0.0),
        sig!("Cruise_Set_Speed", "ES_DashStatus", 0.0),
    ],
    camera_checks: &[
        check!("ES_CruiseThrottle", 20.0),
        check!("ES_DashStatus", 20.0),
    ],
    lights_message: "Dash_State",
};
