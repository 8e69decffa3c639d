//! Frame builders
//!
//! Pure functions that turn desired values into a complete signal mapping
//! for one message, rolling counter and checksum included. Two checksum
//! conventions exist:
//!
//! - global platform: `(sum(bytes[1..]) + (address >> 8) + address) & 0xff`,
//!   checksum in byte 0, 4-bit counters;
//! - pre-global platform: `sum(bytes[0..7]) % 256`, checksum in byte 7,
//!   3-bit counters.
//!
//! Both are computed over the payload rendered with the checksum held at 0.

use crate::can::MessagePacker;
use crate::types::{Bus, OutgoingFrame, Result, SignalValues, VisualAlert};
use crate::values::ProtocolFamily;

/// Frames between two `ES_CruiseThrottle` messages
pub const ES_THROTTLE_STEP: u64 = 5;

/// Global platform checksum over a rendered payload
pub fn subaru_checksum(data: &[u8], address: u32) -> u8 {
    let payload: u32 = data.iter().skip(1).map(|&b| u32::from(b)).sum();
    (payload.wrapping_add(address >> 8).wrapping_add(address) & 0xff) as u8
}

/// Pre-global checksum: first seven bytes only, whatever the frame length
pub fn subaru_preglobal_checksum(data: &[u8]) -> u8 {
    let sum: u32 = data.iter().take(7).map(|&b| u32::from(b)).sum();
    (sum % 256) as u8
}

/// Rolling counter for a message sent every `step` frames
pub fn rolling_counter(frame: u64, step: u64, family: ProtocolFamily) -> u64 {
    (frame / step.max(1)) % family.counter_modulus()
}

fn set(values: &mut SignalValues, signal: &str, value: f64) {
    values.insert(signal.to_string(), value);
}

/// Compute and store the checksum of `values` for `message`
fn with_checksum<P: MessagePacker + ?Sized>(
    packer: &P,
    family: ProtocolFamily,
    message: &str,
    mut values: SignalValues,
) -> Result<OutgoingFrame> {
    set(&mut values, "Checksum", 0.0);
    let data = packer.pack(message, &values)?;
    let checksum = match family {
        ProtocolFamily::Global => subaru_checksum(&data, packer.address(message)?),
        ProtocolFamily::PreGlobal => subaru_preglobal_checksum(&data),
    };
    set(&mut values, "Checksum", f64::from(checksum));
    Ok(OutgoingFrame::new(message, Bus::Primary, values))
}

/// `ES_LKAS`: the steering torque command
pub fn create_steering_control<P: MessagePacker + ?Sized>(
    packer: &P,
    family: ProtocolFamily,
    apply_steer: i32,
    frame: u64,
    steer_step: u64,
) -> Result<OutgoingFrame> {
    let idx = rolling_counter(frame, steer_step, family) as f64;
    let active = if apply_steer != 0 { 1.0 } else { 0.0 };
    let mut values = SignalValues::new();

    match family {
        ProtocolFamily::Global => {
            set(&mut values, "Counter", idx);
            set(&mut values, "LKAS_Output", f64::from(apply_steer));
            set(&mut values, "LKAS_Request", active);
            // enable bit above the counter
            set(&mut values, "SET_1", 1.0);
        }
        ProtocolFamily::PreGlobal => {
            set(&mut values, "Counter", idx);
            set(&mut values, "LKAS_Command", f64::from(apply_steer));
            set(&mut values, "LKAS_Active", active);
        }
    }

    with_checksum(packer, family, "ES_LKAS", values)
}

/// `ES_LKAS_State` carrying nothing but its checksum (global platform)
pub fn create_steering_status<P: MessagePacker + ?Sized>(packer: &P) -> Result<OutgoingFrame> {
    with_checksum(packer, ProtocolFamily::Global, "ES_LKAS_State", SignalValues::new())
}

/// Forwarded `ES_Distance`, pressing the main switch to cancel
pub fn create_es_distance<P: MessagePacker + ?Sized>(
    packer: &P,
    es_distance_msg: &SignalValues,
    pcm_cancel_cmd: bool,
) -> Result<OutgoingFrame> {
    let mut values = es_distance_msg.clone();
    if pcm_cancel_cmd {
        set(&mut values, "Main", 1.0);
    }
    with_checksum(packer, ProtocolFamily::Global, "ES_Distance", values)
}

/// Forwarded `ES_LKAS_State` with our alert and lane lines
pub fn create_es_lkas<P: MessagePacker + ?Sized>(
    packer: &P,
    es_lkas_msg: &SignalValues,
    visual_alert: VisualAlert,
    left_line: bool,
    right_line: bool,
) -> Result<OutgoingFrame> {
    let mut values = es_lkas_msg.clone();
    if visual_alert == VisualAlert::SteerRequired {
        set(&mut values, "Keep_Hands_On_Wheel", 1.0);
    }
    set(&mut values, "LKAS_Left_Line_Visible", if left_line { 1.0 } else { 0.0 });
    set(&mut values, "LKAS_Right_Line_Visible", if right_line { 1.0 } else { 0.0 });
    with_checksum(packer, ProtocolFamily::Global, "ES_LKAS_State", values)
}

/// Forwarded `ES_CruiseThrottle` with a synthesized button press
pub fn create_es_throttle_control<P: MessagePacker + ?Sized>(
    packer: &P,
    frame: u64,
    es_throttle_msg: &SignalValues,
    fake_button: u8,
) -> Result<OutgoingFrame> {
    let mut values = es_throttle_msg.clone();
    set(&mut values, "Button", f64::from(fake_button));
    set(
        &mut values,
        "Counter",
        rolling_counter(frame, ES_THROTTLE_STEP, ProtocolFamily::PreGlobal) as f64,
    );
    with_checksum(packer, ProtocolFamily::PreGlobal, "ES_CruiseThrottle", values)
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// `ES_Brake`: EyeSight brake request (pre-global)
pub fn create_brake<P: MessagePacker + ?Sized>(
    packer: &P,
    frame: u64,
    enabled: bool,
    error: bool,
    brake: f64,
) -> Result<OutgoingFrame> {
    let braking = brake > 0.0;
    let mut values = SignalValues::new();
    set(
        &mut values,
        "Counter",
        rolling_counter(frame, ES_THROTTLE_STEP, ProtocolFamily::PreGlobal) as f64,
    );
    set(&mut values, "Brake_Pressure", brake);
    set(&mut values, "Brake_Light", flag(braking));
    set(&mut values, "ES_Error", flag(error));
    set(&mut values, "Brake_On", flag(braking));
    set(&mut values, "Cruise_Activated", flag(enabled));
    with_checksum(packer, ProtocolFamily::PreGlobal, "ES_Brake", values)
}

/// `ES_RPM`: engine speed request while cruising (pre-global)
pub fn create_es_rpm_control<P: MessagePacker + ?Sized>(
    packer: &P,
    frame: u64,
    enabled: bool,
    brake: f64,
    rpm: f64,
) -> Result<OutgoingFrame> {
    let mut values = SignalValues::new();
    set(&mut values, "Brake", flag(brake > 0.0));
    set(&mut values, "Cruise_Activated", flag(enabled));
    set(&mut values, "RPM", rpm);
    set(
        &mut values,
        "Counter",
        rolling_counter(frame, ES_THROTTLE_STEP, ProtocolFamily::PreGlobal) as f64,
    );
    with_checksum(packer, ProtocolFamily::PreGlobal, "ES_RPM", values)
}

/// `ES_DashStatus`: cruise display (pre-global). The dash does not check
/// this message, so no checksum is written.
pub fn create_es_dash_control<P: MessagePacker + ?Sized>(
    packer: &P,
    frame: u64,
    enabled: bool,
    v_cruise_pcm: f64,
    lead_car: bool,
    brake: f64,
) -> Result<OutgoingFrame> {
    let mut values = SignalValues::new();
    set(&mut values, "Cruise_On", 1.0);
    set(&mut values, "Cruise_On_2", 1.0);
    set(&mut values, "Cruise_Activated", flag(enabled));
    set(&mut values, "Distance_Bars", 1.0);
    set(&mut values, "Cruise_Set_Speed", v_cruise_pcm);
    set(&mut values, "Lead_Car", flag(lead_car));
    set(&mut values, "NEW_SIGNAL_1", flag(brake > 0.0));
    set(
        &mut values,
        "Counter",
        rolling_counter(frame, ES_THROTTLE_STEP, ProtocolFamily::PreGlobal) as f64,
    );
    set(&mut values, "Obstacle_Distance", 5.0);

    // Render once so a catalog missing any of these signals fails here
    packer.pack("ES_DashStatus", &values)?;
    Ok(OutgoingFrame::new("ES_DashStatus", Bus::Primary, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::CanPacker;
    use crate::signals::dbc::parse_dbc_str;
    use crate::signals::SignalDatabase;
    use crate::types::InterfaceError;

    fn packer(dbc: &str) -> CanPacker {
        let mut db = SignalDatabase::new();
        for msg in parse_dbc_str(dbc, "inline").unwrap() {
            db.add_message(msg);
        }
        CanPacker::new(&db)
    }

    fn global_packer() -> CanPacker {
        packer(include_str!("../../dbc/subaru_global_2017.dbc"))
    }

    fn preglobal_packer() -> CanPacker {
        packer(include_str!("../../dbc/subaru_outback_2015_eyesight.dbc"))
    }

    #[test]
    fn test_global_checksum_fixture() {
        // bytes[1..] = 0x13 + 0x3C + 0x20 = 0x6F, address 0x122 -> 0x01 + 0x122
        assert_eq!(subaru_checksum(&[0x00, 0x13, 0x3C, 0x20], 0x122), 0x92);
        // byte 0 is never part of the sum
        assert_eq!(subaru_checksum(&[0xFF, 0x13, 0x3C, 0x20], 0x122), 0x92);
        // wraps modulo 256
        assert_eq!(subaru_checksum(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF], 0x221), 0x1F);
    }

    #[test]
    fn test_preglobal_checksum_fixture() {
        let data = [0x3C, 0x00, 0x00, 0x01, 0x00, 0x00, 0x05, 0xAA];
        assert_eq!(subaru_preglobal_checksum(&data), 0x42);
        // the 8th byte and beyond are ignored
        let wrapped = [0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00, 0x00, 0x77];
        assert_eq!(subaru_preglobal_checksum(&wrapped), 0x00);
    }

    #[test]
    fn test_counters_wrap() {
        let global: Vec<u64> = (0..34).step_by(2).map(|f| rolling_counter(f, 2, ProtocolFamily::Global)).collect();
        assert_eq!(global[15], 15);
        assert_eq!(global[16], 0);

        let pre: Vec<u64> = (0..18).step_by(2).map(|f| rolling_counter(f, 2, ProtocolFamily::PreGlobal)).collect();
        assert_eq!(pre[7], 7);
        assert_eq!(pre[8], 0);
    }

    #[test]
    fn test_global_steering_control() {
        let packer = global_packer();
        let frame = create_steering_control(&packer, ProtocolFamily::Global, 60, 6, 2).unwrap();
        assert_eq!(frame.message, "ES_LKAS");
        assert_eq!(frame.bus, Bus::Primary);
        assert_eq!(frame.value("Counter"), 3.0);
        assert_eq!(frame.value("LKAS_Output"), 60.0);
        assert_eq!(frame.value("LKAS_Request"), 1.0);
        assert_eq!(frame.value("SET_1"), 1.0);
        // payload 00 13 3C 20 at 0x122
        assert_eq!(frame.value("Checksum"), 146.0);

        let idle = create_steering_control(&packer, ProtocolFamily::Global, 0, 6, 2).unwrap();
        assert_eq!(idle.value("LKAS_Request"), 0.0);
    }

    #[test]
    fn test_preglobal_steering_control() {
        let packer = preglobal_packer();
        let frame = create_steering_control(&packer, ProtocolFamily::PreGlobal, -60, 18, 2).unwrap();
        assert_eq!(frame.value("Counter"), 1.0);
        assert_eq!(frame.value("LKAS_Command"), -60.0);
        assert_eq!(frame.value("LKAS_Active"), 1.0);

        let mut values = frame.values.clone();
        values.insert("Checksum".to_string(), 0.0);
        let data = packer.pack("ES_LKAS", &values).unwrap();
        assert_eq!(frame.value("Checksum"), f64::from(subaru_preglobal_checksum(&data)));
    }

    #[test]
    fn test_rendered_checksum_matches_payload() {
        let packer = global_packer();
        let frame = create_steering_status(&packer).unwrap();
        let data = packer.pack(&frame.message, &frame.values).unwrap();
        let mut zeroed = data.clone();
        zeroed[0] = 0;
        assert_eq!(data[0], subaru_checksum(&zeroed, 0x322));
        // empty payload: only the address contributes
        assert_eq!(data[0], ((0x322u32 >> 8) + 0x322) as u8);
    }

    #[test]
    fn test_es_distance_cancel() {
        let packer = global_packer();
        let mut stock = SignalValues::new();
        stock.insert("Counter".to_string(), 5.0);
        stock.insert("Checksum".to_string(), 99.0);
        stock.insert("Close_Distance".to_string(), 12.0);

        let passthrough = create_es_distance(&packer, &stock, false).unwrap();
        assert_eq!(passthrough.value("Main"), 0.0);
        assert_eq!(passthrough.value("Close_Distance"), 12.0);
        assert_eq!(passthrough.value("Counter"), 5.0);

        let cancel = create_es_distance(&packer, &stock, true).unwrap();
        assert_eq!(cancel.value("Main"), 1.0);
        assert_ne!(cancel.value("Checksum"), passthrough.value("Checksum"));
    }

    #[test]
    fn test_es_lkas_alert_and_lines() {
        let packer = global_packer();
        let stock = SignalValues::new();
        let frame = create_es_lkas(&packer, &stock, VisualAlert::SteerRequired, true, false).unwrap();
        assert_eq!(frame.value("Keep_Hands_On_Wheel"), 1.0);
        assert_eq!(frame.value("LKAS_Left_Line_Visible"), 1.0);
        assert_eq!(frame.value("LKAS_Right_Line_Visible"), 0.0);

        let frame = create_es_lkas(&packer, &stock, VisualAlert::Other, false, true).unwrap();
        assert_eq!(frame.value("Keep_Hands_On_Wheel"), 0.0);
        assert_eq!(frame.value("LKAS_Right_Line_Visible"), 1.0);
    }

    #[test]
    fn test_es_throttle_button() {
        let packer = preglobal_packer();
        let mut stock = SignalValues::new();
        stock.insert("Button".to_string(), 0.0);
        stock.insert("CloseDistance".to_string(), 5.0);

        let frame = create_es_throttle_control(&packer, 45, &stock, 4).unwrap();
        assert_eq!(frame.value("Button"), 4.0);
        assert_eq!(frame.value("Counter"), 1.0);
        assert_eq!(frame.value("CloseDistance"), 5.0);
    }

    #[test]
    fn test_brake_request() {
        let packer = preglobal_packer();
        let frame = create_brake(&packer, 10, true, false, 300.0).unwrap();
        assert_eq!(frame.message, "ES_Brake");
        assert_eq!(frame.value("Counter"), 2.0);
        assert_eq!(frame.value("Brake_Light"), 1.0);
        assert_eq!(frame.value("Brake_On"), 1.0);
        assert_eq!(frame.value("ES_Error"), 0.0);
        // 2C 01 D0 00 00 00 02
        assert_eq!(frame.value("Checksum"), 255.0);

        let released = create_brake(&packer, 10, false, true, 0.0).unwrap();
        assert_eq!(released.value("Brake_On"), 0.0);
        assert_eq!(released.value("Brake_Light"), 0.0);
        assert_eq!(released.value("ES_Error"), 1.0);
        assert_eq!(released.value("Cruise_Activated"), 0.0);
    }

    #[test]
    fn test_es_rpm_control() {
        let packer = preglobal_packer();
        let frame = create_es_rpm_control(&packer, 35, true, 0.0, 1500.0).unwrap();
        assert_eq!(frame.value("Counter"), 7.0);
        assert_eq!(frame.value("Brake"), 0.0);
        assert_eq!(frame.value("RPM"), 1500.0);
        // 00 02 DC 05 00 00 07
        assert_eq!(frame.value("Checksum"), 234.0);

        let braking = create_es_rpm_control(&packer, 40, true, 2.0, 1500.0).unwrap();
        assert_eq!(braking.value("Counter"), 0.0);
        assert_eq!(braking.value("Brake"), 1.0);
    }

    #[test]
    fn test_es_dash_control() {
        let packer = preglobal_packer();
        let frame = create_es_dash_control(&packer, 20, true, 100.0, true, 0.0).unwrap();
        assert_eq!(frame.message, "ES_DashStatus");
        assert_eq!(frame.value("Counter"), 4.0);
        assert_eq!(frame.value("Cruise_Set_Speed"), 100.0);
        assert_eq!(frame.value("Lead_Car"), 1.0);
        assert_eq!(frame.value("NEW_SIGNAL_1"), 0.0);
        assert_eq!(frame.value("Obstacle_Distance"), 5.0);
        // left unchecked
        assert_eq!(frame.value("Checksum"), 0.0);

        let raw = packer.make_can_msg(&frame).unwrap();
        assert_eq!(raw.address, 801);
        assert_eq!(raw.data[3], 100);
        assert_eq!(raw.data[7], 0);

        let braking = create_es_dash_control(&packer, 20, false, 100.0, false, 1.0).unwrap();
        assert_eq!(braking.value("NEW_SIGNAL_1"), 1.0);
        assert_eq!(braking.value("Cruise_Activated"), 0.0);
    }

    #[test]
    fn test_preglobal_builders_need_their_messages() {
        let packer = global_packer();
        assert!(create_brake(&packer, 0, true, false, 1.0).is_err());
        assert!(create_es_rpm_control(&packer, 0, true, 0.0, 800.0).is_err());
    }

    #[test]
    fn test_unknown_message_propagates() {
        let packer = preglobal_packer();
        let result = create_es_distance(&packer, &SignalValues::new(), false);
        assert!(matches!(result, Err(InterfaceError::MessageNotFound(_))));
    }
}
