//! End-to-end tests over the bundled DBC catalogs

use std::path::PathBuf;
use vehicle_interface::can::bitfield;
use vehicle_interface::signals::load_dbc_file;
use vehicle_interface::subarucan::{subaru_checksum, subaru_preglobal_checksum};
use vehicle_interface::{
    Bus, CanFrame, CanPacker, CarInterface, CarVariant, ControlRequest, InterfaceConfig, OutgoingFrame,
    SignalDatabase, SignalValues,
};

const CYCLE_NS: u64 = 10_000_000;

/// Route library logging through the test harness (`RUST_LOG=debug` to see it)
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dbc_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("dbc")
}

fn database(variant: CarVariant) -> SignalDatabase {
    load_dbc_file(&dbc_dir().join(format!("{}.dbc", variant.dbc_name()))).unwrap()
}

fn values(pairs: &[(&str, f64)]) -> SignalValues {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn frame(packer: &CanPacker, message: &str, bus: Bus, pairs: &[(&str, f64)]) -> CanFrame {
    packer
        .make_can_msg(&OutgoingFrame::new(message, bus, values(pairs)))
        .unwrap()
}

/// Stock traffic of one cycle for a vehicle at `kph`
fn stock_traffic(variant: CarVariant, packer: &CanPacker, cycle: u64, kph: f64, camera: bool) -> Vec<CanFrame> {
    let lights = match variant {
        CarVariant::Impreza => "Dashlights",
        _ => "Dash_State",
    };
    let mut frames = vec![
        frame(packer, "Wheel_Speeds", Bus::Primary, &[("FL", kph), ("FR", kph), ("RL", kph), ("RR", kph)]),
        frame(packer, "Steering_Torque", Bus::Primary, &[("Steer_Torque_Sensor", 0.0)]),
        frame(packer, lights, Bus::Primary, &[]),
        frame(packer, "BodyInfo", Bus::Primary, &[]),
        frame(packer, "CruiseControl", Bus::Primary, &[("Cruise_On", 1.0)]),
    ];

    if camera {
        let counter = (cycle % 8) as f64;
        match variant {
            CarVariant::Impreza => {
                frames.push(frame(packer, "ES_Distance", Bus::Camera, &[("Counter", counter)]));
                frames.push(frame(packer, "ES_LKAS_State", Bus::Camera, &[("Counter", counter)]));
                frames.push(frame(packer, "ES_DashStatus", Bus::Camera, &[("Cruise_Set_Speed", 80.0)]));
            }
            _ => {
                frames.push(frame(packer, "ES_CruiseThrottle", Bus::Camera, &[("Counter", counter)]));
                frames.push(frame(packer, "ES_DashStatus", Bus::Camera, &[("Cruise_Set_Speed", 80.0)]));
            }
        }
    }
    frames
}

#[test]
fn test_bundled_catalogs_load_for_every_variant() {
    init_logging();
    for variant in CarVariant::ALL {
        let config = InterfaceConfig::new(variant).with_dbc_dir(dbc_dir());
        let interface = CarInterface::new(&config).unwrap();
        assert_eq!(interface.variant(), variant);
        assert!(interface.database_stats().num_messages >= 8);
    }
}

#[test]
fn test_global_cycle_end_to_end() {
    init_logging();
    let db = database(CarVariant::Impreza);
    let packer = CanPacker::new(&db);
    let mut interface = CarInterface::from_database(CarVariant::Impreza, db.clone()).unwrap();
    let request = ControlRequest {
        enabled: true,
        steer: 1.0,
        ..Default::default()
    };

    let rx = stock_traffic(CarVariant::Impreza, &packer, 0, 10.0, true);
    let output = interface.step(&rx, 0, 0, &request).unwrap();

    assert!((output.state.velocity_raw - 2.7778).abs() < 1e-3);
    assert!((output.state.velocity_estimate - output.state.velocity_raw).abs() < 1e-9);
    assert!(output.state.link.all_valid());
    assert!(output.state.ready);
    assert_eq!(output.state.cruise.stock_set_speed, 80.0);

    let addresses: Vec<u32> = output.can_sends.iter().map(|f| f.address).collect();
    assert_eq!(addresses, vec![290, 545, 802]);
    assert!(output.can_sends.iter().all(|f| f.bus == 0));

    // counter 0, SET_1, LKAS_Output 60, LKAS_Request
    let lkas = &output.can_sends[0];
    assert_eq!(lkas.data, vec![0x8F, 0x10, 0x3C, 0x20]);

    for sent in &output.can_sends {
        let mut zeroed = sent.data.clone();
        zeroed[0] = 0;
        assert_eq!(sent.data[0], subaru_checksum(&zeroed, sent.address));
    }
}

#[test]
fn test_global_steering_ramps_to_max() {
    init_logging();
    let db = database(CarVariant::Impreza);
    let packer = CanPacker::new(&db);
    let es_lkas = db.get_message_by_name("ES_LKAS").unwrap().clone();
    let output_signal = es_lkas.signal("LKAS_Output").unwrap();
    let mut interface = CarInterface::from_database(CarVariant::Impreza, db.clone()).unwrap();
    let request = ControlRequest {
        enabled: true,
        steer: 1.0,
        ..Default::default()
    };

    let mut last = 0;
    for cycle in 0..100 {
        let rx = stock_traffic(CarVariant::Impreza, &packer, cycle, 40.0, true);
        let output = interface.step(&rx, cycle * CYCLE_NS, cycle, &request).unwrap();
        if let Some(lkas) = output.can_sends.iter().find(|f| f.address == 290) {
            let torque = bitfield::extract(&lkas.data, output_signal).unwrap() as i32;
            assert!(torque >= last && torque - last <= 60);
            assert!(torque <= 2047);
            last = torque;
        }
    }
    assert_eq!(last, 2047);
}

#[test]
fn test_camera_loss_invalidates_link() {
    init_logging();
    let db = database(CarVariant::Impreza);
    let packer = CanPacker::new(&db);
    let mut interface = CarInterface::from_database(CarVariant::Impreza, db.clone()).unwrap();
    let request = ControlRequest::default();

    for cycle in 0..10 {
        let rx = stock_traffic(CarVariant::Impreza, &packer, cycle, 40.0, true);
        let output = interface.step(&rx, cycle * CYCLE_NS, cycle, &request).unwrap();
        assert!(output.state.link.camera);
    }

    let mut ready = true;
    let mut forwarded = 0;
    for cycle in 10..80 {
        let rx = stock_traffic(CarVariant::Impreza, &packer, cycle, 40.0, false);
        let output = interface.step(&rx, cycle * CYCLE_NS, cycle, &request).unwrap();
        ready = output.state.ready;
        forwarded += output.can_sends.iter().filter(|f| f.address == 545).count();
        assert!(output.state.link.primary);
    }
    assert!(!ready);
    // stock counter froze, so nothing more was forwarded
    assert_eq!(forwarded, 0);
}

#[test]
fn test_preglobal_cycle_end_to_end() {
    init_logging();
    let db = database(CarVariant::Outback);
    let packer = CanPacker::new(&db);
    let throttle = db.get_message_by_name("ES_CruiseThrottle").unwrap().clone();
    let button_signal = throttle.signal("Button").unwrap();
    let mut interface = CarInterface::from_database(CarVariant::Outback, db.clone()).unwrap();

    // Nearly stopped and engaged: set is pressed on every button cycle
    let request = ControlRequest {
        enabled: true,
        steer: 0.1,
        target_set_speed: 80.0,
        ..Default::default()
    };

    let mut presses = 0;
    for cycle in 0..30 {
        let rx = stock_traffic(CarVariant::Outback, &packer, cycle, 0.0, true);
        let output = interface.step(&rx, cycle * CYCLE_NS, cycle, &request).unwrap();
        assert!(output.state.standstill);

        for sent in &output.can_sends {
            assert_eq!(sent.data.len(), 8);
            assert_eq!(sent.data[7], subaru_preglobal_checksum(&sent.data));
            if sent.address == 544 {
                assert_eq!(bitfield::extract(&sent.data, button_signal), Some(2));
                presses += 1;
            }
        }
    }
    assert_eq!(presses, 6);
}
