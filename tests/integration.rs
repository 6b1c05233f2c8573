//! Integration tests for commax-bridge.
//!
//! These tests run whole slices of the pipeline: socket bytes through
//! reassembly and decoding, and MQTT commands through routing, queueing
//! and ack correlation.

use commax_bridge::codec::{
    ack_key, decode, DecodeOutcome, ElevatorStatus, HeatingState, OutletPowerKind, Record,
};
use commax_bridge::commands::{CommandRouter, RouteOutcome};
use commax_bridge::discovery;
use commax_bridge::protocol::{checksum, DeviceType, FrameBuffer, METERING_RECORD_SIZE};
use commax_bridge::reliability::ReliabilityEngine;
use commax_bridge::state_store::StateStore;
use commax_bridge::writer::spawn_writer_task_default;

use tokio::io::{duplex, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Finish a frame body with its checksum.
fn frame(body: [u8; 7]) -> Vec<u8> {
    let mut bytes = body.to_vec();
    bytes.push(checksum(&body));
    bytes
}

fn expect_record(bytes: &[u8]) -> Record {
    match decode(bytes) {
        DecodeOutcome::Record(record) => record,
        other => panic!("expected a record, got {:?}", other),
    }
}

/// An outlet state report travels from raw socket bytes to a typed
/// record with the hex-as-decimal power reading converted.
#[test]
fn test_outlet_report_from_socket_bytes() {
    let mut buffer = FrameBuffer::new();

    let records = buffer.push(&[0xF9, 0x11, 0x05, 0x10, 0x00, 0x00, 0x32, 0x51]);
    assert_eq!(records.len(), 1);

    let Record::Outlet(outlet) = expect_record(&records[0]) else {
        panic!("expected an outlet record");
    };
    assert_eq!(outlet.device_id, 0x05);
    assert!(outlet.state.is_on());
    assert!(outlet.state.is_auto());
    assert_eq!(outlet.power_kind, OutletPowerKind::Current);
    assert_eq!(outlet.power, Some(32));
}

/// One TCP read carrying three different device reports back to back.
#[test]
fn test_mixed_families_in_one_read() {
    let mut buffer = FrameBuffer::new();
    let mut stream = Vec::new();
    stream.extend(frame([0xB0, 0x01, 0x02, 0x00, 0x00, 0x03, 0x05]));
    stream.extend(frame([0x82, 0x81, 0x05, 0x19, 0x25, 0x00, 0x00]));
    stream.extend(frame([0xF6, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00]));

    let records = buffer.push(&stream);
    assert_eq!(records.len(), 3);

    let Record::Light(light) = expect_record(&records[0]) else {
        panic!("expected a light record");
    };
    assert!(light.on);
    assert_eq!(light.brightness, 3);
    assert!(light.dimmable);

    let Record::Temperature(temp) = expect_record(&records[1]) else {
        panic!("expected a temperature record");
    };
    assert_eq!(temp.state, HeatingState::Idle);
    assert_eq!(temp.current_temp, Some(19));
    assert_eq!(temp.target_temp, Some(25));

    let Record::Ventilation(fan) = expect_record(&records[2]) else {
        panic!("expected a ventilation record");
    };
    assert!(fan.is_on());
    assert_eq!(fan.speed_label(), "2");
}

/// A 32-byte metering report split across three reads decodes once the
/// last fragment lands.
#[test]
fn test_fragmented_metering_report() {
    let mut record = vec![0xF7, 0x30];
    record.extend_from_slice(&[0x00, 0x12, 0x34]); // 1234 W live
    record.extend_from_slice(&[0x00, 0x85]); // 8.5 L/min water
    record.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // warm water, heat
    record.extend_from_slice(&[0x01, 0x23, 0x45]); // 123.45 kWh total
    record.resize(METERING_RECORD_SIZE, 0x00);

    let mut buffer = FrameBuffer::new();
    assert!(buffer.push(&record[..10]).is_empty());
    assert!(buffer.push(&record[10..20]).is_empty());
    let records = buffer.push(&record[20..]);
    assert_eq!(records.len(), 1);

    let Record::Metering(meter) = expect_record(&records[0]) else {
        panic!("expected a metering record");
    };
    assert_eq!(meter.electric_w, Some(1234));
    assert_eq!(meter.water_flow, Some(8.5));
    assert_eq!(meter.warm_water_flow, Some(0.0));
    assert_eq!(meter.electric_total_kwh, Some(123.45));
}

/// Parking records carry no checksum; the area and plate digits come
/// from the lot's unpadded hex rendering.
#[test]
fn test_parking_records() {
    let mut buffer = FrameBuffer::new();
    let mut stream = vec![0x2A, 0x00, 0x00, 0x00, 0x0B, 0x0B, 0x00, 0xB1, 0x19, 0x12];
    stream.extend_from_slice(&[0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x11, 0x12, 0x13, 0x14]);

    let records = buffer.push(&stream);
    assert_eq!(records.len(), 2);

    let Record::Parking(area) = expect_record(&records[0]) else {
        panic!("expected a parking record");
    };
    assert_eq!(area.area.as_deref(), Some("B-B92"));
    assert_eq!(area.car_number, None);

    let Record::Parking(car) = expect_record(&records[1]) else {
        panic!("expected a parking record");
    };
    assert_eq!(car.area, None);
    assert_eq!(car.car_number.as_deref(), Some("1234"));
}

/// A corrupted frame is dropped on its checksum and the stream keeps
/// decoding afterwards.
#[test]
fn test_corrupt_frame_does_not_wedge_the_stream() {
    let mut corrupted = frame([0xF9, 0x11, 0x05, 0x10, 0x00, 0x00, 0x32]);
    corrupted[3] = 0x00;
    let valid = frame([0xB0, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00]);

    let mut stream = corrupted;
    stream.extend_from_slice(&valid);

    let mut buffer = FrameBuffer::new();
    let records = buffer.push(&stream);
    assert_eq!(records.len(), 2);

    assert_eq!(
        decode(&records[0]),
        DecodeOutcome::ChecksumInvalid { header: 0xF9 }
    );
    assert!(matches!(expect_record(&records[1]), Record::Light(_)));
}

/// The 0xA0 header is shared: the sentinel in payload bytes 4-5 makes
/// it an elevator call ack, anything else a master light report.
#[test]
fn test_elevator_sentinel_disambiguation() {
    let call_ack = frame([0xA0, 0x01, 0x01, 0x00, 0x28, 0xD7, 0x00]);
    let Record::Elevator(elevator) = expect_record(&call_ack) else {
        panic!("expected an elevator record");
    };
    assert_eq!(elevator.status, ElevatorStatus::CallAccepted);
    assert_eq!(elevator.status_payload(), Some("ON"));

    let master = frame([0xA0, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
    let Record::MasterLight(master) = expect_record(&master) else {
        panic!("expected a master light record");
    };
    assert!(master.on);
    assert_eq!(master.device_id, 0x01);
}

/// A thermostat command goes from MQTT topic to wallpad bytes on the
/// wire, then a bus report for the same device clears its retry state.
#[tokio::test]
async fn test_thermostat_command_round_trip() {
    let mut router = CommandRouter::new("devcommax");
    let (events, _inbox) = mpsc::channel(8);
    let mut engine = ReliabilityEngine::new(events);
    let (client, mut server) = duplex(4096);
    let (writer, _task) = spawn_writer_task_default(client);

    let RouteOutcome::Command(action) =
        router.route("devcommax/temp/05/set_temp", "25", Instant::now())
    else {
        panic!("expected a command");
    };
    assert_eq!(
        action.frame.as_bytes(),
        &[0x04, 0x05, 0x03, 0x25, 0x00, 0x00, 0x00, 0x31]
    );
    assert_eq!(
        action.echoes,
        vec![
            ("devcommax/temp/05/mode".to_string(), "heat".to_string()),
            ("devcommax/temp/05/target_temp".to_string(), "25".to_string()),
        ]
    );

    let id = engine.submit(action.frame);
    engine.drain(&writer);

    let mut written = [0u8; 8];
    server.read_exact(&mut written).await.unwrap();
    assert_eq!(&written, action.frame.as_bytes());
    assert!(engine.is_pending(id));

    // The wallpad answers with a state report for thermostat 5
    let report = frame([0x84, 0x81, 0x05, 0x19, 0x25, 0x00, 0x00]);
    let key = ack_key(&report).unwrap();
    assert_eq!(key.device_type, DeviceType::Temperature);
    assert_eq!(engine.on_inbound(key), Some(id));
    assert!(!engine.is_pending(id));
}

/// An elevator call is acked by the sentinel echo on the bus, and the
/// ongoing 0x26 reports keep the switch state moving.
#[tokio::test]
async fn test_elevator_call_acked_by_bus_echo() {
    let mut router = CommandRouter::new("devcommax");
    let (events, _inbox) = mpsc::channel(8);
    let mut engine = ReliabilityEngine::new(events);

    let RouteOutcome::Command(action) =
        router.route("devcommax/elevator/01/call", "ON", Instant::now())
    else {
        panic!("expected a command");
    };
    assert_eq!(
        action.frame.as_bytes(),
        &[0xA0, 0x01, 0x01, 0x00, 0x28, 0xD7, 0x00, 0xA1]
    );

    let id = engine.submit(action.frame);

    let echo = frame([0xA2, 0x01, 0x01, 0x00, 0x28, 0xD7, 0x00]);
    assert_eq!(engine.on_inbound(ack_key(&echo).unwrap()), Some(id));

    // Follow-up status reports: calling, then arrived
    let calling = frame([0x26, 0x01, 0x05, 0x42, 0x00, 0x00, 0x00]);
    let Record::Elevator(progress) = expect_record(&calling) else {
        panic!("expected an elevator record");
    };
    assert_eq!(progress.status_payload(), Some("ON"));

    let arrived = frame([0x26, 0x01, 0x05, 0x00, 0x00, 0x00, 0x00]);
    let Record::Elevator(done) = expect_record(&arrived) else {
        panic!("expected an elevator record");
    };
    assert_eq!(done.status_payload(), Some("OFF"));
}

/// A master light ack without the sentinel correlates against the
/// master light command, not the elevator.
#[tokio::test]
async fn test_master_light_command_round_trip() {
    let mut router = CommandRouter::new("devcommax");
    let (events, _inbox) = mpsc::channel(8);
    let mut engine = ReliabilityEngine::new(events);

    let RouteOutcome::Command(action) =
        router.route("devcommax/master_light/set", "ON", Instant::now())
    else {
        panic!("expected a command");
    };
    let id = engine.submit(action.frame);

    let ack = frame([0xA2, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
    let key = ack_key(&ack).unwrap();
    assert_eq!(key.device_type, DeviceType::MasterLight);
    assert_eq!(engine.on_inbound(key), Some(id));
}

/// Rapid light commands inside the debounce window are swallowed;
/// later ones go through.
#[test]
fn test_light_command_debounce() {
    let mut router = CommandRouter::new("devcommax");
    let start = Instant::now();

    let first = router.route("devcommax/light/02/set", "ON", start);
    assert!(matches!(first, RouteOutcome::Command(_)));

    let bounced = router.route(
        "devcommax/light/02/set",
        "OFF",
        start + Duration::from_millis(5),
    );
    assert_eq!(bounced, RouteOutcome::Debounced);

    let later = router.route(
        "devcommax/light/02/set",
        "OFF",
        start + Duration::from_millis(20),
    );
    assert!(matches!(later, RouteOutcome::Command(_)));
}

/// Discovery bookkeeping survives a restart through the state store.
#[tokio::test]
async fn test_discovery_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = StateStore::new(&path);
    let mut state = store.load().await;
    assert!(state.mark_discovered(DeviceType::Light, "commax_light_02"));
    assert!(state.mark_parking_discovered());
    store.save(&state).await.unwrap();

    let reloaded = StateStore::new(&path).load().await;
    assert!(reloaded.is_discovered(DeviceType::Light, "commax_light_02"));
    // Already-announced devices are not announced again
    let mut reloaded = reloaded;
    assert!(!reloaded.mark_discovered(DeviceType::Light, "commax_light_02"));
    assert!(!reloaded.mark_parking_discovered());
    assert!(reloaded.mark_discovered(DeviceType::Light, "commax_light_03"));
}

/// Discovery configs are JSON Home Assistant accepts: entity topics
/// line up with the topics the bridge publishes state on.
#[test]
fn test_discovery_config_topics_match_state_topics() {
    let configs = discovery::climate_configs("devcommax", "05");
    assert_eq!(configs.len(), 1);
    assert_eq!(
        configs[0].topic,
        "homeassistant/climate/commax_temp_05/config"
    );

    let payload: serde_json::Value = serde_json::from_str(&configs[0].payload).unwrap();
    assert_eq!(payload["mode_cmd_t"], "devcommax/temp/05/set_mode");
    assert_eq!(payload["curr_temp_t"], "devcommax/temp/05/current_temp");
    assert_eq!(payload["temp_cmd_t"], "devcommax/temp/05/set_temp");
    assert_eq!(payload["availability_topic"], "devcommax/availability");

    let sensors = discovery::air_quality_configs("devcommax");
    assert_eq!(sensors.len(), 3);
    let co2: serde_json::Value = serde_json::from_str(&sensors[0].payload).unwrap();
    assert_eq!(co2["state_topic"], "devcommax/air_quality/co2/state");
    assert_eq!(co2["unit_of_measurement"], "ppm");
}

/// Air quality frames publish the particulate byte the way the wallpad
/// prints it, and drop CO2 readings that are not decimal digits.
#[test]
fn test_air_quality_report() {
    let report = frame([0xC8, 0x11, 0x00, 0x04, 0x57, 0x00, 0x35]);
    let Record::AirQuality(air) = expect_record(&report) else {
        panic!("expected an air quality record");
    };
    assert_eq!(air.co2, Some(457));
    assert_eq!(air.particulate_label(), "35");

    let padded = frame([0xC8, 0x12, 0x00, 0xFF, 0xFF, 0x00, 0x12]);
    let Record::AirQuality(missing) = expect_record(&padded) else {
        panic!("expected an air quality record");
    };
    assert_eq!(missing.co2, None);
    assert_eq!(missing.particulate_label(), "12");
}
