//! Typed decoders for inbound wallpad records.
//!
//! [`decode`] is the single entry point: it dispatches on the leading
//! header byte, verifies the checksum where the layout has one and
//! produces a typed [`Record`]. Traffic the bridge does not understand
//! comes back as [`DecodeOutcome::Unknown`] so the caller can log it
//! instead of guessing.

use std::ops::Range;

use crate::protocol::{
    headers, hex_as_decimal, is_known_header, verify_checksum, DeviceType, ELEVATOR_SENTINEL,
    FRAME_SIZE, METERING_RECORD_SIZE, PARKING_RECORD_SIZE,
};

/// Outlet relay state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutletState {
    AutoOn,
    ManualOn,
    ManualOff,
    AutoOff,
}

impl OutletState {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x11 => Some(OutletState::AutoOn),
            0x01 => Some(OutletState::ManualOn),
            0x00 => Some(OutletState::ManualOff),
            0x10 => Some(OutletState::AutoOff),
            _ => None,
        }
    }

    /// Simplified ON/OFF view published on the state topic.
    pub fn is_on(&self) -> bool {
        matches!(self, OutletState::AutoOn | OutletState::ManualOn)
    }

    /// Whether the outlet manages its standby cutoff automatically.
    pub fn is_auto(&self) -> bool {
        matches!(self, OutletState::AutoOn | OutletState::AutoOff)
    }
}

/// Which power figure an outlet report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutletPowerKind {
    /// Live consumption in watts.
    Current,
    /// Programmed standby cutoff in watts.
    Standby,
}

/// Outlet report (0xF9 / 0xFA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletRecord {
    pub device_id: u8,
    pub state: OutletState,
    pub power_kind: OutletPowerKind,
    /// Watts, absent when the field is not made of decimal digits.
    pub power: Option<u32>,
}

/// Light report (0xB0 / 0xB1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightRecord {
    pub device_id: u8,
    pub on: bool,
    pub brightness: u8,
    /// Byte 6 reads 0x05 on dimmable circuits.
    pub dimmable: bool,
}

/// Thermostat activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatingState {
    Off,
    Idle,
    Heating,
    Unknown,
}

impl HeatingState {
    fn from_byte(b: u8) -> Self {
        match b {
            0x80 => HeatingState::Off,
            0x81 => HeatingState::Idle,
            0x83 => HeatingState::Heating,
            _ => HeatingState::Unknown,
        }
    }

    /// Climate mode label. Anything that is not off counts as heating.
    pub fn mode_label(&self) -> &'static str {
        match self {
            HeatingState::Off => "off",
            _ => "heat",
        }
    }
}

/// Thermostat report (0x82 / 0x84). Temperatures are hex-as-decimal;
/// the wallpad pads missing readings with 0xFF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureRecord {
    pub device_id: u8,
    pub state: HeatingState,
    pub current_temp: Option<u32>,
    pub target_temp: Option<u32>,
}

/// Ventilation preset decoded from the mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentilationMode {
    Off,
    Auto,
    Manual,
    Bypass,
}

impl VentilationMode {
    fn from_byte(b: u8) -> Self {
        match b {
            0x00 => VentilationMode::Off,
            0x01 => VentilationMode::Auto,
            0x07 => VentilationMode::Bypass,
            _ => VentilationMode::Manual,
        }
    }
}

/// Ventilation report (0xF6 / 0xF8). The record carries no device id;
/// there is one unit per flat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VentilationRecord {
    pub mode: VentilationMode,
    pub speed: u8,
}

impl VentilationRecord {
    pub fn is_on(&self) -> bool {
        self.mode != VentilationMode::Off
    }

    /// Preset label. The off state still reads back "manual", matching the
    /// wallpad display.
    pub fn preset(&self) -> &'static str {
        match self.mode {
            VentilationMode::Auto => "auto",
            VentilationMode::Bypass => "bypass",
            _ => "manual",
        }
    }

    /// Speed label 1..3; anything else reads back as "1".
    pub fn speed_label(&self) -> &'static str {
        match self.speed {
            0x02 => "2",
            0x03 => "3",
            _ => "1",
        }
    }
}

/// Master light report (0xA0 / 0xA2 without the elevator sentinel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterLightRecord {
    pub device_id: u8,
    pub on: bool,
}

/// Elevator call progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatorStatus {
    /// Ack echo of a call, travelling on the master light header.
    CallAccepted,
    /// 0x26 report while the call is in progress.
    Calling,
    /// 0x26 report once the cabin arrived.
    Arrived,
    Unknown,
}

/// Elevator traffic: the call ack (0xA0/0xA2 with the sentinel) or the
/// continuous status report (0x26).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatorRecord {
    pub device_id: u8,
    pub status: ElevatorStatus,
}

impl ElevatorRecord {
    /// Payload for the call switch state topic, if this report moves it.
    pub fn status_payload(&self) -> Option<&'static str> {
        match self.status {
            ElevatorStatus::CallAccepted | ElevatorStatus::Calling => Some("ON"),
            ElevatorStatus::Arrived => Some("OFF"),
            ElevatorStatus::Unknown => None,
        }
    }
}

/// Which particulate figure an air quality report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticulateKind {
    Pm25,
    Pm10,
}

/// Air quality sensor report (0xC8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirQualityRecord {
    pub device_id: u8,
    /// ppm, absent when the digits are not decimal.
    pub co2: Option<u32>,
    /// Raw particulate byte, published as its hex digits.
    pub particulate: u8,
    pub particulate_kind: ParticulateKind,
}

impl AirQualityRecord {
    /// Particulate reading the way the wallpad prints it: two lower-case
    /// hex digits meaning a decimal value.
    pub fn particulate_label(&self) -> String {
        format!("{:02x}", self.particulate)
    }
}

/// Utility metering report (0xF7, 32 bytes, no checksum).
///
/// Live flows are hex-as-decimal with one implied decimal place, lifetime
/// totals with two. Electric live consumption is plain watts.
#[derive(Debug, Clone, PartialEq)]
pub struct MeteringRecord {
    pub electric_w: Option<u32>,
    pub water_flow: Option<f64>,
    pub warm_water_flow: Option<f64>,
    pub heat_flow: Option<f64>,
    pub electric_total_kwh: Option<f64>,
    pub water_total: Option<f64>,
    pub warm_water_total: Option<f64>,
    pub heat_total: Option<f64>,
}

/// Parking telemetry (0x2A area, 0x80 car number; 10 bytes, no checksum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingRecord {
    /// "B-123" style position, "-" when the lot reports no entry.
    pub area: Option<String>,
    /// Last four digits of the plate, "-" when no entry.
    pub car_number: Option<String>,
}

/// One decoded inbound record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Outlet(OutletRecord),
    Light(LightRecord),
    Temperature(TemperatureRecord),
    Ventilation(VentilationRecord),
    MasterLight(MasterLightRecord),
    Elevator(ElevatorRecord),
    AirQuality(AirQualityRecord),
    Metering(MeteringRecord),
    Parking(ParkingRecord),
}

impl Record {
    /// Device family of this record.
    pub fn device_type(&self) -> DeviceType {
        match self {
            Record::Outlet(_) => DeviceType::Outlet,
            Record::Light(_) => DeviceType::Light,
            Record::Temperature(_) => DeviceType::Temperature,
            Record::Ventilation(_) => DeviceType::Ventilation,
            Record::MasterLight(_) => DeviceType::MasterLight,
            Record::Elevator(_) => DeviceType::Elevator,
            Record::AirQuality(_) => DeviceType::AirQuality,
            Record::Metering(_) => DeviceType::Metering,
            Record::Parking(_) => DeviceType::Parking,
        }
    }
}

/// Outcome of decoding one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// A typed record, checksum-verified where the layout has one.
    Record(Record),
    /// Typed header but the trailing checksum does not add up.
    ChecksumInvalid { header: u8 },
    /// Typed header, checksum fine, but a field value is out of range
    /// (an outlet state byte outside the known four).
    FieldInvalid { header: u8 },
    /// Not a record this bridge decodes. `known_header` separates
    /// recognized-but-unbridged traffic (gas breaker, clock, queries)
    /// from genuinely foreign bytes.
    Unknown { known_header: bool },
}

/// Decode one raw record split out of the stream by
/// [`FrameBuffer`](crate::protocol::FrameBuffer).
pub fn decode(bytes: &[u8]) -> DecodeOutcome {
    let Some(&header) = bytes.first() else {
        return DecodeOutcome::Unknown {
            known_header: false,
        };
    };

    match header {
        headers::OUTLET_STAT | headers::OUTLET_ACK => decode_outlet(bytes),
        headers::LIGHT_STAT | headers::LIGHT_ACK => decode_light(bytes),
        headers::TEMP_STAT | headers::TEMP_ACK => decode_temperature(bytes),
        headers::VENT_STAT | headers::VENT_ACK => decode_ventilation(bytes),
        headers::MASTER_LIGHT_STAT | headers::MASTER_LIGHT_ACK => {
            decode_master_light_or_elevator(bytes)
        }
        headers::ELEVATOR_STAT => decode_elevator_status(bytes),
        headers::AIR_STAT => decode_air_quality(bytes),
        headers::METERING_STAT => decode_metering(bytes),
        headers::PARKING_AREA | headers::PARKING_CAR => decode_parking(bytes),
        h => DecodeOutcome::Unknown {
            known_header: is_known_header(h),
        },
    }
}

/// Checksum gate shared by every 8-byte decoder. Checked before any field
/// so corruption always reports as a checksum failure, not a field error.
fn checked_frame(bytes: &[u8]) -> Result<(), DecodeOutcome> {
    if bytes.len() != FRAME_SIZE {
        return Err(DecodeOutcome::Unknown { known_header: true });
    }
    if !verify_checksum(bytes) {
        return Err(DecodeOutcome::ChecksumInvalid { header: bytes[0] });
    }
    Ok(())
}

fn decode_outlet(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    let Some(state) = OutletState::from_byte(bytes[1]) else {
        return DecodeOutcome::FieldInvalid { header: bytes[0] };
    };
    let power_kind = if bytes[3] == 0x10 {
        OutletPowerKind::Current
    } else {
        OutletPowerKind::Standby
    };
    DecodeOutcome::Record(Record::Outlet(OutletRecord {
        device_id: bytes[2],
        state,
        power_kind,
        power: hex_as_decimal(&bytes[5..7]),
    }))
}

fn decode_light(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    DecodeOutcome::Record(Record::Light(LightRecord {
        device_id: bytes[2],
        on: bytes[1] == 0x01,
        brightness: bytes[5],
        dimmable: bytes[6] == 0x05,
    }))
}

fn decode_temperature(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    DecodeOutcome::Record(Record::Temperature(TemperatureRecord {
        device_id: bytes[2],
        state: HeatingState::from_byte(bytes[1]),
        // 0xFF marks a missing reading and is not decimal digits anyway
        current_temp: hex_as_decimal(&bytes[3..4]),
        target_temp: hex_as_decimal(&bytes[4..5]),
    }))
}

fn decode_ventilation(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    DecodeOutcome::Record(Record::Ventilation(VentilationRecord {
        mode: VentilationMode::from_byte(bytes[1]),
        speed: bytes[3],
    }))
}

fn decode_master_light_or_elevator(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    if bytes[4..6] == ELEVATOR_SENTINEL {
        // Call ack riding the master light header
        return DecodeOutcome::Record(Record::Elevator(ElevatorRecord {
            device_id: bytes[1],
            status: ElevatorStatus::CallAccepted,
        }));
    }
    DecodeOutcome::Record(Record::MasterLight(MasterLightRecord {
        device_id: bytes[2],
        on: bytes[1] == 0x01,
    }))
}

fn decode_elevator_status(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    let status = match bytes[3] {
        0x42 => ElevatorStatus::Calling,
        0x00 => ElevatorStatus::Arrived,
        _ => ElevatorStatus::Unknown,
    };
    DecodeOutcome::Record(Record::Elevator(ElevatorRecord {
        device_id: bytes[1],
        status,
    }))
}

fn decode_air_quality(bytes: &[u8]) -> DecodeOutcome {
    if let Err(outcome) = checked_frame(bytes) {
        return outcome;
    }
    let device_id = bytes[1];
    // The sensor id's low nibble says which particulate size it measures
    let particulate_kind = if device_id & 0x0F == 1 {
        ParticulateKind::Pm25
    } else {
        ParticulateKind::Pm10
    };
    DecodeOutcome::Record(Record::AirQuality(AirQualityRecord {
        device_id,
        co2: hex_as_decimal(&bytes[3..5]),
        particulate: bytes[6],
        particulate_kind,
    }))
}

fn decode_metering(bytes: &[u8]) -> DecodeOutcome {
    if bytes.len() != METERING_RECORD_SIZE {
        return DecodeOutcome::Unknown { known_header: true };
    }
    DecodeOutcome::Record(Record::Metering(MeteringRecord {
        electric_w: hex_as_decimal(&bytes[2..5]),
        water_flow: scaled(bytes, 5..7, 10.0),
        warm_water_flow: scaled(bytes, 7..9, 10.0),
        heat_flow: scaled(bytes, 9..11, 10.0),
        electric_total_kwh: scaled(bytes, 11..14, 100.0),
        water_total: scaled(bytes, 14..17, 100.0),
        warm_water_total: scaled(bytes, 17..20, 100.0),
        heat_total: scaled(bytes, 20..23, 100.0),
    }))
}

fn scaled(bytes: &[u8], range: Range<usize>, divisor: f64) -> Option<f64> {
    hex_as_decimal(&bytes[range]).map(|v| f64::from(v) / divisor)
}

fn decode_parking(bytes: &[u8]) -> DecodeOutcome {
    if bytes.len() != PARKING_RECORD_SIZE {
        return DecodeOutcome::Unknown { known_header: true };
    }

    let mut area = None;
    let mut car_number = None;

    if bytes[0] == headers::PARKING_AREA {
        if bytes[4] == 0x80 && bytes[5] == 0x80 {
            // Lot reports no entry
            area = Some("-".to_string());
            car_number = Some("-".to_string());
        } else {
            // Digits come from unpadded hex renderings of single bytes,
            // matching the lot's own display format
            area = Some(format!(
                "{:X}-{}{}{}",
                bytes[5],
                hex_first(bytes[7]),
                hex_second(bytes[8]),
                hex_second(bytes[9])
            ));
        }
    }

    if bytes[0] == headers::PARKING_CAR && bytes[1] != 0x80 {
        car_number = Some(format!(
            "{}{}{}{}",
            hex_second(bytes[6]),
            hex_second(bytes[7]),
            hex_second(bytes[8]),
            hex_second(bytes[9])
        ));
    }

    DecodeOutcome::Record(Record::Parking(ParkingRecord { area, car_number }))
}

/// First digit of a byte's unpadded upper-case hex rendering:
/// 0xB1 -> 'B', 0x0B -> 'B'.
fn hex_first(b: u8) -> char {
    let nibble = if b >= 0x10 { b >> 4 } else { b };
    char::from_digit(u32::from(nibble), 16)
        .unwrap_or('0')
        .to_ascii_uppercase()
}

/// Second digit of the unpadded rendering, '0' when there is none:
/// 0xB1 -> '1', 0x0B -> '0'.
fn hex_second(b: u8) -> char {
    if b < 0x10 {
        return '0';
    }
    char::from_digit(u32::from(b & 0x0F), 16)
        .unwrap_or('0')
        .to_ascii_uppercase()
}

/// Identity used to correlate an inbound record with a pending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AckKey {
    pub device_type: DeviceType,
    pub device_id: u8,
}

/// Extract the ack identity of a raw frame, if it has one.
///
/// Elevator call acks ride the master light header; the sentinel decides
/// which family the frame counts against. 0x26 status reports stand in
/// for a proper elevator ack and carry the correlating id at byte 2.
pub fn ack_key(bytes: &[u8]) -> Option<AckKey> {
    if bytes.len() != FRAME_SIZE {
        return None;
    }
    let (device_type, device_id) = match bytes[0] {
        headers::OUTLET_STAT | headers::OUTLET_ACK => (DeviceType::Outlet, bytes[2]),
        headers::LIGHT_STAT | headers::LIGHT_ACK => (DeviceType::Light, bytes[2]),
        headers::TEMP_STAT | headers::TEMP_ACK => (DeviceType::Temperature, bytes[2]),
        headers::VENT_STAT | headers::VENT_ACK => (DeviceType::Ventilation, bytes[2]),
        headers::ELEVATOR_STAT => (DeviceType::Elevator, bytes[2]),
        headers::MASTER_LIGHT_STAT | headers::MASTER_LIGHT_ACK => {
            if bytes[4..6] == ELEVATOR_SENTINEL {
                (DeviceType::Elevator, bytes[1])
            } else {
                (DeviceType::MasterLight, bytes[2])
            }
        }
        _ => return None,
    };
    Some(AckKey {
        device_type,
        device_id,
    })
}
