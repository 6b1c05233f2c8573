//! Wallpad wire format: record sizes, header roster, checksums and the
//! numeric quirks of the bus.
//!
//! Almost everything on the bus is a fixed 8-byte frame:
//! ```text
//! ┌────────┬──────────────────────┬──────────┐
//! │ Header │ Payload              │ Checksum │
//! │ 1 byte │ 6 bytes              │ 1 byte   │
//! └────────┴──────────────────────┴──────────┘
//! ```
//! The checksum is the low byte of the sum of the first seven bytes. Two
//! record families carry no checksum: the metering report (0xF7, 32 bytes)
//! and the parking records (0x2A / 0x80, 10 bytes).
//!
//! Numeric fields use a "decimal written in hex digits" encoding: the bytes
//! `[0x00, 0x32]` print as `"0032"` and mean the decimal value 32. See
//! [`hex_as_decimal`].

/// Standard frame size (header + 6 payload bytes + checksum).
pub const FRAME_SIZE: usize = 8;

/// Metering report size. No checksum byte.
pub const METERING_RECORD_SIZE: usize = 32;

/// Parking record size. No checksum byte.
pub const PARKING_RECORD_SIZE: usize = 10;

/// Header bytes seen on the bus, grouped CMD / ACK / REQ / STAT per device.
pub mod headers {
    // Ventilation
    pub const VENT_CMD: u8 = 0x78;
    pub const VENT_ACK: u8 = 0xF8;
    pub const VENT_REQ: u8 = 0x76;
    pub const VENT_STAT: u8 = 0xF6;

    // Light
    pub const LIGHT_CMD: u8 = 0x31;
    pub const LIGHT_ACK: u8 = 0xB1;
    pub const LIGHT_REQ: u8 = 0x30;
    pub const LIGHT_STAT: u8 = 0xB0;

    // Master light. STAT and ACK are shared with the elevator call; frames
    // carrying [`super::ELEVATOR_SENTINEL`] in payload bytes 4-5 are
    // elevator traffic, not master light traffic.
    pub const MASTER_LIGHT_CMD: u8 = 0x22;
    pub const MASTER_LIGHT_ACK: u8 = 0xA2;
    pub const MASTER_LIGHT_REQ: u8 = 0x20;
    pub const MASTER_LIGHT_STAT: u8 = 0xA0;

    // Outlet (standby power switch)
    pub const OUTLET_CMD: u8 = 0x7A;
    pub const OUTLET_ACK: u8 = 0xFA;
    pub const OUTLET_REQ: u8 = 0x79;
    pub const OUTLET_STAT: u8 = 0xF9;

    // Thermostat
    pub const TEMP_CMD: u8 = 0x04;
    pub const TEMP_ACK: u8 = 0x84;
    pub const TEMP_REQ: u8 = 0x02;
    pub const TEMP_STAT: u8 = 0x82;

    // Gas breaker (observed, not bridged)
    pub const GAS_CMD: u8 = 0x11;
    pub const GAS_ACK: u8 = 0x91;
    pub const GAS_REQ: u8 = 0x10;
    pub const GAS_STAT: u8 = 0x90;

    /// Wallpad clock response.
    pub const CLOCK: u8 = 0x7F;

    /// Elevator call command. Same value as [`MASTER_LIGHT_STAT`].
    pub const ELEVATOR_CMD: u8 = 0xA0;
    /// Continuous elevator status report. The wallpad keeps repeating it
    /// while a call is in progress, so it doubles as the call ack.
    pub const ELEVATOR_STAT: u8 = 0x26;

    // Parking position
    pub const PARKING_REQ_1: u8 = 0x24;
    pub const PARKING_REQ_2: u8 = 0xA4;
    pub const PARKING_REQ_3: u8 = 0x25;
    pub const PARKING_AREA: u8 = 0x2A;
    pub const PARKING_CAR: u8 = 0x80;
    pub const PARKING_STAT_ALT: u8 = 0xAA;

    // Air quality sensor
    pub const AIR_REQ_1: u8 = 0x47;
    pub const AIR_REQ_2: u8 = 0x48;
    pub const AIR_STAT: u8 = 0xC8;

    // Utility metering
    pub const METERING_REQ: u8 = 0x77;
    pub const METERING_STAT: u8 = 0xF7;

    // Regularly on the bus, role not identified
    pub const MISC_0F: u8 = 0x0F;
    pub const MISC_8F: u8 = 0x8F;
}

/// Payload bytes 4 and 5 of an 0xA0/0xA2 frame that mark the elevator call
/// variant. Without them the frame is a master light record.
pub const ELEVATOR_SENTINEL: [u8; 2] = [0x28, 0xD7];

/// Every header byte the wallpad is known to emit or accept.
pub const KNOWN_HEADERS: [u8; 39] = [
    headers::VENT_CMD,
    headers::VENT_ACK,
    headers::VENT_REQ,
    headers::VENT_STAT,
    headers::LIGHT_CMD,
    headers::LIGHT_ACK,
    headers::LIGHT_REQ,
    headers::LIGHT_STAT,
    headers::MASTER_LIGHT_CMD,
    headers::MASTER_LIGHT_ACK,
    headers::MASTER_LIGHT_REQ,
    headers::MASTER_LIGHT_STAT,
    headers::OUTLET_CMD,
    headers::OUTLET_ACK,
    headers::OUTLET_REQ,
    headers::OUTLET_STAT,
    headers::TEMP_CMD,
    headers::TEMP_ACK,
    headers::TEMP_REQ,
    headers::TEMP_STAT,
    headers::GAS_CMD,
    headers::GAS_ACK,
    headers::GAS_REQ,
    headers::GAS_STAT,
    headers::CLOCK,
    headers::ELEVATOR_STAT,
    headers::PARKING_REQ_1,
    headers::PARKING_REQ_2,
    headers::PARKING_REQ_3,
    headers::PARKING_AREA,
    headers::PARKING_CAR,
    headers::PARKING_STAT_ALT,
    headers::AIR_REQ_1,
    headers::AIR_REQ_2,
    headers::AIR_STAT,
    headers::METERING_REQ,
    headers::METERING_STAT,
    headers::MISC_0F,
    headers::MISC_8F,
];

/// Check if a header byte is in the known roster.
#[inline]
pub fn is_known_header(header: u8) -> bool {
    KNOWN_HEADERS.contains(&header)
}

/// Record length implied by a leading header byte.
///
/// Returns `None` when the byte does not start any record this bridge can
/// frame. Drives stream reassembly in
/// [`FrameBuffer`](crate::protocol::FrameBuffer).
pub fn expected_len(header: u8) -> Option<usize> {
    match header {
        headers::METERING_STAT => Some(METERING_RECORD_SIZE),
        headers::PARKING_AREA | headers::PARKING_CAR => Some(PARKING_RECORD_SIZE),
        h if is_known_header(h) => Some(FRAME_SIZE),
        _ => None,
    }
}

/// Device families bridged to MQTT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Outlet,
    Light,
    Temperature,
    Ventilation,
    Elevator,
    MasterLight,
    AirQuality,
    Metering,
    Parking,
    /// Anything without a recognized command or state header.
    Unknown,
}

impl DeviceType {
    /// Topic segment used for this device family.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceType::Outlet => "outlet",
            DeviceType::Light => "light",
            DeviceType::Temperature => "temp",
            DeviceType::Ventilation => "fan",
            DeviceType::Elevator => "elevator",
            DeviceType::MasterLight => "master_light",
            DeviceType::AirQuality => "air_quality",
            DeviceType::Metering => "metering",
            DeviceType::Parking => "parking",
            DeviceType::Unknown => "unknown",
        }
    }
}

/// Device family a command frame addresses, derived from its header.
pub fn command_device_type(header: u8) -> Option<DeviceType> {
    match header {
        headers::OUTLET_CMD => Some(DeviceType::Outlet),
        headers::LIGHT_CMD => Some(DeviceType::Light),
        headers::TEMP_CMD => Some(DeviceType::Temperature),
        headers::VENT_CMD => Some(DeviceType::Ventilation),
        headers::ELEVATOR_CMD => Some(DeviceType::Elevator),
        headers::MASTER_LIGHT_CMD => Some(DeviceType::MasterLight),
        _ => None,
    }
}

/// Low byte of the sum of `bytes`.
///
/// # Example
///
/// ```
/// use commax_bridge::protocol::checksum;
///
/// assert_eq!(checksum(&[0x7A, 0x05, 0x01, 0x01, 0x00, 0x00, 0x00]), 0x81);
/// ```
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u32, |acc, &b| acc + u32::from(b)) as u8
}

/// Verify the trailing checksum of a standard 8-byte frame.
pub fn verify_checksum(frame: &[u8]) -> bool {
    frame.len() == FRAME_SIZE && checksum(&frame[..FRAME_SIZE - 1]) == frame[FRAME_SIZE - 1]
}

/// Read bytes as hex digit pairs interpreted as decimal.
///
/// `[0x00, 0x32]` prints as `"0032"` and means 32; `[0x12, 0x34]` means
/// 1234. Returns `None` when any nibble is not a decimal digit (the wallpad
/// pads absent values with 0xFF).
///
/// # Example
///
/// ```
/// use commax_bridge::protocol::hex_as_decimal;
///
/// assert_eq!(hex_as_decimal(&[0x00, 0x32]), Some(32));
/// assert_eq!(hex_as_decimal(&[0x19]), Some(19));
/// assert_eq!(hex_as_decimal(&[0xFF]), None);
/// ```
pub fn hex_as_decimal(bytes: &[u8]) -> Option<u32> {
    let mut value: u32 = 0;
    for &b in bytes {
        let hi = u32::from(b >> 4);
        let lo = u32::from(b & 0x0F);
        if hi > 9 || lo > 9 {
            return None;
        }
        value = value * 100 + hi * 10 + lo;
    }
    Some(value)
}

/// Inverse of [`hex_as_decimal`] for a single byte: 25 becomes 0x25.
/// Values above 99 do not fit in one byte.
pub fn decimal_as_hex(value: u8) -> Option<u8> {
    if value > 99 {
        return None;
    }
    Some(((value / 10) << 4) | (value % 10))
}

/// Format bytes as upper-case hex pairs for logging: `"7A 05 01"`.
pub fn hex_pairs(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Device ids travel in topics as two lower-case hex digits.
#[inline]
pub fn device_id_str(id: u8) -> String {
    format!("{:02x}", id)
}
