//! Outbound command frames and their builders.
//!
//! Every command the bridge can send is an 8-byte frame built from a 7-byte
//! body plus the trailing checksum. The builders mirror the wallpad command
//! layouts byte for byte.
//!
//! # Example
//!
//! ```
//! use commax_bridge::protocol::{command_bytes, outlet_command};
//!
//! let frame = outlet_command(0x05, command_bytes::OUTLET_POWER, 0x01, 0);
//! assert_eq!(frame.as_bytes(), &[0x7A, 0x05, 0x01, 0x01, 0x00, 0x00, 0x00, 0x81]);
//! ```

use super::wire_format::{
    checksum, command_device_type, headers, hex_pairs, DeviceType, ELEVATOR_SENTINEL, FRAME_SIZE,
};

/// A complete 8-byte command frame, checksum included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_SIZE],
}

impl Frame {
    /// Build a frame from a 7-byte body, appending the checksum.
    pub fn from_body(body: [u8; FRAME_SIZE - 1]) -> Self {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[..FRAME_SIZE - 1].copy_from_slice(&body);
        bytes[FRAME_SIZE - 1] = checksum(&body);
        Self { bytes }
    }

    /// Get the header byte.
    #[inline]
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    /// Get the device id byte. Every command layout keeps it at offset 1.
    #[inline]
    pub fn device_id(&self) -> u8 {
        self.bytes[1]
    }

    /// Get the raw frame bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    /// Device family this command addresses, derived from the header.
    #[inline]
    pub fn device_type(&self) -> Option<DeviceType> {
        command_device_type(self.bytes[0])
    }

    /// Upper-case hex rendering for logs.
    pub fn hex(&self) -> String {
        hex_pairs(&self.bytes)
    }
}

/// Command selector and value bytes used by the frame builders.
pub mod command_bytes {
    /// Outlet: switch the relay (value 0x01 on, 0x00 off).
    pub const OUTLET_POWER: u8 = 0x01;
    /// Outlet: switch between AUTO and MANUAL standby cutoff.
    pub const OUTLET_STANDBY_MODE: u8 = 0x02;
    /// Outlet: program the standby cutoff wattage.
    pub const OUTLET_STANDBY_POWER: u8 = 0x03;

    /// Thermostat: program the target temperature.
    pub const TEMP_SET_TEMP: u8 = 0x03;
    /// Thermostat: switch the operating mode.
    pub const TEMP_SET_MODE: u8 = 0x04;
    pub const TEMP_MODE_OFF: u8 = 0x00;
    pub const TEMP_MODE_HEAT: u8 = 0x81;

    /// Ventilation: power and preset mode share one selector.
    pub const VENT_SET_POWER: u8 = 0x01;
    /// Ventilation: fan speed.
    pub const VENT_SET_SPEED: u8 = 0x02;
    pub const VENT_OFF: u8 = 0x00;
    pub const VENT_MODE_AUTO: u8 = 0x02;
    pub const VENT_MODE_MANUAL: u8 = 0x04;
    pub const VENT_MODE_BYPASS: u8 = 0x07;
    /// Turning the fan "ON" selects manual mode.
    pub const VENT_ON: u8 = VENT_MODE_MANUAL;

    /// Light power values (byte 2 of a light command).
    pub const LIGHT_OFF: u8 = 0x00;
    pub const LIGHT_ON: u8 = 0x01;
    /// Brightness write; the level travels in byte 6.
    pub const LIGHT_SET_BRIGHTNESS: u8 = 0x03;
}

/// Build an outlet command.
///
/// `power` is split big-endian across payload bytes 4-5 and only meaningful
/// for [`command_bytes::OUTLET_STANDBY_POWER`].
pub fn outlet_command(device_id: u8, command_type: u8, value: u8, power: u16) -> Frame {
    let power_high = (power >> 8) as u8;
    let power_low = (power & 0xFF) as u8;
    Frame::from_body([
        headers::OUTLET_CMD,
        device_id,
        command_type,
        value,
        power_high,
        power_low,
        0x00,
    ])
}

/// Build a light command. The brightness level travels in the last payload
/// byte and is ignored unless `power` is
/// [`command_bytes::LIGHT_SET_BRIGHTNESS`].
pub fn light_command(device_id: u8, power: u8, brightness: u8) -> Frame {
    Frame::from_body([
        headers::LIGHT_CMD,
        device_id,
        power,
        0x00,
        0x00,
        0x00,
        brightness,
    ])
}

/// Build a thermostat command.
pub fn temperature_command(device_id: u8, command_type: u8, value: u8) -> Frame {
    Frame::from_body([
        headers::TEMP_CMD,
        device_id,
        command_type,
        value,
        0x00,
        0x00,
        0x00,
    ])
}

/// Build a ventilation command.
pub fn ventilation_command(device_id: u8, command_type: u8, value: u8) -> Frame {
    Frame::from_body([
        headers::VENT_CMD,
        device_id,
        command_type,
        value,
        0x00,
        0x00,
        0x00,
    ])
}

/// Build an elevator call. The fixed sentinel bytes keep the frame apart
/// from master light traffic on the same header.
pub fn elevator_call(device_id: u8) -> Frame {
    Frame::from_body([
        headers::ELEVATOR_CMD,
        device_id,
        0x01,
        0x00,
        ELEVATOR_SENTINEL[0],
        ELEVATOR_SENTINEL[1],
        0x00,
    ])
}

/// Build a master light command.
pub fn master_light_command(device_id: u8, on: bool) -> Frame {
    Frame::from_body([
        headers::MASTER_LIGHT_CMD,
        device_id,
        u8::from(on),
        0x01,
        0x00,
        0x00,
        0x00,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_appends_checksum() {
        let frame = Frame::from_body([0x7A, 0x05, 0x01, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(frame.as_bytes()[7], 0x81);
        assert_eq!(frame.header(), 0x7A);
        assert_eq!(frame.device_id(), 0x05);
    }

    #[test]
    fn test_outlet_power_on_command() {
        let frame = outlet_command(0x05, command_bytes::OUTLET_POWER, 0x01, 0);
        assert_eq!(
            frame.as_bytes(),
            &[0x7A, 0x05, 0x01, 0x01, 0x00, 0x00, 0x00, 0x81]
        );
    }

    #[test]
    fn test_outlet_standby_power_splits_watts_big_endian() {
        let frame = outlet_command(0x05, command_bytes::OUTLET_STANDBY_POWER, 0x00, 300);
        assert_eq!(
            frame.as_bytes(),
            &[0x7A, 0x05, 0x03, 0x00, 0x01, 0x2C, 0x00, 0xAF]
        );
    }

    #[test]
    fn test_light_power_command() {
        let frame = light_command(0x02, command_bytes::LIGHT_ON, 0);
        assert_eq!(
            frame.as_bytes(),
            &[0x31, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x34]
        );
    }

    #[test]
    fn test_light_brightness_command() {
        let frame = light_command(0x02, command_bytes::LIGHT_SET_BRIGHTNESS, 0x04);
        assert_eq!(
            frame.as_bytes(),
            &[0x31, 0x02, 0x03, 0x00, 0x00, 0x00, 0x04, 0x3A]
        );
    }

    #[test]
    fn test_temperature_set_temp_command() {
        // 25 degrees written as hex digits 0x25
        let frame = temperature_command(0x05, command_bytes::TEMP_SET_TEMP, 0x25);
        assert_eq!(
            frame.as_bytes(),
            &[0x04, 0x05, 0x03, 0x25, 0x00, 0x00, 0x00, 0x31]
        );
    }

    #[test]
    fn test_ventilation_speed_command() {
        let frame = ventilation_command(0x01, command_bytes::VENT_SET_SPEED, 0x02);
        assert_eq!(
            frame.as_bytes(),
            &[0x78, 0x01, 0x02, 0x02, 0x00, 0x00, 0x00, 0x7D]
        );
    }

    #[test]
    fn test_elevator_call_carries_sentinel() {
        let frame = elevator_call(0x01);
        assert_eq!(
            frame.as_bytes(),
            &[0xA0, 0x01, 0x01, 0x00, 0x28, 0xD7, 0x00, 0xA1]
        );
    }

    #[test]
    fn test_master_light_command_layout() {
        let on = master_light_command(0x01, true);
        assert_eq!(on.as_bytes(), &[0x22, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x25]);

        let off = master_light_command(0x01, false);
        assert_eq!(off.as_bytes(), &[0x22, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x24]);
    }

    #[test]
    fn test_device_type_from_header() {
        assert_eq!(
            outlet_command(0x05, 0x01, 0x01, 0).device_type(),
            Some(DeviceType::Outlet)
        );
        assert_eq!(
            elevator_call(0x01).device_type(),
            Some(DeviceType::Elevator)
        );
        assert_eq!(
            master_light_command(0x01, true).device_type(),
            Some(DeviceType::MasterLight)
        );
        assert_eq!(Frame::from_body([0x42; 7]).device_type(), None);
    }

    #[test]
    fn test_hex_rendering() {
        let frame = outlet_command(0x05, command_bytes::OUTLET_POWER, 0x01, 0);
        assert_eq!(frame.hex(), "7A 05 01 01 00 00 00 81");
    }
}
