//! Protocol module - wire format, framing and command frames.
//!
//! This module implements the wallpad side of the bridge at the byte level:
//! - header roster, checksums and the hex-as-decimal numeric quirk
//! - frame buffer for reassembling records out of arbitrary TCP reads
//! - command frame builders mirroring the wallpad layouts

mod frame;
mod frame_buffer;
pub(crate) mod wire_format;

pub use frame::{
    command_bytes, elevator_call, light_command, master_light_command, outlet_command,
    temperature_command, ventilation_command, Frame,
};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    checksum, command_device_type, decimal_as_hex, device_id_str, expected_len, headers,
    hex_as_decimal, hex_pairs, is_known_header, verify_checksum, DeviceType, ELEVATOR_SENTINEL,
    FRAME_SIZE, KNOWN_HEADERS, METERING_RECORD_SIZE, PARKING_RECORD_SIZE,
};
