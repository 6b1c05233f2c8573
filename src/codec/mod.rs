//! Record decoding: raw bus bytes into typed device reports.
//!
//! The framing layer ([`crate::protocol::FrameBuffer`]) only splits the
//! stream; everything semantic lives here:
//!
//! - [`decode`] turns one raw record into a typed [`Record`], or says why
//!   it could not ([`DecodeOutcome`]).
//! - [`ack_key`] extracts the identity a record correlates against when a
//!   command is waiting for its ack.
//!
//! # Design
//!
//! Decoding never fails with an error type. Corrupt or foreign traffic is
//! normal on a shared RS-485 bus, so every outcome is a value the caller
//! can log and move past. Checksums are checked before field values:
//! a corrupted frame always reports as [`DecodeOutcome::ChecksumInvalid`],
//! never as a bogus field.
//!
//! # Example
//!
//! ```
//! use commax_bridge::codec::{decode, DecodeOutcome, Record};
//!
//! let frame = [0xF9, 0x11, 0x05, 0x10, 0x00, 0x00, 0x32, 0x51];
//! let DecodeOutcome::Record(Record::Outlet(outlet)) = decode(&frame) else {
//!     panic!("expected an outlet record");
//! };
//! assert_eq!(outlet.device_id, 0x05);
//! assert!(outlet.state.is_on());
//! assert_eq!(outlet.power, Some(32));
//! ```

mod records;

pub use records::{
    ack_key, decode, AckKey, AirQualityRecord, DecodeOutcome, ElevatorRecord, ElevatorStatus,
    HeatingState, LightRecord, MasterLightRecord, MeteringRecord, OutletPowerKind, OutletRecord,
    OutletState, ParkingRecord, ParticulateKind, Record, TemperatureRecord, VentilationMode,
    VentilationRecord,
};
