//! Transport module - supervised TCP links to the EW11 gateways.
//!
//! One connection for the wallpad control bus, optionally a second for
//! the utility metering bus. Both are plain TCP sockets behind
//! serial-to-Wi-Fi converters that drop silently, so every connection
//! carries silence detection and a bounded reconnect schedule.

mod gateway;

pub use gateway::{
    ConnectionState, GatewayConnection, GatewayId, ReconnectDisposition, CONNECT_TIMEOUT,
    DATA_SILENCE_TIMEOUT, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY,
};
