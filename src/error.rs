//! Error types for commax-bridge.

use thiserror::Error;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error during gateway socket or state file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config, persisted state,
    /// discovery payloads).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MQTT client request failed (publish, subscribe, disconnect).
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the gateway is gone; the write was not delivered.
    #[error("Gateway connection closed")]
    ConnectionClosed,

    /// Backpressure - too many frames already in flight to the gateway.
    #[error("Write buffer full")]
    WriteBufferFull,

    /// All reconnect attempts used up. External restart required.
    #[error("Reconnect attempts exhausted after {0} tries")]
    ReconnectExhausted(u32),
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
