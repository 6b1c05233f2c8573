//! # commax-bridge
//!
//! MQTT bridge for Commax wallpads behind an Elfin EW11 serial gateway.
//!
//! The wallpad talks RS-485 on a shared apartment bus; the EW11 exposes
//! that bus as a raw TCP socket. This crate reassembles and decodes the
//! bus traffic into retained MQTT state topics, announces every device it
//! sees via Home Assistant discovery, and turns command topics back into
//! wallpad frames, retrying each until the wallpad acknowledges it.
//!
//! ## Architecture
//!
//! - **Bus plane** (TCP): 8-byte device frames plus longer metering and
//!   parking records, reassembled from arbitrary stream segmentation
//! - **Broker plane** (MQTT): retained state topics, discovery configs
//!   and command subscriptions under one topic prefix
//!
//! The planes meet in [`bridge::Bridge`], a single actor task owning all
//! mutable state; every other task only produces events for it.
//!
//! ## Example
//!
//! ```ignore
//! use commax_bridge::{Bridge, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BridgeConfig::load_or_default("/data/options.json");
//!     let bridge = Bridge::builder().config(config).start().await;
//!     bridge.run().await.unwrap();
//! }
//! ```

pub mod bridge;
pub mod cadence;
pub mod codec;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod mqtt;
pub mod protocol;
pub mod queue;
pub mod reliability;
pub mod state_store;
pub mod transport;
pub mod writer;

pub use bridge::{Bridge, BridgeBuilder, BridgeEvent};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
