//! Persistence for Home Assistant discovery bookkeeping.
//!
//! Discovery configs are published once per device the first time it
//! shows up on the bus. Which devices have been announced is kept in a
//! JSON file so a restart does not re-announce everything; the file uses
//! camelCase keys and stays readable for hand-editing when a device
//! needs to be re-announced.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::DeviceType;

/// Which devices have had their discovery configs published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryState {
    pub discovered_outlets: BTreeSet<String>,
    pub discovered_lights: BTreeSet<String>,
    pub discovered_temps: BTreeSet<String>,
    pub discovered_fans: BTreeSet<String>,
    pub discovered_master_lights: BTreeSet<String>,
    pub discovered_elevators: BTreeSet<String>,
    pub discovered_sensors: BTreeSet<String>,
    pub discovered_meters: BTreeSet<String>,
    pub parking_state: ParkingFlags,
}

/// Parking has two singleton sensors instead of per-id devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParkingFlags {
    pub parking_discovered: bool,
    pub car_number_discovered: bool,
}

impl DiscoveryState {
    /// Record a device as announced. True when it was not known before,
    /// which is the caller's cue to publish the discovery configs.
    pub fn mark_discovered(&mut self, device_type: DeviceType, uid: &str) -> bool {
        match self.set_for_mut(device_type) {
            Some(set) => set.insert(uid.to_string()),
            None => false,
        }
    }

    pub fn is_discovered(&self, device_type: DeviceType, uid: &str) -> bool {
        self.set_for(device_type)
            .map(|set| set.contains(uid))
            .unwrap_or(false)
    }

    /// Record the parking area sensor as announced. True on first call.
    pub fn mark_parking_discovered(&mut self) -> bool {
        !std::mem::replace(&mut self.parking_state.parking_discovered, true)
    }

    /// Record the car number sensor as announced. True on first call.
    pub fn mark_car_number_discovered(&mut self) -> bool {
        !std::mem::replace(&mut self.parking_state.car_number_discovered, true)
    }

    fn set_for(&self, device_type: DeviceType) -> Option<&BTreeSet<String>> {
        match device_type {
            DeviceType::Outlet => Some(&self.discovered_outlets),
            DeviceType::Light => Some(&self.discovered_lights),
            DeviceType::Temperature => Some(&self.discovered_temps),
            DeviceType::Ventilation => Some(&self.discovered_fans),
            DeviceType::MasterLight => Some(&self.discovered_master_lights),
            DeviceType::Elevator => Some(&self.discovered_elevators),
            DeviceType::AirQuality => Some(&self.discovered_sensors),
            DeviceType::Metering => Some(&self.discovered_meters),
            DeviceType::Parking | DeviceType::Unknown => None,
        }
    }

    fn set_for_mut(&mut self, device_type: DeviceType) -> Option<&mut BTreeSet<String>> {
        match device_type {
            DeviceType::Outlet => Some(&mut self.discovered_outlets),
            DeviceType::Light => Some(&mut self.discovered_lights),
            DeviceType::Temperature => Some(&mut self.discovered_temps),
            DeviceType::Ventilation => Some(&mut self.discovered_fans),
            DeviceType::MasterLight => Some(&mut self.discovered_master_lights),
            DeviceType::Elevator => Some(&mut self.discovered_elevators),
            DeviceType::AirQuality => Some(&mut self.discovered_sensors),
            DeviceType::Metering => Some(&mut self.discovered_meters),
            DeviceType::Parking | DeviceType::Unknown => None,
        }
    }
}

/// Reads and writes the discovery state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load persisted state. A missing or corrupt file yields a fresh
    /// default; devices then simply get re-announced.
    pub async fn load(&self) -> DiscoveryState {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No discovery state at {}, starting fresh", self.path.display());
                return DiscoveryState::default();
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", self.path.display(), e);
                return DiscoveryState::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => {
                tracing::info!("Loaded discovery state from {}", self.path.display());
                state
            }
            Err(e) => {
                tracing::error!(
                    "Discovery state at {} is corrupt, starting fresh: {}",
                    self.path.display(),
                    e
                );
                DiscoveryState::default()
            }
        }
    }

    /// Write the state file, pretty-printed.
    pub async fn save(&self, state: &DiscoveryState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
