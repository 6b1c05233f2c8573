//! Home Assistant MQTT discovery configs.
//!
//! Every device family the bridge sees gets announced once through the
//! `homeassistant/` discovery tree; after that Home Assistant follows
//! the plain state topics. The payloads here mirror what an installed
//! wallpad shows on its own screen, Korean display names included, so
//! the entities line up with what residents already know.
//!
//! Builders return ready-to-publish [`DiscoveryMessage`]s; the caller
//! owns retained publishing and the once-per-device bookkeeping.

use serde::Serialize;

use crate::mqtt::{availability_topic, singleton_topic, state_topic};

/// Marker uid covering all three air quality sensors.
pub const AIR_QUALITY_UID: &str = "commax_air_quality";

/// Marker uid covering all eight metering sensors.
pub const METER_UID: &str = "commax_meter";

pub fn outlet_uid(device_id: &str) -> String {
    format!("commax_outlet_{}", device_id)
}

pub fn light_uid(device_id: &str) -> String {
    format!("commax_light_{}", device_id)
}

pub fn temp_uid(device_id: &str) -> String {
    format!("commax_temp_{}", device_id)
}

pub fn fan_uid(device_id: &str) -> String {
    format!("commax_fan_{}", device_id)
}

pub fn elevator_uid(device_id: &str) -> String {
    format!("commax_elevator_{}", device_id)
}

pub fn master_light_uid() -> String {
    "commax_master_light_01".to_string()
}

/// One retained publish onto the discovery tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: String,
}

/// Parent device block shared by every entity.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            identifiers: vec!["Commax".to_string()],
            name: "월패드".to_string(),
            manufacturer: "Commax".to_string(),
        }
    }
}

#[derive(Serialize)]
struct SwitchConfig {
    name: String,
    unique_id: String,
    state_topic: String,
    command_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_off: Option<&'static str>,
    availability_topic: String,
    device: DeviceInfo,
}

#[derive(Serialize)]
struct SensorConfig {
    name: String,
    unique_id: String,
    state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_class: Option<&'static str>,
    availability_topic: String,
    device: DeviceInfo,
}

#[derive(Serialize)]
struct NumberConfig {
    name: String,
    unique_id: String,
    state_topic: String,
    command_topic: String,
    unit_of_measurement: &'static str,
    device_class: &'static str,
    min: u32,
    max: u32,
    mode: &'static str,
    availability_topic: String,
    device: DeviceInfo,
}

#[derive(Serialize)]
struct LightConfig {
    name: String,
    unique_id: String,
    state_topic: String,
    command_topic: String,
    payload_on: &'static str,
    payload_off: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness_state_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness_command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness_scale: Option<u8>,
    availability_topic: String,
    device: DeviceInfo,
}

/// Climate config with the abbreviated topic keys Home Assistant
/// accepts; the temperature bounds are strings by convention there.
#[derive(Serialize)]
struct ClimateConfig {
    name: String,
    unique_id: String,
    mode_cmd_t: String,
    mode_stat_t: String,
    curr_temp_t: String,
    min_temp: &'static str,
    max_temp: &'static str,
    temp_cmd_t: String,
    temp_stat_t: String,
    modes: Vec<&'static str>,
    availability_topic: String,
    device: DeviceInfo,
}

#[derive(Serialize)]
struct FanConfig {
    name: String,
    unique_id: String,
    command_topic: String,
    state_topic: String,
    percentage_command_topic: String,
    percentage_state_topic: String,
    preset_mode_command_topic: String,
    preset_mode_state_topic: String,
    preset_modes: Vec<&'static str>,
    speed_range_min: u8,
    speed_range_max: u8,
    availability_topic: String,
    device: DeviceInfo,
}

fn message<T: Serialize>(topic: String, config: &T) -> Option<DiscoveryMessage> {
    match serde_json::to_string(config) {
        Ok(payload) => Some(DiscoveryMessage { topic, payload }),
        Err(e) => {
            tracing::error!("Failed to encode discovery config for {}: {}", topic, e);
            None
        }
    }
}

/// Outlet entities: the relay switch plus live power, standby cutoff
/// number and auto/manual mode.
pub fn outlet_configs(prefix: &str, device_id: &str) -> Vec<DiscoveryMessage> {
    let uid = outlet_uid(device_id);
    let availability = availability_topic(prefix);

    let switch = SwitchConfig {
        name: format!("대기전력 {}", device_id),
        unique_id: uid.clone(),
        state_topic: state_topic(prefix, "outlet", device_id, "state"),
        command_topic: state_topic(prefix, "outlet", device_id, "set"),
        payload_on: Some("ON"),
        payload_off: Some("OFF"),
        availability_topic: availability.clone(),
        device: DeviceInfo::default(),
    };

    let current_power = SensorConfig {
        name: format!("대기전력 {} 실시간", device_id),
        unique_id: format!("{}_current_power", uid),
        state_topic: state_topic(prefix, "outlet", device_id, "current_power"),
        unit_of_measurement: Some("W"),
        device_class: Some("power"),
        state_class: None,
        availability_topic: availability.clone(),
        device: DeviceInfo::default(),
    };

    let standby_power = NumberConfig {
        name: format!("대기전력 {} 차단값", device_id),
        unique_id: format!("{}_standby_power", uid),
        state_topic: state_topic(prefix, "outlet", device_id, "standby_power"),
        command_topic: state_topic(prefix, "outlet", device_id, "standby_power/set"),
        unit_of_measurement: "W",
        device_class: "power",
        min: 0,
        max: 50,
        mode: "box",
        availability_topic: availability.clone(),
        device: DeviceInfo::default(),
    };

    let standby_mode = SwitchConfig {
        name: format!("대기전력 {} 모드", device_id),
        unique_id: format!("{}_standby_mode", uid),
        state_topic: state_topic(prefix, "outlet", device_id, "standby_mode"),
        command_topic: state_topic(prefix, "outlet", device_id, "standby_mode/set"),
        payload_on: Some("AUTO"),
        payload_off: Some("MANUAL"),
        availability_topic: availability,
        device: DeviceInfo::default(),
    };

    [
        message(format!("homeassistant/switch/{}/config", uid), &switch),
        message(
            format!("homeassistant/sensor/{}_current_power/config", uid),
            &current_power,
        ),
        message(
            format!("homeassistant/number/{}_standby_power/config", uid),
            &standby_power,
        ),
        message(
            format!("homeassistant/switch/{}_standby_mode/config", uid),
            &standby_mode,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Light entity; brightness topics only on dimmable circuits. The
/// discovery node is `light_{id}` rather than the unique id, kept for
/// compatibility with entities registered by earlier versions.
pub fn light_configs(prefix: &str, device_id: &str, dimmable: bool) -> Vec<DiscoveryMessage> {
    let uid = light_uid(device_id);

    let config = LightConfig {
        name: format!("조명 {}", device_id),
        unique_id: uid,
        state_topic: state_topic(prefix, "light", device_id, "state"),
        command_topic: state_topic(prefix, "light", device_id, "set"),
        payload_on: "ON",
        payload_off: "OFF",
        brightness_state_topic: dimmable
            .then(|| state_topic(prefix, "light", device_id, "brightness")),
        brightness_command_topic: dimmable
            .then(|| state_topic(prefix, "light", device_id, "brightness/set")),
        brightness_scale: dimmable.then_some(5),
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message(
        format!("homeassistant/light/light_{}/config", device_id),
        &config,
    )
    .into_iter()
    .collect()
}

/// Thermostat climate entity.
pub fn climate_configs(prefix: &str, device_id: &str) -> Vec<DiscoveryMessage> {
    let uid = temp_uid(device_id);

    let config = ClimateConfig {
        name: format!("난방 {}", device_id),
        unique_id: uid.clone(),
        mode_cmd_t: state_topic(prefix, "temp", device_id, "set_mode"),
        mode_stat_t: state_topic(prefix, "temp", device_id, "mode"),
        curr_temp_t: state_topic(prefix, "temp", device_id, "current_temp"),
        min_temp: "5",
        max_temp: "30",
        temp_cmd_t: state_topic(prefix, "temp", device_id, "set_temp"),
        temp_stat_t: state_topic(prefix, "temp", device_id, "target_temp"),
        modes: vec!["off", "heat"],
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message(format!("homeassistant/climate/{}/config", uid), &config)
        .into_iter()
        .collect()
}

/// Ventilation fan entity with three speeds and three presets.
pub fn fan_configs(prefix: &str, device_id: &str) -> Vec<DiscoveryMessage> {
    let uid = fan_uid(device_id);

    let config = FanConfig {
        name: "환기".to_string(),
        unique_id: uid.clone(),
        command_topic: state_topic(prefix, "fan", device_id, "set"),
        state_topic: state_topic(prefix, "fan", device_id, "state"),
        percentage_command_topic: state_topic(prefix, "fan", device_id, "set_speed"),
        percentage_state_topic: state_topic(prefix, "fan", device_id, "speed"),
        preset_mode_command_topic: state_topic(prefix, "fan", device_id, "set_mode"),
        preset_mode_state_topic: state_topic(prefix, "fan", device_id, "mode"),
        preset_modes: vec!["auto", "manual", "bypass"],
        speed_range_min: 1,
        speed_range_max: 3,
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message(format!("homeassistant/fan/{}/config", uid), &config)
        .into_iter()
        .collect()
}

/// Elevator call switch. The switch turns itself off once the cabin
/// arrives, driven by the status reports.
pub fn elevator_configs(prefix: &str, device_id: &str) -> Vec<DiscoveryMessage> {
    let uid = elevator_uid(device_id);

    let config = SwitchConfig {
        name: "엘레베이터".to_string(),
        unique_id: format!("{}_switch", uid),
        state_topic: state_topic(prefix, "elevator", device_id, "status"),
        command_topic: state_topic(prefix, "elevator", device_id, "set"),
        payload_on: None,
        payload_off: None,
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message(
        format!("homeassistant/switch/{}_switch/config", uid),
        &config,
    )
    .into_iter()
    .collect()
}

/// All-off master light switch. A single unit per flat, so the state
/// topics carry no device id.
pub fn master_light_configs(prefix: &str) -> Vec<DiscoveryMessage> {
    let uid = master_light_uid();

    let config = SwitchConfig {
        name: "일괄소등".to_string(),
        unique_id: uid.clone(),
        state_topic: singleton_topic(prefix, "master_light", "state"),
        command_topic: singleton_topic(prefix, "master_light", "set"),
        payload_on: None,
        payload_off: None,
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message(format!("homeassistant/switch/{}/config", uid), &config)
        .into_iter()
        .collect()
}

/// CO2, PM2.5 and PM10 sensors, announced together the first time any
/// air quality record shows up.
pub fn air_quality_configs(prefix: &str) -> Vec<DiscoveryMessage> {
    let sensors = [
        ("co2", "이산화탄소", "commax_co2", "ppm", "carbon_dioxide"),
        (
            "pm2_5",
            "초미세먼지(PM2.5)",
            "commax_pm2_5",
            "µg/m³",
            "pm25",
        ),
        ("pm10", "미세먼지(PM10)", "commax_pm10", "µg/m³", "pm10"),
    ];

    sensors
        .into_iter()
        .filter_map(|(channel, name, uid, unit, class)| {
            let config = SensorConfig {
                name: name.to_string(),
                unique_id: uid.to_string(),
                state_topic: state_topic(prefix, "air_quality", channel, "state"),
                unit_of_measurement: Some(unit),
                device_class: Some(class),
                state_class: None,
                availability_topic: availability_topic(prefix),
                device: DeviceInfo::default(),
            };
            message(format!("homeassistant/sensor/{}/config", uid), &config)
        })
        .collect()
}

/// Parking area position sensor.
pub fn parking_area_configs(prefix: &str) -> Vec<DiscoveryMessage> {
    let config = SensorConfig {
        name: "주차 위치".to_string(),
        unique_id: "commax_parking_area".to_string(),
        state_topic: singleton_topic(prefix, "parking", "area"),
        unit_of_measurement: None,
        device_class: None,
        state_class: None,
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message("homeassistant/sensor/parking_area/config".to_string(), &config)
        .into_iter()
        .collect()
}

/// Registered car number sensor.
pub fn car_number_configs(prefix: &str) -> Vec<DiscoveryMessage> {
    let config = SensorConfig {
        name: "주차 차량".to_string(),
        unique_id: "commax_car_number".to_string(),
        state_topic: singleton_topic(prefix, "parking", "car_number"),
        unit_of_measurement: None,
        device_class: None,
        state_class: None,
        availability_topic: availability_topic(prefix),
        device: DeviceInfo::default(),
    };

    message("homeassistant/sensor/car_number/config".to_string(), &config)
        .into_iter()
        .collect()
}

/// Utility metering sensors: four live flows and four lifetime totals.
pub fn metering_configs(prefix: &str) -> Vec<DiscoveryMessage> {
    struct Channel {
        channel: &'static str,
        name: &'static str,
        unit: &'static str,
        device_class: Option<&'static str>,
        state_class: &'static str,
    }

    let channels = [
        Channel {
            channel: "electric",
            name: "실시간 전기",
            unit: "W",
            device_class: Some("power"),
            state_class: "measurement",
        },
        Channel {
            channel: "water",
            name: "실시간 수도",
            unit: "L/min",
            device_class: None,
            state_class: "measurement",
        },
        Channel {
            channel: "warm_water",
            name: "실시간 온수",
            unit: "L/min",
            device_class: None,
            state_class: "measurement",
        },
        Channel {
            channel: "heat",
            name: "실시간 난방",
            unit: "L/min",
            device_class: None,
            state_class: "measurement",
        },
        Channel {
            channel: "electric_total",
            name: "누적 전기",
            unit: "kWh",
            device_class: Some("energy"),
            state_class: "total_increasing",
        },
        Channel {
            channel: "water_total",
            name: "누적 수도",
            unit: "m³",
            device_class: Some("water"),
            state_class: "total_increasing",
        },
        Channel {
            channel: "warm_water_total",
            name: "누적 온수",
            unit: "m³",
            device_class: Some("water"),
            state_class: "total_increasing",
        },
        Channel {
            channel: "heat_total",
            name: "누적 난방",
            unit: "m³",
            device_class: None,
            state_class: "total_increasing",
        },
    ];

    channels
        .into_iter()
        .filter_map(|c| {
            let uid = format!("{}_{}", METER_UID, c.channel);
            let config = SensorConfig {
                name: c.name.to_string(),
                unique_id: uid.clone(),
                state_topic: state_topic(prefix, "metering", c.channel, "state"),
                unit_of_measurement: Some(c.unit),
                device_class: c.device_class,
                state_class: Some(c.state_class),
                availability_topic: availability_topic(prefix),
                device: DeviceInfo::default(),
            };
            message(format!("homeassistant/sensor/{}/config", uid), &config)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(message: &DiscoveryMessage) -> Value {
        serde_json::from_str(&message.payload).unwrap()
    }

    #[test]
    fn test_outlet_announces_four_entities() {
        let messages = outlet_configs("devcommax", "05");
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0].topic,
            "homeassistant/switch/commax_outlet_05/config"
        );
        assert_eq!(
            messages[1].topic,
            "homeassistant/sensor/commax_outlet_05_current_power/config"
        );
        assert_eq!(
            messages[2].topic,
            "homeassistant/number/commax_outlet_05_standby_power/config"
        );
        assert_eq!(
            messages[3].topic,
            "homeassistant/switch/commax_outlet_05_standby_mode/config"
        );

        let switch = parse(&messages[0]);
        assert_eq!(switch["name"], "대기전력 05");
        assert_eq!(switch["state_topic"], "devcommax/outlet/05/state");
        assert_eq!(switch["command_topic"], "devcommax/outlet/05/set");
        assert_eq!(switch["payload_on"], "ON");
        assert_eq!(switch["device"]["identifiers"][0], "Commax");
        assert_eq!(switch["device"]["name"], "월패드");

        let number = parse(&messages[2]);
        assert_eq!(number["min"], 0);
        assert_eq!(number["max"], 50);
        assert_eq!(number["mode"], "box");
        assert_eq!(
            number["command_topic"],
            "devcommax/outlet/05/standby_power/set"
        );

        let mode = parse(&messages[3]);
        assert_eq!(mode["payload_on"], "AUTO");
        assert_eq!(mode["payload_off"], "MANUAL");
    }

    #[test]
    fn test_light_discovery_node_uses_plain_id() {
        let messages = light_configs("devcommax", "02", false);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "homeassistant/light/light_02/config");

        let config = parse(&messages[0]);
        assert_eq!(config["unique_id"], "commax_light_02");
        assert_eq!(config["name"], "조명 02");
        assert!(config.get("brightness_state_topic").is_none());
        assert!(config.get("brightness_scale").is_none());
    }

    #[test]
    fn test_dimmable_light_gains_brightness_topics() {
        let config = parse(&light_configs("devcommax", "02", true)[0]);
        assert_eq!(
            config["brightness_state_topic"],
            "devcommax/light/02/brightness"
        );
        assert_eq!(
            config["brightness_command_topic"],
            "devcommax/light/02/brightness/set"
        );
        assert_eq!(config["brightness_scale"], 5);
    }

    #[test]
    fn test_climate_uses_abbreviated_keys() {
        let messages = climate_configs("devcommax", "01");
        assert_eq!(
            messages[0].topic,
            "homeassistant/climate/commax_temp_01/config"
        );

        let config = parse(&messages[0]);
        assert_eq!(config["name"], "난방 01");
        assert_eq!(config["mode_cmd_t"], "devcommax/temp/01/set_mode");
        assert_eq!(config["curr_temp_t"], "devcommax/temp/01/current_temp");
        assert_eq!(config["temp_stat_t"], "devcommax/temp/01/target_temp");
        // Bounds are strings, not numbers
        assert_eq!(config["min_temp"], "5");
        assert_eq!(config["max_temp"], "30");
        assert_eq!(config["modes"][1], "heat");
    }

    #[test]
    fn test_fan_speeds_and_presets() {
        let config = parse(&fan_configs("devcommax", "01")[0]);
        assert_eq!(config["name"], "환기");
        assert_eq!(config["percentage_command_topic"], "devcommax/fan/01/set_speed");
        assert_eq!(config["preset_modes"][2], "bypass");
        assert_eq!(config["speed_range_min"], 1);
        assert_eq!(config["speed_range_max"], 3);
    }

    #[test]
    fn test_elevator_switch() {
        let messages = elevator_configs("devcommax", "01");
        assert_eq!(
            messages[0].topic,
            "homeassistant/switch/commax_elevator_01_switch/config"
        );

        let config = parse(&messages[0]);
        assert_eq!(config["name"], "엘레베이터");
        assert_eq!(config["unique_id"], "commax_elevator_01_switch");
        assert_eq!(config["state_topic"], "devcommax/elevator/01/status");
        assert_eq!(config["command_topic"], "devcommax/elevator/01/set");
        assert!(config.get("payload_on").is_none());
    }

    #[test]
    fn test_master_light_topics_have_no_id_segment() {
        let config = parse(&master_light_configs("devcommax")[0]);
        assert_eq!(config["name"], "일괄소등");
        assert_eq!(config["state_topic"], "devcommax/master_light/state");
        assert_eq!(config["command_topic"], "devcommax/master_light/set");
    }

    #[test]
    fn test_air_quality_announces_three_sensors() {
        let messages = air_quality_configs("devcommax");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].topic, "homeassistant/sensor/commax_co2/config");
        assert_eq!(messages[1].topic, "homeassistant/sensor/commax_pm2_5/config");
        assert_eq!(messages[2].topic, "homeassistant/sensor/commax_pm10/config");

        let co2 = parse(&messages[0]);
        assert_eq!(co2["name"], "이산화탄소");
        assert_eq!(co2["unit_of_measurement"], "ppm");
        assert_eq!(co2["device_class"], "carbon_dioxide");
        assert_eq!(co2["state_topic"], "devcommax/air_quality/co2/state");

        let pm25 = parse(&messages[1]);
        assert_eq!(pm25["name"], "초미세먼지(PM2.5)");
        assert_eq!(pm25["unit_of_measurement"], "µg/m³");
        assert_eq!(pm25["device_class"], "pm25");
    }

    #[test]
    fn test_parking_sensors() {
        let area = parse(&parking_area_configs("devcommax")[0]);
        assert_eq!(area["name"], "주차 위치");
        assert_eq!(area["unique_id"], "commax_parking_area");
        assert_eq!(area["state_topic"], "devcommax/parking/area");

        let car = parse(&car_number_configs("devcommax")[0]);
        assert_eq!(car["name"], "주차 차량");
        assert_eq!(car["state_topic"], "devcommax/parking/car_number");
    }

    #[test]
    fn test_metering_announces_eight_sensors() {
        let messages = metering_configs("devcommax");
        assert_eq!(messages.len(), 8);

        let electric = parse(&messages[0]);
        assert_eq!(electric["name"], "실시간 전기");
        assert_eq!(electric["unit_of_measurement"], "W");
        assert_eq!(electric["state_class"], "measurement");
        assert_eq!(electric["state_topic"], "devcommax/metering/electric/state");

        let electric_total = parse(&messages[4]);
        assert_eq!(electric_total["unit_of_measurement"], "kWh");
        assert_eq!(electric_total["device_class"], "energy");
        assert_eq!(electric_total["state_class"], "total_increasing");
    }

    #[test]
    fn test_every_payload_carries_availability_and_device() {
        let mut all = Vec::new();
        all.extend(outlet_configs("devcommax", "05"));
        all.extend(light_configs("devcommax", "01", true));
        all.extend(climate_configs("devcommax", "01"));
        all.extend(fan_configs("devcommax", "01"));
        all.extend(elevator_configs("devcommax", "01"));
        all.extend(master_light_configs("devcommax"));
        all.extend(air_quality_configs("devcommax"));
        all.extend(parking_area_configs("devcommax"));
        all.extend(car_number_configs("devcommax"));
        all.extend(metering_configs("devcommax"));

        for message in &all {
            let config = parse(message);
            assert_eq!(
                config["availability_topic"], "devcommax/availability",
                "missing availability in {}",
                message.topic
            );
            assert_eq!(
                config["device"]["manufacturer"], "Commax",
                "missing device block in {}",
                message.topic
            );
        }
    }
}
