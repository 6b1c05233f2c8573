//! MQTT command topic routing.
//!
//! Turns an inbound MQTT publish into a wallpad command frame plus the
//! retained state echoes Home Assistant expects straight away. The
//! wallpad confirms commands asynchronously, so the optimistic echo
//! keeps the UI snappy while the reliability layer chases the ack.
//!
//! # Design
//!
//! Routing is a pure decision over (topic, payload, now); the only
//! state is the timestamp of the last accepted light command, kept for
//! the brightness debounce. The caller submits the frame and publishes
//! the echoes.

use std::time::Duration;

use tokio::time::Instant;

use crate::mqtt::{singleton_topic, state_topic};
use crate::protocol::{
    command_bytes, decimal_as_hex, elevator_call, light_command, master_light_command,
    outlet_command, temperature_command, ventilation_command, Frame,
};

/// Home Assistant fires a plain ON right after a brightness command.
/// The light is already on at that point, so a power command arriving
/// within this window of the previous light command is dropped.
pub const LIGHT_DEBOUNCE: Duration = Duration::from_millis(10);

/// A routed command: the frame to send plus retained echo publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAction {
    pub frame: Frame,
    /// (topic, payload) pairs, published retained in order.
    pub echoes: Vec<(String, String)>,
}

/// Routing decision for one MQTT publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Command(CommandAction),
    /// Not a command topic: our own state echoes, discovery configs and
    /// foreign prefixes all land here.
    NotACommand,
    /// Light power command suppressed by the brightness debounce.
    Debounced,
    /// A command topic whose payload fails validation.
    Rejected { reason: &'static str },
}

pub struct CommandRouter {
    prefix: String,
    last_light_command: Option<Instant>,
}

impl CommandRouter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last_light_command: None,
        }
    }

    /// Route one publish. `now` feeds the light debounce window.
    pub fn route(&mut self, topic: &str, payload: &str, now: Instant) -> RouteOutcome {
        let segments: Vec<&str> = topic.split('/').collect();
        if segments[0] != self.prefix {
            return RouteOutcome::NotACommand;
        }
        let Some(&last) = segments.last() else {
            return RouteOutcome::NotACommand;
        };
        if !last.contains("set") && !last.contains("call") {
            return RouteOutcome::NotACommand;
        }
        let Some(&device) = segments.get(1) else {
            return RouteOutcome::NotACommand;
        };

        match device {
            "outlet" => self.route_outlet(&segments, payload),
            "light" => self.route_light(&segments, payload, now),
            "temp" => self.route_temp(&segments, last, payload),
            "fan" => self.route_fan(&segments, last, payload),
            "elevator" => self.route_elevator(&segments, last, payload),
            "master_light" => self.route_master_light(last, payload),
            _ => RouteOutcome::NotACommand,
        }
    }

    fn route_outlet(&self, segments: &[&str], payload: &str) -> RouteOutcome {
        let Some((byte, id)) = device_id_from(segments) else {
            return RouteOutcome::Rejected {
                reason: "outlet device id is not a hex byte",
            };
        };

        if segments.len() == 4 {
            let on = payload == "ON";
            return command(
                outlet_command(byte, command_bytes::OUTLET_POWER, u8::from(on), 0),
                vec![(
                    state_topic(&self.prefix, "outlet", id, "state"),
                    payload.to_string(),
                )],
            );
        }

        match segments[segments.len() - 2] {
            "standby_power" => {
                let Ok(power) = payload.trim().parse::<u16>() else {
                    return RouteOutcome::Rejected {
                        reason: "standby power must be an integer",
                    };
                };
                if power > 50 {
                    return RouteOutcome::Rejected {
                        reason: "standby power must be 0..=50 W",
                    };
                }
                command(
                    outlet_command(byte, command_bytes::OUTLET_STANDBY_POWER, 0x00, power),
                    vec![(
                        state_topic(&self.prefix, "outlet", id, "standby_power"),
                        power.to_string(),
                    )],
                )
            }
            "standby_mode" => {
                let auto = payload == "AUTO";
                command(
                    outlet_command(byte, command_bytes::OUTLET_STANDBY_MODE, u8::from(auto), 0),
                    vec![(
                        state_topic(&self.prefix, "outlet", id, "standby_mode"),
                        payload.to_string(),
                    )],
                )
            }
            _ => RouteOutcome::NotACommand,
        }
    }

    fn route_light(&mut self, segments: &[&str], payload: &str, now: Instant) -> RouteOutcome {
        let Some((byte, id)) = device_id_from(segments) else {
            return RouteOutcome::Rejected {
                reason: "light device id is not a hex byte",
            };
        };

        if segments[segments.len() - 2] == "brightness" {
            let Ok(level) = payload.trim().parse::<u8>() else {
                return RouteOutcome::Rejected {
                    reason: "brightness must be an integer",
                };
            };
            self.last_light_command = Some(now);
            return command(
                light_command(byte, command_bytes::LIGHT_SET_BRIGHTNESS, level),
                vec![
                    (
                        state_topic(&self.prefix, "light", id, "brightness"),
                        payload.to_string(),
                    ),
                    (
                        state_topic(&self.prefix, "light", id, "state"),
                        "ON".to_string(),
                    ),
                ],
            );
        }

        if let Some(previous) = self.last_light_command {
            if now.duration_since(previous) < LIGHT_DEBOUNCE {
                return RouteOutcome::Debounced;
            }
        }
        self.last_light_command = Some(now);

        let on = payload == "ON";
        let power = if on {
            command_bytes::LIGHT_ON
        } else {
            command_bytes::LIGHT_OFF
        };
        command(
            light_command(byte, power, 0),
            vec![(
                state_topic(&self.prefix, "light", id, "state"),
                if on { "ON" } else { "OFF" }.to_string(),
            )],
        )
    }

    fn route_temp(&self, segments: &[&str], last: &str, payload: &str) -> RouteOutcome {
        let Some((byte, id)) = device_id_from(segments) else {
            return RouteOutcome::Rejected {
                reason: "thermostat device id is not a hex byte",
            };
        };

        match last {
            "set_mode" => {
                let value = if payload == "off" {
                    command_bytes::TEMP_MODE_OFF
                } else {
                    command_bytes::TEMP_MODE_HEAT
                };
                command(
                    temperature_command(byte, command_bytes::TEMP_SET_MODE, value),
                    vec![(
                        state_topic(&self.prefix, "temp", id, "mode"),
                        payload.to_string(),
                    )],
                )
            }
            "set_temp" => {
                let Ok(degrees) = payload.trim().parse::<u8>() else {
                    return RouteOutcome::Rejected {
                        reason: "target temperature must be an integer",
                    };
                };
                if !(16..=30).contains(&degrees) {
                    return RouteOutcome::Rejected {
                        reason: "target temperature must be 16..=30",
                    };
                }
                // 25 degrees travels as byte 0x25
                let Some(value) = decimal_as_hex(degrees) else {
                    return RouteOutcome::Rejected {
                        reason: "target temperature must be 16..=30",
                    };
                };
                command(
                    temperature_command(byte, command_bytes::TEMP_SET_TEMP, value),
                    vec![
                        (
                            state_topic(&self.prefix, "temp", id, "mode"),
                            "heat".to_string(),
                        ),
                        (
                            state_topic(&self.prefix, "temp", id, "target_temp"),
                            degrees.to_string(),
                        ),
                    ],
                )
            }
            _ => RouteOutcome::NotACommand,
        }
    }

    fn route_fan(&self, segments: &[&str], last: &str, payload: &str) -> RouteOutcome {
        let Some((byte, id)) = device_id_from(segments) else {
            return RouteOutcome::Rejected {
                reason: "fan device id is not a hex byte",
            };
        };

        match last {
            "set" => {
                let value = if payload == "ON" {
                    command_bytes::VENT_ON
                } else {
                    command_bytes::VENT_OFF
                };
                command(
                    ventilation_command(byte, command_bytes::VENT_SET_POWER, value),
                    vec![(
                        state_topic(&self.prefix, "fan", id, "state"),
                        payload.to_string(),
                    )],
                )
            }
            "set_mode" => {
                let value = match payload {
                    "auto" => command_bytes::VENT_MODE_AUTO,
                    "bypass" => command_bytes::VENT_MODE_BYPASS,
                    _ => command_bytes::VENT_MODE_MANUAL,
                };
                command(
                    ventilation_command(byte, command_bytes::VENT_SET_POWER, value),
                    vec![(
                        state_topic(&self.prefix, "fan", id, "mode"),
                        payload.to_string(),
                    )],
                )
            }
            "set_speed" => {
                let Ok(speed) = payload.trim().parse::<u8>() else {
                    return RouteOutcome::Rejected {
                        reason: "fan speed must be an integer",
                    };
                };
                if speed > 3 {
                    return RouteOutcome::Rejected {
                        reason: "fan speed must be 0..=3",
                    };
                }
                if speed == 0 {
                    command(
                        ventilation_command(
                            byte,
                            command_bytes::VENT_SET_POWER,
                            command_bytes::VENT_OFF,
                        ),
                        vec![
                            (
                                state_topic(&self.prefix, "fan", id, "state"),
                                "OFF".to_string(),
                            ),
                            (
                                state_topic(&self.prefix, "fan", id, "speed"),
                                "0".to_string(),
                            ),
                        ],
                    )
                } else {
                    command(
                        ventilation_command(byte, command_bytes::VENT_SET_SPEED, speed),
                        vec![
                            (
                                state_topic(&self.prefix, "fan", id, "speed"),
                                speed.to_string(),
                            ),
                            (
                                state_topic(&self.prefix, "fan", id, "state"),
                                "ON".to_string(),
                            ),
                        ],
                    )
                }
            }
            _ => RouteOutcome::NotACommand,
        }
    }

    fn route_elevator(&self, segments: &[&str], last: &str, payload: &str) -> RouteOutcome {
        let Some((byte, id)) = device_id_from(segments) else {
            return RouteOutcome::Rejected {
                reason: "elevator device id is not a hex byte",
            };
        };

        // The switch reports OFF on arrival by itself; only an explicit
        // ON (or the dedicated call topic) summons the cabin.
        if last.contains("call") || payload == "ON" {
            return command(
                elevator_call(byte),
                vec![(
                    state_topic(&self.prefix, "elevator", id, "status"),
                    "ON".to_string(),
                )],
            );
        }
        RouteOutcome::NotACommand
    }

    fn route_master_light(&self, last: &str, payload: &str) -> RouteOutcome {
        if last != "set" {
            return RouteOutcome::NotACommand;
        }
        let on = payload == "ON";
        command(
            master_light_command(0x01, on),
            vec![(
                singleton_topic(&self.prefix, "master_light", "state"),
                payload.to_string(),
            )],
        )
    }
}

fn command(frame: Frame, echoes: Vec<(String, String)>) -> RouteOutcome {
    RouteOutcome::Command(CommandAction { frame, echoes })
}

/// Pull the device id out of topic segment 2, tolerating the entity
/// prefixes older discovery versions baked into ids.
fn device_id_from<'a>(segments: &[&'a str]) -> Option<(u8, &'a str)> {
    let raw = segments.get(2)?;
    let id = raw
        .strip_prefix("outlet_")
        .or_else(|| raw.strip_prefix("light_"))
        .or_else(|| raw.strip_prefix("temp_"))
        .unwrap_or(raw);
    let byte = u8::from_str_radix(id, 16).ok()?;
    Some((byte, id))
}
