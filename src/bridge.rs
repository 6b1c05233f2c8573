//! The bridge actor: one task that owns every piece of mutable state.
//!
//! # Architecture
//!
//! ```text
//!  gateway reader ──┐
//!  MQTT poll task ──┤                       ┌─> MQTT publishes
//!  retry timers ────┼──> inbox ──> Bridge ──┼─> gateway writer
//!  reconnect timer ─┤              (actor)  └─> timers respawned
//!  ctrl-c watcher ──┘
//! ```
//!
//! Producers only send [`BridgeEvent`]s; they never touch bridge state.
//! The actor loop processes events one at a time, so frame decoding,
//! discovery bookkeeping, ack correlation and queue draining all run
//! without locks. Timers are explicit tasks aborted on cancel; the
//! heartbeat and the optional drain tick are intervals owned by the
//! loop itself.

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::cadence::{CadenceDecision, CadenceMonitor, BOOTSTRAP_WINDOW, FALLBACK_DRAIN_INTERVAL};
use crate::codec::{
    self, AirQualityRecord, DecodeOutcome, ElevatorRecord, LightRecord, MasterLightRecord,
    MeteringRecord, OutletPowerKind, OutletRecord, ParkingRecord, ParticulateKind, Record,
    TemperatureRecord, VentilationRecord,
};
use crate::commands::{CommandRouter, RouteOutcome};
use crate::config::BridgeConfig;
use crate::discovery;
use crate::error::{BridgeError, Result};
use crate::mqtt::{availability_topic, singleton_topic, state_topic, MqttService};
use crate::protocol::{device_id_str, hex_pairs, DeviceType};
use crate::reliability::{CommandId, ReliabilityEngine};
use crate::state_store::{DiscoveryState, StateStore};
use crate::transport::{
    ConnectionState, GatewayConnection, GatewayId, ReconnectDisposition, DATA_SILENCE_TIMEOUT,
    MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY,
};

/// Gateway silence is checked once per tick.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

const INBOX_CAPACITY: usize = 64;

/// The ventilation unit and the elevator report no usable id; one per
/// flat, addressed as "01" like the wallpad does.
const FAN_ID: &str = "01";
const ELEVATOR_ID: &str = "01";

/// Everything that can happen to the bridge, from any producer task.
#[derive(Debug)]
pub enum BridgeEvent {
    GatewayConnected { gateway: GatewayId, stream: TcpStream },
    GatewayConnectFailed { gateway: GatewayId },
    GatewayData { gateway: GatewayId, bytes: Bytes },
    GatewayClosed { gateway: GatewayId },
    ReconnectDue { gateway: GatewayId },
    MqttConnected,
    MqttMessage { topic: String, payload: String },
    RetryTimeout(CommandId),
    CadenceWindowEnd,
    Shutdown,
}

/// What the loop does after one event.
enum Flow {
    Continue,
    Stop,
    Fail(BridgeError),
}

/// Builder wiring the bridge together. See [`Bridge::builder`].
pub struct BridgeBuilder {
    config: BridgeConfig,
}

impl BridgeBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire everything up and kick off the first connect attempts.
    ///
    /// Connections are lazy on both sides: MQTT connects inside its
    /// poll task and the gateway sockets connect in the background, so
    /// this returns immediately.
    pub async fn start(self) -> Bridge {
        let config = self.config;

        // 1. Bridge inbox; every producer posts here
        let (events, inbox) = mpsc::channel(INBOX_CAPACITY);

        // 2. Persisted discovery state
        let store = StateStore::new(&config.state_path);
        let state = store.load().await;

        // 3. Broker session and its poll task
        let mqtt = MqttService::connect(&config, events.clone());

        // 4. Wallpad gateways; commands only ever go to the primary
        let mut primary = GatewayConnection::new(
            GatewayId::Primary,
            config.ew11_host.clone(),
            config.ew11_port,
            events.clone(),
        );
        primary.begin_connect();

        let metering = config.metering_gateway().map(|(host, port)| {
            let mut connection =
                GatewayConnection::new(GatewayId::Metering, host.to_string(), port, events.clone());
            connection.begin_connect();
            connection
        });

        // 5. Ctrl-C becomes a Shutdown event
        let shutdown_events = events.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_events.send(BridgeEvent::Shutdown).await;
            }
        });

        let router = CommandRouter::new(config.mqtt_topic_prefix.clone());
        let engine = ReliabilityEngine::new(events.clone());

        Bridge {
            config,
            inbox,
            events,
            mqtt,
            router,
            engine,
            cadence: CadenceMonitor::new(),
            cadence_window: None,
            drain_tick: None,
            primary,
            metering,
            state,
            store,
            signal_task: Some(signal_task),
        }
    }
}

/// The wallpad ↔ MQTT bridge.
pub struct Bridge {
    config: BridgeConfig,
    inbox: mpsc::Receiver<BridgeEvent>,
    /// Kept for timers the loop spawns itself (cadence window).
    events: mpsc::Sender<BridgeEvent>,
    mqtt: MqttService,
    router: CommandRouter,
    engine: ReliabilityEngine,
    cadence: CadenceMonitor,
    cadence_window: Option<JoinHandle<()>>,
    drain_tick: Option<tokio::time::Interval>,
    primary: GatewayConnection,
    metering: Option<GatewayConnection>,
    state: DiscoveryState,
    store: StateStore,
    signal_task: Option<JoinHandle<()>>,
}

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder {
            config: BridgeConfig::default(),
        }
    }

    /// Run the actor loop until shutdown or the primary gateway runs
    /// out of reconnect attempts.
    pub async fn run(mut self) -> Result<()> {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

        let outcome = loop {
            tokio::select! {
                maybe = self.inbox.recv() => {
                    let Some(event) = maybe else { break Ok(()) };
                    match self.handle_event(event).await {
                        Flow::Continue => {}
                        Flow::Stop => break Ok(()),
                        Flow::Fail(e) => break Err(e),
                    }
                }
                _ = heartbeat.tick() => {
                    match self.on_heartbeat().await {
                        Flow::Continue => {}
                        Flow::Stop => break Ok(()),
                        Flow::Fail(e) => break Err(e),
                    }
                }
                _ = poll_drain(&mut self.drain_tick) => {
                    self.drain_primary();
                }
            }
        };

        self.shutdown().await;
        outcome
    }

    async fn handle_event(&mut self, event: BridgeEvent) -> Flow {
        match event {
            BridgeEvent::GatewayConnected { gateway, stream } => {
                let flipped = {
                    let Some(connection) = self.gateway_mut(gateway) else {
                        return Flow::Continue;
                    };
                    connection.on_connected(stream);
                    gateway == GatewayId::Primary && connection.mark_available()
                };
                if flipped {
                    self.publish_availability("online").await;
                }
                Flow::Continue
            }

            BridgeEvent::GatewayConnectFailed { gateway } => {
                let Some(connection) = self.gateway_mut(gateway) else {
                    return Flow::Continue;
                };
                let disposition = connection.on_connect_failed();
                self.apply_reconnect(gateway, disposition)
            }

            BridgeEvent::GatewayData { gateway, bytes } => {
                let now = Instant::now();
                if self.cadence.record_arrival(now) {
                    self.start_cadence_window();
                }
                let records = {
                    let Some(connection) = self.gateway_mut(gateway) else {
                        return Flow::Continue;
                    };
                    connection.record_data(now);
                    connection.push_bytes(&bytes)
                };
                for raw in records {
                    self.handle_record(&raw).await;
                }
                self.drain_primary();
                Flow::Continue
            }

            BridgeEvent::GatewayClosed { gateway } => {
                let (flipped, disposition) = {
                    let Some(connection) = self.gateway_mut(gateway) else {
                        return Flow::Continue;
                    };
                    let flipped =
                        gateway == GatewayId::Primary && connection.mark_unavailable();
                    (flipped, connection.on_closed())
                };
                if flipped {
                    self.publish_availability("offline").await;
                }
                match disposition {
                    Some(disposition) => self.apply_reconnect(gateway, disposition),
                    None => Flow::Continue,
                }
            }

            BridgeEvent::ReconnectDue { gateway } => {
                if let Some(connection) = self.gateway_mut(gateway) {
                    connection.begin_connect();
                }
                Flow::Continue
            }

            BridgeEvent::MqttConnected => {
                // Re-assert availability on every broker (re)connect; the
                // retained value may predate this process
                let online = self.primary.state() == ConnectionState::Connected;
                self.publish_availability(if online { "online" } else { "offline" })
                    .await;
                Flow::Continue
            }

            BridgeEvent::MqttMessage { topic, payload } => {
                self.handle_mqtt_message(&topic, &payload).await;
                Flow::Continue
            }

            BridgeEvent::RetryTimeout(id) => {
                self.engine.on_retry_timeout(id);
                Flow::Continue
            }

            BridgeEvent::CadenceWindowEnd => {
                self.apply_cadence_decision();
                Flow::Continue
            }

            BridgeEvent::Shutdown => Flow::Stop,
        }
    }

    async fn handle_mqtt_message(&mut self, topic: &str, payload: &str) {
        match self.router.route(topic, payload, Instant::now()) {
            RouteOutcome::Command(action) => {
                self.engine.submit(action.frame);
                for (echo_topic, echo_payload) in &action.echoes {
                    self.mqtt.publish_retained(echo_topic, echo_payload).await;
                }
            }
            RouteOutcome::Rejected { reason } => {
                tracing::warn!("Rejected command {} {:?}: {}", topic, payload, reason);
            }
            RouteOutcome::Debounced => {
                tracing::debug!("Debounced light command {}", topic);
            }
            RouteOutcome::NotACommand => {}
        }
    }

    /// Decode one reassembled record, publish its state and clear any
    /// pending command it acknowledges. State first, ack second,
    /// keeping the original processing order.
    async fn handle_record(&mut self, raw: &[u8]) {
        match codec::decode(raw) {
            DecodeOutcome::Record(record) => {
                self.publish_record(&record).await;
                if let Some(key) = codec::ack_key(raw) {
                    self.engine.on_inbound(key);
                }
            }
            DecodeOutcome::ChecksumInvalid { header } => {
                tracing::warn!("Dropping corrupt {:02X} record: {}", header, hex_pairs(raw));
            }
            DecodeOutcome::FieldInvalid { header } => {
                tracing::debug!(
                    "Dropping {:02X} record with out-of-range field: {}",
                    header,
                    hex_pairs(raw)
                );
            }
            DecodeOutcome::Unknown { known_header: true } => {}
            DecodeOutcome::Unknown { known_header: false } => {
                tracing::debug!("Unknown bytes: {}", hex_pairs(raw));
            }
        }
    }

    async fn publish_record(&mut self, record: &Record) {
        match record {
            Record::Outlet(outlet) => self.publish_outlet(outlet).await,
            Record::Light(light) => self.publish_light(light).await,
            Record::Temperature(temp) => self.publish_temperature(temp).await,
            Record::Ventilation(fan) => self.publish_ventilation(fan).await,
            Record::MasterLight(master) => self.publish_master_light(master).await,
            Record::Elevator(elevator) => self.publish_elevator(elevator).await,
            Record::AirQuality(air) => self.publish_air_quality(air).await,
            Record::Metering(meter) => self.publish_metering(meter).await,
            Record::Parking(parking) => self.publish_parking(parking).await,
        }
    }

    async fn publish_outlet(&mut self, record: &OutletRecord) {
        let id = device_id_str(record.device_id);
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::Outlet, &discovery::outlet_uid(&id)) {
            self.announce(discovery::outlet_configs(prefix, &id)).await;
            self.persist().await;
        }

        let state = if record.state.is_on() { "ON" } else { "OFF" };
        self.mqtt
            .publish_retained(&state_topic(prefix, "outlet", &id, "state"), state)
            .await;

        let mode = if record.state.is_auto() { "AUTO" } else { "MANUAL" };
        self.mqtt
            .publish_retained(&state_topic(prefix, "outlet", &id, "standby_mode"), mode)
            .await;

        if let Some(power) = record.power {
            let attribute = match record.power_kind {
                OutletPowerKind::Current => "current_power",
                OutletPowerKind::Standby => "standby_power",
            };
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "outlet", &id, attribute),
                    &power.to_string(),
                )
                .await;
        }
    }

    async fn publish_light(&mut self, record: &LightRecord) {
        let id = device_id_str(record.device_id);
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::Light, &discovery::light_uid(&id)) {
            self.announce(discovery::light_configs(prefix, &id, record.dimmable))
                .await;
            self.persist().await;
        }

        let state = if record.on { "ON" } else { "OFF" };
        self.mqtt
            .publish_retained(&state_topic(prefix, "light", &id, "state"), state)
            .await;

        if record.dimmable {
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "light", &id, "brightness"),
                    &record.brightness.to_string(),
                )
                .await;
        }
    }

    async fn publish_temperature(&mut self, record: &TemperatureRecord) {
        let id = device_id_str(record.device_id);
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::Temperature, &discovery::temp_uid(&id)) {
            self.announce(discovery::climate_configs(prefix, &id)).await;
            self.persist().await;
        }

        self.mqtt
            .publish_retained(
                &state_topic(prefix, "temp", &id, "mode"),
                record.state.mode_label(),
            )
            .await;

        if let Some(current) = record.current_temp {
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "temp", &id, "current_temp"),
                    &current.to_string(),
                )
                .await;
        }
        if let Some(target) = record.target_temp {
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "temp", &id, "target_temp"),
                    &target.to_string(),
                )
                .await;
        }
    }

    async fn publish_ventilation(&mut self, record: &VentilationRecord) {
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::Ventilation, &discovery::fan_uid(FAN_ID)) {
            self.announce(discovery::fan_configs(prefix, FAN_ID)).await;
            self.persist().await;
        }

        let state = if record.is_on() { "ON" } else { "OFF" };
        self.mqtt
            .publish_retained(&state_topic(prefix, "fan", FAN_ID, "state"), state)
            .await;
        self.mqtt
            .publish_retained(&state_topic(prefix, "fan", FAN_ID, "mode"), record.preset())
            .await;
        self.mqtt
            .publish_retained(
                &state_topic(prefix, "fan", FAN_ID, "speed"),
                record.speed_label(),
            )
            .await;
    }

    async fn publish_master_light(&mut self, record: &MasterLightRecord) {
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::MasterLight, &discovery::master_light_uid()) {
            self.announce(discovery::master_light_configs(prefix)).await;
            self.persist().await;
        }

        let state = if record.on { "ON" } else { "OFF" };
        self.mqtt
            .publish_retained(&singleton_topic(prefix, "master_light", "state"), state)
            .await;
    }

    async fn publish_elevator(&mut self, record: &ElevatorRecord) {
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::Elevator, &discovery::elevator_uid(ELEVATOR_ID)) {
            // Birth state before the config, so the switch starts off
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "elevator", ELEVATOR_ID, "status"),
                    "OFF",
                )
                .await;
            self.announce(discovery::elevator_configs(prefix, ELEVATOR_ID))
                .await;
            self.persist().await;
        }

        if let Some(payload) = record.status_payload() {
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "elevator", ELEVATOR_ID, "status"),
                    payload,
                )
                .await;
        }
    }

    async fn publish_air_quality(&mut self, record: &AirQualityRecord) {
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::AirQuality, discovery::AIR_QUALITY_UID) {
            self.announce(discovery::air_quality_configs(prefix)).await;
            self.persist().await;
        }

        if let Some(co2) = record.co2 {
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "air_quality", "co2", "state"),
                    &co2.to_string(),
                )
                .await;
        }

        let channel = match record.particulate_kind {
            ParticulateKind::Pm25 => "pm2_5",
            ParticulateKind::Pm10 => "pm10",
        };
        self.mqtt
            .publish_retained(
                &state_topic(prefix, "air_quality", channel, "state"),
                &record.particulate_label(),
            )
            .await;
    }

    async fn publish_metering(&mut self, record: &MeteringRecord) {
        let prefix = &self.config.mqtt_topic_prefix;

        if self.state.mark_discovered(DeviceType::Metering, discovery::METER_UID) {
            self.announce(discovery::metering_configs(prefix)).await;
            self.persist().await;
        }

        if let Some(watts) = record.electric_w {
            self.mqtt
                .publish_retained(
                    &state_topic(prefix, "metering", "electric", "state"),
                    &watts.to_string(),
                )
                .await;
        }

        let flows = [
            ("water", record.water_flow),
            ("warm_water", record.warm_water_flow),
            ("heat", record.heat_flow),
        ];
        for (channel, value) in flows {
            if let Some(flow) = value {
                self.mqtt
                    .publish_retained(
                        &state_topic(prefix, "metering", channel, "state"),
                        &format!("{:.1}", flow),
                    )
                    .await;
            }
        }

        let totals = [
            ("electric_total", record.electric_total_kwh),
            ("water_total", record.water_total),
            ("warm_water_total", record.warm_water_total),
            ("heat_total", record.heat_total),
        ];
        for (channel, value) in totals {
            if let Some(total) = value {
                self.mqtt
                    .publish_retained(
                        &state_topic(prefix, "metering", channel, "state"),
                        &format!("{:.2}", total),
                    )
                    .await;
            }
        }
    }

    async fn publish_parking(&mut self, record: &ParkingRecord) {
        let prefix = &self.config.mqtt_topic_prefix;

        if let Some(area) = &record.area {
            if self.state.mark_parking_discovered() {
                self.announce(discovery::parking_area_configs(prefix)).await;
                self.persist().await;
            }
            tracing::info!("-> ParkingArea : {}", area);
            self.mqtt
                .publish_retained(&singleton_topic(prefix, "parking", "area"), area)
                .await;
        }

        if let Some(car_number) = &record.car_number {
            if self.state.mark_car_number_discovered() {
                self.announce(discovery::car_number_configs(prefix)).await;
                self.persist().await;
            }
            tracing::info!("-> CarNumber : {}", car_number);
            self.mqtt
                .publish_retained(&singleton_topic(prefix, "parking", "car_number"), car_number)
                .await;
        }
    }

    async fn announce(&self, messages: Vec<discovery::DiscoveryMessage>) {
        for message in messages {
            self.mqtt
                .publish_retained(&message.topic, &message.payload)
                .await;
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.state).await {
            tracing::error!("Failed to persist discovery state: {}", e);
        }
    }

    async fn publish_availability(&self, payload: &str) {
        let topic = availability_topic(&self.config.mqtt_topic_prefix);
        self.mqtt.publish_retained(&topic, payload).await;
    }

    fn apply_reconnect(&mut self, gateway: GatewayId, disposition: ReconnectDisposition) -> Flow {
        match disposition {
            ReconnectDisposition::Scheduled { attempt } => {
                tracing::info!(
                    "{} gateway reconnect {}/{} in {}s",
                    gateway.name(),
                    attempt,
                    MAX_RECONNECT_ATTEMPTS,
                    RECONNECT_DELAY.as_secs()
                );
                Flow::Continue
            }
            ReconnectDisposition::Exhausted => {
                if gateway == GatewayId::Primary {
                    tracing::error!(
                        "primary gateway unreachable after {} attempts, giving up",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    Flow::Fail(BridgeError::ReconnectExhausted(MAX_RECONNECT_ATTEMPTS))
                } else {
                    tracing::warn!(
                        "metering gateway unreachable after {} attempts, continuing without it",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    Flow::Continue
                }
            }
        }
    }

    async fn on_heartbeat(&mut self) -> Flow {
        let now = Instant::now();
        match self.check_silence(GatewayId::Primary, now).await {
            Flow::Continue => {}
            other => return other,
        }
        if self.metering.is_some() {
            return self.check_silence(GatewayId::Metering, now).await;
        }
        Flow::Continue
    }

    async fn check_silence(&mut self, gateway: GatewayId, now: Instant) -> Flow {
        let silent = match self.gateway(gateway) {
            Some(connection) => connection.check_silence(now),
            None => false,
        };
        if !silent {
            return Flow::Continue;
        }

        tracing::warn!(
            "{} gateway silent for {}s, reconnecting",
            gateway.name(),
            DATA_SILENCE_TIMEOUT.as_secs()
        );
        let (flipped, disposition) = {
            let Some(connection) = self.gateway_mut(gateway) else {
                return Flow::Continue;
            };
            connection.force_close();
            let flipped = gateway == GatewayId::Primary && connection.mark_unavailable();
            (flipped, connection.on_closed())
        };
        if flipped {
            self.publish_availability("offline").await;
        }
        match disposition {
            Some(disposition) => self.apply_reconnect(gateway, disposition),
            None => Flow::Continue,
        }
    }

    fn start_cadence_window(&mut self) {
        tracing::debug!(
            "First wallpad data, starting {}s cadence window",
            BOOTSTRAP_WINDOW.as_secs()
        );
        let events = self.events.clone();
        self.cadence_window = Some(tokio::spawn(async move {
            tokio::time::sleep(BOOTSTRAP_WINDOW).await;
            let _ = events.send(BridgeEvent::CadenceWindowEnd).await;
        }));
    }

    fn apply_cadence_decision(&mut self) {
        match self.cadence.decide() {
            CadenceDecision::NoTraffic => {
                tracing::warn!("No wallpad traffic since the first frame, check the gateway");
            }
            CadenceDecision::Chatty => {
                tracing::info!("Bus traffic is dense, draining commands on arrivals");
            }
            CadenceDecision::NeedsFallbackTimer => {
                tracing::info!(
                    "Bus traffic is sparse, draining commands every {}ms",
                    FALLBACK_DRAIN_INTERVAL.as_millis()
                );
                self.drain_tick = Some(tokio::time::interval(FALLBACK_DRAIN_INTERVAL));
            }
        }
    }

    /// Write at most one queued frame to the primary gateway.
    fn drain_primary(&mut self) {
        if let Some(writer) = self.primary.writer() {
            self.engine.drain(writer);
        }
    }

    fn gateway(&self, id: GatewayId) -> Option<&GatewayConnection> {
        match id {
            GatewayId::Primary => Some(&self.primary),
            GatewayId::Metering => self.metering.as_ref(),
        }
    }

    fn gateway_mut(&mut self, id: GatewayId) -> Option<&mut GatewayConnection> {
        match id {
            GatewayId::Primary => Some(&mut self.primary),
            GatewayId::Metering => self.metering.as_mut(),
        }
    }

    async fn shutdown(&mut self) {
        tracing::info!("Shutting down");
        self.publish_availability("offline").await;
        self.engine.shutdown();
        if let Some(window) = self.cadence_window.take() {
            window.abort();
        }
        self.persist().await;
        self.mqtt.disconnect().await;
        self.primary.shutdown();
        if let Some(metering) = self.metering.as_mut() {
            metering.shutdown();
        }
        if let Some(signal) = self.signal_task.take() {
            signal.abort();
        }
        tracing::info!("Connection closed");
    }
}

/// Tick the drain interval when armed; park forever when it is not.
async fn poll_drain(tick: &mut Option<tokio::time::Interval>) {
    match tick {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
