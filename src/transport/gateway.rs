//! TCP connection management for EW11 serial gateways.
//!
//! The EW11 bridges the wallpad's RS-485 bus onto a raw TCP socket. It
//! keeps no session state and drops the connection silently when the
//! Wi-Fi side hiccups, so the connection is supervised: inbound data is
//! timestamped, prolonged silence tears the socket down and a bounded
//! reconnect schedule brings it back.
//!
//! A [`GatewayConnection`] owns the socket tasks but none of the
//! decisions. Reader, writer and timers post [`BridgeEvent`]s into the
//! bridge inbox; the bridge task drives the state machine by calling
//! back in.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bridge::BridgeEvent;
use crate::error::Result;
use crate::protocol::FrameBuffer;
use crate::writer::{spawn_writer_task_default, WriterHandle};

/// How long a connect attempt may take before it counts as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Inbound silence after which a connected gateway is considered dead.
/// The wallpad polls its devices continuously, so a healthy bus is never
/// quiet for long.
pub const DATA_SILENCE_TIMEOUT: Duration = Duration::from_secs(20);

/// Pause between reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Reconnect attempts before the connection is declared lost for good.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Which physical gateway a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayId {
    /// The wallpad control bus.
    Primary,
    /// The separate bus carrying utility metering records.
    Metering,
}

impl GatewayId {
    pub fn name(&self) -> &'static str {
        match self {
            GatewayId::Primary => "primary",
            GatewayId::Metering => "metering",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What a closed or failed connection does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDisposition {
    /// A reconnect timer is running; `attempt` counts from 1.
    Scheduled { attempt: u32 },
    /// The retry budget is spent. The connection stays down.
    Exhausted,
}

/// Supervised TCP connection to one EW11 gateway.
#[derive(Debug)]
pub struct GatewayConnection {
    id: GatewayId,
    host: String,
    port: u16,
    state: ConnectionState,
    /// When the socket last produced bytes.
    last_data: Instant,
    reconnect_attempts: u32,
    available: bool,
    terminal: bool,
    buffer: FrameBuffer,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<Result<()>>>,
    connect_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    writer: Option<WriterHandle>,
    events: mpsc::Sender<BridgeEvent>,
}

impl GatewayConnection {
    pub fn new(id: GatewayId, host: String, port: u16, events: mpsc::Sender<BridgeEvent>) -> Self {
        Self {
            id,
            host,
            port,
            state: ConnectionState::Disconnected,
            last_data: Instant::now(),
            reconnect_attempts: 0,
            available: false,
            terminal: false,
            buffer: FrameBuffer::new(),
            reader_task: None,
            writer_task: None,
            connect_task: None,
            reconnect_timer: None,
            writer: None,
            events,
        }
    }

    /// Kick off a connect attempt in the background.
    ///
    /// The outcome arrives as [`BridgeEvent::GatewayConnected`] or
    /// [`BridgeEvent::GatewayConnectFailed`].
    pub fn begin_connect(&mut self) {
        if self.terminal
            || matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            return;
        }
        self.state = ConnectionState::Connecting;

        let addr = format!("{}:{}", self.host, self.port);
        let gateway = self.id;
        let events = self.events.clone();
        tracing::info!("Connecting to {} gateway at {}", gateway.name(), addr);

        self.connect_task = Some(tokio::spawn(async move {
            let event = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await
            {
                Ok(Ok(stream)) => BridgeEvent::GatewayConnected { gateway, stream },
                Ok(Err(e)) => {
                    tracing::warn!("{} gateway connect failed: {}", gateway.name(), e);
                    BridgeEvent::GatewayConnectFailed { gateway }
                }
                Err(_) => {
                    tracing::warn!("{} gateway connect timed out", gateway.name());
                    BridgeEvent::GatewayConnectFailed { gateway }
                }
            };
            let _ = events.send(event).await;
        }));
    }

    /// Install a freshly connected socket.
    pub fn on_connected(&mut self, stream: TcpStream) {
        let (reader, write_half) = stream.into_split();
        self.install(reader, write_half);
        tracing::info!("{} gateway connected", self.id.name());
    }

    fn install<R, W>(&mut self, reader: R, write_half: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.abort_io_tasks();

        let gateway = self.id;
        let events = self.events.clone();
        self.reader_task = Some(tokio::spawn(read_loop(reader, gateway, events)));

        let (writer, writer_task) = spawn_writer_task_default(write_half);
        self.writer = Some(writer);
        self.writer_task = Some(writer_task);

        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        // A stale partial record must never prefix the new stream
        self.buffer.clear();
        self.last_data = Instant::now();
    }

    /// Feed raw socket bytes through the frame buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        self.buffer.push(bytes)
    }

    /// Note an inbound data arrival for silence tracking.
    pub fn record_data(&mut self, now: Instant) {
        self.last_data = now;
    }

    /// Whether the line has been quiet past the silence limit.
    pub fn check_silence(&self, now: Instant) -> bool {
        self.state == ConnectionState::Connected
            && now.duration_since(self.last_data) > DATA_SILENCE_TIMEOUT
    }

    /// Tear down the socket tasks without scheduling anything.
    ///
    /// The aborted reader cannot post its own Closed event, so the caller
    /// follows up with [`on_closed`](Self::on_closed).
    pub fn force_close(&mut self) {
        self.abort_io_tasks();
        self.writer = None;
    }

    /// Handle the connection dropping. Returns `None` when the connection
    /// was already down (a late Closed event from an aborted reader).
    pub fn on_closed(&mut self) -> Option<ReconnectDisposition> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        self.state = ConnectionState::Disconnected;
        self.abort_io_tasks();
        self.writer = None;
        Some(self.schedule_reconnect())
    }

    /// Handle a connect attempt failing.
    pub fn on_connect_failed(&mut self) -> ReconnectDisposition {
        self.state = ConnectionState::Disconnected;
        self.schedule_reconnect()
    }

    fn schedule_reconnect(&mut self) -> ReconnectDisposition {
        if self.reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
            self.terminal = true;
            return ReconnectDisposition::Exhausted;
        }
        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;

        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        let gateway = self.id;
        let events = self.events.clone();
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(RECONNECT_DELAY).await;
            let _ = events.send(BridgeEvent::ReconnectDue { gateway }).await;
        }));

        ReconnectDisposition::Scheduled { attempt }
    }

    /// Record the gateway as usable. True when that is a change.
    pub fn mark_available(&mut self) -> bool {
        !std::mem::replace(&mut self.available, true)
    }

    /// Record the gateway as unusable. True when that is a change.
    pub fn mark_unavailable(&mut self) -> bool {
        std::mem::replace(&mut self.available, false)
    }

    pub fn id(&self) -> GatewayId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Writer for the current socket, if connected.
    pub fn writer(&self) -> Option<&WriterHandle> {
        self.writer.as_ref()
    }

    /// Whether the reconnect budget is spent.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Abort every task this connection owns.
    pub fn shutdown(&mut self) {
        self.abort_io_tasks();
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        self.writer = None;
        self.state = ConnectionState::Disconnected;
    }

    fn abort_io_tasks(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.writer_task.take() {
            task.abort();
        }
    }
}

/// Socket read loop: forwards raw chunks into the bridge inbox until the
/// socket closes or errors.
async fn read_loop<R>(mut reader: R, gateway: GatewayId, events: mpsc::Sender<BridgeEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let bytes = Bytes::copy_from_slice(&buf[..n]);
                if events
                    .send(BridgeEvent::GatewayData { gateway, bytes })
                    .await
                    .is_err()
                {
                    // Bridge is gone; no one left to tell
                    return;
                }
            }
            Err(e) => {
                tracing::warn!("{} gateway read error: {}", gateway.name(), e);
                break;
            }
        }
    }
    let _ = events.send(BridgeEvent::GatewayClosed { gateway }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use crate::protocol::outlet_command;

    fn connection() -> (GatewayConnection, mpsc::Receiver<BridgeEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = GatewayConnection::new(GatewayId::Primary, "localhost".into(), 8899, tx);
        (conn, rx)
    }

    #[tokio::test]
    async fn test_install_pipes_data_to_events() {
        let (mut conn, mut rx) = connection();
        let (near, mut far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        assert_eq!(conn.state(), ConnectionState::Connected);

        far.write_all(&[0xF9, 0x11, 0x05]).await.unwrap();
        let event = rx.recv().await.unwrap();
        let BridgeEvent::GatewayData { gateway, bytes } = event else {
            panic!("expected data event, got {:?}", event);
        };
        assert_eq!(gateway, GatewayId::Primary);
        assert_eq!(&bytes[..], &[0xF9, 0x11, 0x05]);
    }

    #[tokio::test]
    async fn test_installed_writer_reaches_socket() {
        let (mut conn, _rx) = connection();
        let (near, mut far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        let frame = outlet_command(0x05, 0x01, 0x01, 0);
        conn.writer().unwrap().try_send(frame).unwrap();

        let mut buf = [0u8; 8];
        far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, frame.as_bytes());
    }

    #[tokio::test]
    async fn test_socket_close_posts_closed_event() {
        let (mut conn, mut rx) = connection();
        let (near, far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        drop(far);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            BridgeEvent::GatewayClosed {
                gateway: GatewayId::Primary
            }
        ));
    }

    #[tokio::test]
    async fn test_silence_detection() {
        let (mut conn, _rx) = connection();
        let (near, _far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        let now = Instant::now();
        conn.record_data(now);

        assert!(!conn.check_silence(now + Duration::from_secs(19)));
        assert!(conn.check_silence(now + Duration::from_secs(21)));
    }

    #[tokio::test]
    async fn test_silence_needs_connected_state() {
        let (conn, _rx) = connection();
        let now = Instant::now();
        assert!(!conn.check_silence(now + Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_reconnect_budget() {
        let (mut conn, _rx) = connection();

        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            assert_eq!(
                conn.on_connect_failed(),
                ReconnectDisposition::Scheduled { attempt }
            );
            assert!(!conn.is_terminal());
        }

        assert_eq!(conn.on_connect_failed(), ReconnectDisposition::Exhausted);
        assert!(conn.is_terminal());
    }

    #[tokio::test]
    async fn test_successful_connect_resets_budget() {
        let (mut conn, _rx) = connection();

        conn.on_connect_failed();
        conn.on_connect_failed();

        let (near, _far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        // The next failure counts from one again
        let disposition = conn.on_closed();
        assert_eq!(
            disposition,
            Some(ReconnectDisposition::Scheduled { attempt: 1 })
        );
    }

    #[tokio::test]
    async fn test_on_closed_is_idempotent() {
        let (mut conn, _rx) = connection();
        let (near, _far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        assert!(conn.on_closed().is_some());
        assert!(conn.on_closed().is_none());
        assert!(conn.writer().is_none());
    }

    #[tokio::test]
    async fn test_force_close_then_on_closed_schedules_once() {
        let (mut conn, _rx) = connection();
        let (near, _far) = duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        conn.install(reader, writer);

        conn.force_close();
        assert!(conn.writer().is_none());

        assert_eq!(
            conn.on_closed(),
            Some(ReconnectDisposition::Scheduled { attempt: 1 })
        );
        // The aborted reader cannot double-schedule
        assert!(conn.on_closed().is_none());
    }

    #[tokio::test]
    async fn test_availability_flips() {
        let (mut conn, _rx) = connection();

        assert!(conn.mark_available());
        assert!(!conn.mark_available());
        assert!(conn.mark_unavailable());
        assert!(!conn.mark_unavailable());
    }
}
