//! Dedicated writer task for outbound command frames.
//!
//! Each gateway connection gets one writer task fed through an mpsc
//! channel. Producers never touch the socket: they hand a [`Frame`] to
//! the [`WriterHandle`] and the task owns the write half until the
//! connection dies.
//!
//! # Architecture
//!
//! ```text
//! retry engine ─┐
//! drain tick   ─┴─► mpsc::Sender<Frame> ─► writer task ─► gateway socket
//! ```
//!
//! Frames go out one at a time, each followed by a flush. The wallpad bus
//! is half-duplex and a command must land in the gap after a report, so
//! batching would only glue commands together on the wire.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{BridgeError, Result};
use crate::protocol::Frame;

/// Default maximum in-flight frames before the handle reports a full
/// buffer.
pub const DEFAULT_MAX_PENDING_FRAMES: usize = 16;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum pending frames before `try_send` starts refusing.
    pub max_pending_frames: usize,
    /// Channel capacity for the frame queue.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for sending frames to the writer task.
///
/// Cheaply cloneable; every producer holds one.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    /// Channel sender for frames.
    tx: mpsc::Sender<Frame>,
    /// In-flight frame count.
    pending: Arc<AtomicUsize>,
    /// Maximum in-flight frames.
    max_pending: usize,
}

impl WriterHandle {
    pub(crate) fn new(tx: mpsc::Sender<Frame>, pending: Arc<AtomicUsize>, max_pending: usize) -> Self {
        Self {
            tx,
            pending,
            max_pending,
        }
    }

    /// Queue a frame for writing without blocking.
    ///
    /// Returns [`BridgeError::WriteBufferFull`] when the writer is
    /// saturated and [`BridgeError::ConnectionClosed`] once the task is
    /// gone. The caller decides whether to requeue the frame.
    pub fn try_send(&self, frame: Frame) -> Result<()> {
        let current = self.pending.load(Ordering::Acquire);
        if current >= self.max_pending {
            return Err(BridgeError::WriteBufferFull);
        }

        self.pending.fetch_add(1, Ordering::AcqRel);

        self.tx.try_send(frame).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::Release);
            match e {
                mpsc::error::TrySendError::Full(_) => BridgeError::WriteBufferFull,
                mpsc::error::TrySendError::Closed(_) => BridgeError::ConnectionClosed,
            }
        })
    }

    /// Whether the writer can take another frame right now.
    #[inline]
    pub fn is_write_ready(&self) -> bool {
        self.pending.load(Ordering::Acquire) < self.max_pending
    }

    /// Current in-flight frame count.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The task runs until the socket errors or every handle is dropped.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle::new(tx, pending.clone(), config.max_pending_frames);
    let task = tokio::spawn(writer_loop(rx, writer, pending));

    (handle, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_writer_task_default<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

/// Main writer loop: receives frames and writes them to the gateway.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<Frame>,
    mut writer: W,
    pending: Arc<AtomicUsize>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let result = write_frame(&mut writer, &frame).await;
        pending.fetch_sub(1, Ordering::Release);

        match result {
            Ok(()) => tracing::trace!("Wrote frame {}", frame.hex()),
            Err(e) => {
                tracing::error!("Gateway write failed: {}", e);
                return Err(BridgeError::Io(e));
            }
        }
    }

    // Channel closed, clean shutdown
    Ok(())
}

async fn write_frame<W>(writer: &mut W, frame: &Frame) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}
