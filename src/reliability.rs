//! Command retry and ack correlation.
//!
//! The wallpad sends no transport-level acks. The only confirmation a
//! command gets is a state or ack report for the same device family and
//! id showing up on the bus. Every submitted command therefore sits in a
//! pending table with a retry timer until such a report arrives or the
//! retry budget runs out.
//!
//! # Lifecycle
//!
//! ```text
//! submit ──► queue ──► drain ──► writer ──► bus
//!    │                                       │
//!    └── pending table ◄── retry timer       │
//!              ▲                             │
//!              └───── ack report ◄───────────┘
//! ```
//!
//! The engine owns no tasks of its own beyond one sleep per armed timer;
//! timers report back through the bridge event channel so all state
//! changes happen on the bridge task.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::BridgeEvent;
use crate::codec::AckKey;
use crate::error::BridgeError;
use crate::protocol::{command_device_type, DeviceType, Frame};
use crate::queue::CommandQueue;
use crate::writer::WriterHandle;

/// Identifier handed out per submitted command.
pub type CommandId = u64;

/// How many times a command is re-sent before giving up.
pub const MAX_RETRIES: u32 = 3;

/// How long to wait for an ack before re-queueing.
pub const RETRY_TIMEOUT: Duration = Duration::from_millis(500);

/// Priority for freshly submitted commands. Lower dequeues first.
pub const DEFAULT_PRIORITY: u32 = 1;

/// Priority used when a dequeued frame bounces off a full writer.
const REQUEUE_PRIORITY: u32 = 1;

/// A frame waiting in the queue, tagged with its command id.
#[derive(Debug, Clone, Copy)]
struct QueuedFrame {
    id: CommandId,
    frame: Frame,
}

/// Book-keeping for one submitted command awaiting its ack.
#[derive(Debug)]
struct PendingCommand {
    frame: Frame,
    priority: u32,
    key: AckKey,
    retries: u32,
    retry_timer: JoinHandle<()>,
}

/// Queue, pending table and retry timers for outbound commands.
#[derive(Debug)]
pub struct ReliabilityEngine {
    queue: CommandQueue<QueuedFrame>,
    /// Keyed by submission order so ack correlation hits the oldest
    /// matching command first.
    pending: BTreeMap<CommandId, PendingCommand>,
    next_id: CommandId,
    events: mpsc::Sender<BridgeEvent>,
}

impl ReliabilityEngine {
    pub fn new(events: mpsc::Sender<BridgeEvent>) -> Self {
        Self {
            queue: CommandQueue::new(),
            pending: BTreeMap::new(),
            next_id: 0,
            events,
        }
    }

    /// Queue a command at the default priority and arm its retry timer.
    ///
    /// Nothing is written yet; the frame waits for the next drain window.
    pub fn submit(&mut self, frame: Frame) -> CommandId {
        self.submit_with_priority(frame, DEFAULT_PRIORITY)
    }

    pub fn submit_with_priority(&mut self, frame: Frame, priority: u32) -> CommandId {
        let id = self.next_id;
        self.next_id += 1;

        let key = AckKey {
            device_type: command_device_type(frame.header()).unwrap_or(DeviceType::Unknown),
            device_id: frame.device_id(),
        };
        let retry_timer = arm_retry_timer(&self.events, id);

        self.pending.insert(
            id,
            PendingCommand {
                frame,
                priority,
                key,
                retries: 0,
                retry_timer,
            },
        );
        self.queue.enqueue(QueuedFrame { id, frame }, priority);
        tracing::debug!("Queued command {}: {}", id, frame.hex());
        id
    }

    /// React to a retry timer firing.
    ///
    /// Ignored when the command was acked in the meantime. Otherwise the
    /// frame re-enters the queue at its original priority until the retry
    /// budget is spent.
    pub fn on_retry_timeout(&mut self, id: CommandId) {
        let Some(command) = self.pending.get_mut(&id) else {
            return;
        };

        if command.retries >= MAX_RETRIES {
            tracing::error!(
                "Command {} unacknowledged after {} retries, giving up: {}",
                id,
                MAX_RETRIES,
                command.frame.hex()
            );
            self.pending.remove(&id);
            return;
        }

        command.retries += 1;
        tracing::warn!("Retrying command {} ({}/{})", id, command.retries, MAX_RETRIES);
        let frame = command.frame;
        let priority = command.priority;
        command.retry_timer = arm_retry_timer(&self.events, id);
        self.queue.enqueue(QueuedFrame { id, frame }, priority);
    }

    /// Correlate an inbound report against the pending table.
    ///
    /// The oldest pending command for the same family and id wins; one
    /// report never clears more than one command.
    pub fn on_inbound(&mut self, key: AckKey) -> Option<CommandId> {
        let id = self
            .pending
            .iter()
            .find(|(_, command)| command.key == key)
            .map(|(&id, _)| id)?;
        let command = self.pending.remove(&id)?;
        command.retry_timer.abort();
        tracing::debug!("Ack cleared command {}: {}", id, command.frame.hex());
        Some(id)
    }

    /// Write at most one queued frame into the gateway writer.
    ///
    /// Called after every burst of inbound traffic: the bus just went
    /// quiet, so one command can slip into the gap. A dequeued frame is
    /// written even when its ack already cleared the pending entry.
    pub fn drain(&mut self, writer: &WriterHandle) {
        let Some((queued, _)) = self.queue.dequeue() else {
            return;
        };

        match writer.try_send(queued.frame) {
            Ok(()) => tracing::debug!("-> {}", queued.frame.hex()),
            Err(BridgeError::WriteBufferFull) => {
                // Writer saturated; the frame goes back to the head of
                // the line for the next window
                self.queue.enqueue(queued, REQUEUE_PRIORITY);
            }
            Err(e) => {
                tracing::warn!("Dropped command {}: {}", queued.id, e);
            }
        }
    }

    /// Whether a submitted command is still awaiting its ack.
    pub fn is_pending(&self, id: CommandId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Abort every retry timer and drop all queued commands.
    pub fn shutdown(&mut self) {
        for command in self.pending.values() {
            command.retry_timer.abort();
        }
        self.pending.clear();
        self.queue.clear();
    }
}

fn arm_retry_timer(events: &mpsc::Sender<BridgeEvent>, id: CommandId) -> JoinHandle<()> {
    let events = events.clone();
    tokio::spawn(async move {
        tokio::time::sleep(RETRY_TIMEOUT).await;
        let _ = events.send(BridgeEvent::RetryTimeout(id)).await;
    })
}
