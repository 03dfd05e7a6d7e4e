//! In-process broadcast bus for simulation output.
//!
//! Every subscriber receives every [`Event`]; a slow subscriber loses the
//! oldest events instead of blocking the simulation.  Forwarding events to
//! other processes is left to whatever subscribes here.

use omnisim_types::{Event, EventPayload, NodeId, SimError};
use tokio::sync::broadcast;
use tracing::warn;

pub const DEFAULT_CAPACITY: usize = 256;

/// Cheap to clone; all clones share one channel.
#[derive(Debug, Clone)]
pub struct ReadingBus {
    sender: broadcast::Sender<Event>,
}

impl Default for ReadingBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ReadingBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `event`; returns how many subscribers received it.  Having no
    /// subscribers is normal and yields `0`.
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> ReadingSubscriber {
        ReadingSubscriber {
            sensor: None,
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to readings of one sensor (faults are always delivered).
    pub fn subscribe_sensor(&self, sensor: NodeId) -> ReadingSubscriber {
        ReadingSubscriber {
            sensor: Some(sensor),
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving half of a [`ReadingBus`] subscription.
pub struct ReadingSubscriber {
    sensor: Option<NodeId>,
    receiver: broadcast::Receiver<Event>,
}

impl ReadingSubscriber {
    fn wants(&self, event: &Event) -> bool {
        match (&event.payload, self.sensor) {
            (EventPayload::Reading { sensor, .. }, Some(wanted)) => *sensor == wanted,
            _ => true,
        }
    }

    /// Next matching event.  Lagging skips the lost events with a warning.
    ///
    /// # Errors
    ///
    /// [`SimError::Channel`] once the bus is gone.
    pub async fn recv(&mut self) -> Result<Event, SimError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "reading subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(SimError::Channel("reading bus closed".to_string()));
                }
            }
        }
    }

    /// Non-blocking variant of [`ReadingSubscriber::recv`]; `None` when
    /// nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
