//! Scripted in-memory consumer group for exercising the coordinator without
//! a broker.
//!
//! Scripted events go through the same sequencing as [`crate::KafkaGroup`]:
//! an assignment during a running generation extends it, and a message for a
//! partition the member does not own is dropped without being committed.

use async_trait::async_trait;
use kafka_types::{ConsumerMessage, TopicPartition};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::handler::GroupHandler;
use crate::sequence::{RebalanceEvent, Sequencer};
use crate::session::ConsumerSession;
use crate::transport::GroupTransport;

#[derive(Debug, Clone)]
enum MemoryEvent {
    Assign(Vec<TopicPartition>),
    Deliver(ConsumerMessage),
    Revoke,
    Fail(String),
}

type Committed = Arc<StdMutex<HashMap<TopicPartition, i64>>>;

struct Inbox {
    events: mpsc::UnboundedReceiver<MemoryEvent>,
    sequencer: Sequencer,
}

/// Group member fed by a [`GroupController`].
pub struct MemoryGroup {
    inbox: Mutex<Inbox>,
    closed: CancellationToken,
    committed: Committed,
}

/// Plays the broker's side of a [`MemoryGroup`]. Events are applied in the
/// order they are sent.
#[derive(Clone)]
pub struct GroupController {
    events: mpsc::UnboundedSender<MemoryEvent>,
    closed: CancellationToken,
    committed: Committed,
}

impl MemoryGroup {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MemoryGroup, GroupController) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        let committed = Committed::default();

        let group = MemoryGroup {
            inbox: Mutex::new(Inbox {
                events: receiver,
                sequencer: Sequencer::new(),
            }),
            closed: closed.clone(),
            committed: committed.clone(),
        };
        let controller = GroupController {
            events: sender,
            closed,
            committed,
        };
        (group, controller)
    }
}

impl GroupController {
    pub fn assign(&self, partitions: Vec<TopicPartition>) {
        self.send(MemoryEvent::Assign(partitions));
    }

    pub fn deliver(&self, message: ConsumerMessage) {
        self.send(MemoryEvent::Deliver(message));
    }

    pub fn revoke(&self) {
        self.send(MemoryEvent::Revoke);
    }

    /// Make the next `consume` fail as if the broker dropped the member.
    pub fn fail(&self, reason: impl Into<String>) {
        self.send(MemoryEvent::Fail(reason.into()));
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Next offset to read for `partition`, recorded after each handled message.
    pub fn committed(&self, partition: &TopicPartition) -> Option<i64> {
        self.committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(partition)
            .copied()
    }

    fn send(&self, event: MemoryEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Memory group is gone, event dropped");
        }
    }
}

#[async_trait]
impl GroupTransport for MemoryGroup {
    async fn consume(&self, handler: &dyn GroupHandler) -> Result<()> {
        let mut guard = self.inbox.lock().await;
        let Inbox { events, sequencer } = &mut *guard;
        let store = |message: &ConsumerMessage| -> Result<()> {
            self.committed
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(message.topic_partition(), message.offset + 1);
            Ok(())
        };
        let mut session: Option<ConsumerSession> = None;

        loop {
            if sequencer.advance(&mut session, handler, &store).await? {
                return Ok(());
            }

            let event = tokio::select! {
                biased;

                _ = self.closed.cancelled() => {
                    if let Some(current) = session.take() {
                        handler.cleanup(&current).await?;
                    }
                    return Err(Error::Closed);
                }

                event = events.recv() => event.ok_or(Error::Closed)?,
            };

            match event {
                MemoryEvent::Assign(partitions) => {
                    sequencer.push_event(RebalanceEvent::Assigned(partitions))
                }
                MemoryEvent::Deliver(message) => sequencer.push_message(message),
                MemoryEvent::Revoke => sequencer.push_event(RebalanceEvent::Revoked(Vec::new())),
                MemoryEvent::Fail(reason) => sequencer.push_event(RebalanceEvent::Failed(reason)),
            }
        }
    }

    fn close(&self) {
        self.closed.cancel();
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
