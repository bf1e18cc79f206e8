//! Broker boundary for group membership.
//!
//! A transport runs one generation per [`GroupTransport::consume`] call:
//! it waits for the broker to grant an assignment, drives the handler over
//! that generation's messages and returns when the assignment is revoked.
//! [`KafkaGroup`] is backed by rdkafka's `StreamConsumer`;
//! [`crate::testing::MemoryGroup`] is scripted by tests.

use async_trait::async_trait;
use kafka_types::{ConsumerMessage, TopicPartition};
use rdkafka::consumer::{Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{ClientContext, Offset, TopicPartitionList};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::ConsumerConfig;
use crate::error::{Error, Result};
use crate::handler::GroupHandler;
use crate::sequence::{RebalanceEvent, Sequencer};
use crate::session::ConsumerSession;

#[async_trait]
pub trait GroupTransport: Send + Sync {
    /// Run one generation of membership.
    ///
    /// Returns `Ok(())` once the generation's assignment has been revoked and
    /// `handler.cleanup` has run. Returns [`Error::Closed`] after
    /// [`GroupTransport::close`]; any other error ends membership.
    async fn consume(&self, handler: &dyn GroupHandler) -> Result<()>;

    /// Leave the group. Wakes a running `consume`.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

struct GroupContext {
    events: mpsc::UnboundedSender<RebalanceEvent>,
}

impl GroupContext {
    fn forward(&self, event: RebalanceEvent) {
        tracing::debug!("Rebalance: {event:?}");
        if self.events.send(event).is_err() {
            tracing::debug!("Rebalance event dropped: consumer group already gone");
        }
    }
}

fn partitions(tpl: &TopicPartitionList) -> Vec<TopicPartition> {
    tpl.elements()
        .iter()
        .map(|element| TopicPartition::new(element.topic(), element.partition()))
        .collect()
}

impl ClientContext for GroupContext {}

impl ConsumerContext for GroupContext {
    fn pre_rebalance<'a>(&self, rebalance: &Rebalance<'a>) {
        if let Rebalance::Revoke(tpl) = rebalance {
            self.forward(RebalanceEvent::Revoked(partitions(tpl)));
        }
    }

    fn post_rebalance<'a>(&self, rebalance: &Rebalance<'a>) {
        match rebalance {
            Rebalance::Assign(tpl) => self.forward(RebalanceEvent::Assigned(partitions(tpl))),
            Rebalance::Error(e) => self.forward(RebalanceEvent::Failed(e.to_string())),
            Rebalance::Revoke(_) => {}
        }
    }
}

/// Errors after which the client will not recover on its own.
fn is_fatal(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::Fatal
            | RDKafkaErrorCode::Authentication
            | RDKafkaErrorCode::SaslAuthenticationFailed
            | RDKafkaErrorCode::TopicAuthorizationFailed
            | RDKafkaErrorCode::GroupAuthorizationFailed
            | RDKafkaErrorCode::ClusterAuthorizationFailed
            | RDKafkaErrorCode::InvalidGroupId
    )
}

struct Inbox {
    events: mpsc::UnboundedReceiver<RebalanceEvent>,
    sequencer: Sequencer,
}

/// Group member over an rdkafka `StreamConsumer`.
///
/// Offsets are stored after each successfully handled message and committed
/// by the client's auto-commit, so delivery to the handler is at-least-once.
pub struct KafkaGroup {
    consumer: StreamConsumer<GroupContext>,
    inbox: Mutex<Inbox>,
    closed: CancellationToken,
}

impl KafkaGroup {
    /// Create the consumer and subscribe to the configured topics.
    pub fn join(config: &ConsumerConfig) -> Result<Self> {
        let (sender, events) = mpsc::unbounded_channel();

        let consumer: StreamConsumer<GroupContext> = config
            .client_config()?
            .create_with_context(GroupContext { events: sender })
            .map_err(|e| Error::Connection(format!("Failed to create consumer: {e}")))?;

        let topics: Vec<&str> = config.topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&topics)
            .map_err(|e| Error::Connection(format!("Failed to subscribe to topics: {e}")))?;

        tracing::info!(
            "Joining consumer group {} for topics {:?}",
            config.group_id,
            config.topics
        );

        Ok(Self {
            consumer,
            inbox: Mutex::new(Inbox {
                events,
                sequencer: Sequencer::new(),
            }),
            closed: CancellationToken::new(),
        })
    }

    fn store_offset(&self, message: &ConsumerMessage) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        self.consumer.store_offsets(&tpl)?;
        Ok(())
    }
}

fn to_owned(message: &BorrowedMessage<'_>) -> ConsumerMessage {
    ConsumerMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        timestamp: message.timestamp().to_millis(),
    }
}

#[async_trait]
impl GroupTransport for KafkaGroup {
    async fn consume(&self, handler: &dyn GroupHandler) -> Result<()> {
        let mut guard = self.inbox.lock().await;
        let Inbox { events, sequencer } = &mut *guard;
        let store = |message: &ConsumerMessage| self.store_offset(message);
        let mut session: Option<ConsumerSession> = None;

        loop {
            if sequencer.advance(&mut session, handler, &store).await? {
                return Ok(());
            }

            tokio::select! {
                biased;

                _ = self.closed.cancelled() => {
                    if let Some(current) = session.take() {
                        handler.cleanup(&current).await?;
                    }
                    return Err(Error::Closed);
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        return Err(Error::Closed);
                    };
                    sequencer.push_event(event);
                }

                received = self.consumer.recv() => {
                    let message = match received {
                        Ok(message) => to_owned(&message),
                        Err(e) => match e.rdkafka_error_code() {
                            Some(code) if is_fatal(code) => {
                                return Err(Error::Membership(format!(
                                    "Consumer cannot continue: {e}"
                                )));
                            }
                            _ => {
                                tracing::warn!("Error receiving message: {e}");
                                continue;
                            }
                        },
                    };

                    // Rebalance callbacks run inside the poll that returned
                    // this message, so their events are queued ahead of it.
                    while let Ok(event) = events.try_recv() {
                        sequencer.push_event(event);
                    }
                    sequencer.push_message(message);
                }
            }
        }
    }

    fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        self.consumer.unsubscribe();
        tracing::info!("Left consumer group");
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
