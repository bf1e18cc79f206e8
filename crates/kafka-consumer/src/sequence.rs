//! Ordering of rebalance events and fetched messages for one member.
//!
//! Transports push what they observe in arrival order; [`Sequencer::advance`]
//! turns that into handler calls. A message is handed to the handler only
//! if the current generation owns its partition. Anything else is dropped
//! without storing its offset, so the partition's next owner reads it again.

use kafka_types::{ConsumerMessage, TopicPartition};
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::handler::GroupHandler;
use crate::session::ConsumerSession;

/// Rebalance notifications as reported by the broker client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RebalanceEvent {
    Assigned(Vec<TopicPartition>),
    Revoked(Vec<TopicPartition>),
    Failed(String),
}

#[derive(Debug)]
enum Input {
    Rebalance(RebalanceEvent),
    Message(ConsumerMessage),
}

/// Records a handled message's position so it can be committed.
pub(crate) type OffsetStore<'a> = dyn Fn(&ConsumerMessage) -> Result<()> + Send + Sync + 'a;

#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    queue: VecDeque<Input>,
    generations: u64,
}

impl Sequencer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_event(&mut self, event: RebalanceEvent) {
        self.queue.push_back(Input::Rebalance(event));
    }

    pub(crate) fn push_message(&mut self, message: ConsumerMessage) {
        self.queue.push_back(Input::Message(message));
    }

    /// Process queued input in arrival order.
    ///
    /// Returns `true` once the generation in `session` has been revoked and
    /// cleaned up. Input queued behind the revocation stays queued for the
    /// next generation.
    pub(crate) async fn advance(
        &mut self,
        session: &mut Option<ConsumerSession>,
        handler: &dyn GroupHandler,
        store: &OffsetStore<'_>,
    ) -> Result<bool> {
        while let Some(input) = self.queue.pop_front() {
            match input {
                Input::Rebalance(event) => {
                    if self.apply(event, session, handler).await? {
                        return Ok(true);
                    }
                }
                Input::Message(message) => {
                    let partition = message.topic_partition();
                    match session.as_ref() {
                        Some(current) if current.owns(&partition) => {
                            handler.handle(current, &message).await?;
                            store(&message)?;
                        }
                        _ => tracing::debug!(
                            "Dropping message at {partition} offset {}: partition not assigned",
                            message.offset
                        ),
                    }
                }
            }
        }
        Ok(false)
    }

    async fn apply(
        &mut self,
        event: RebalanceEvent,
        session: &mut Option<ConsumerSession>,
        handler: &dyn GroupHandler,
    ) -> Result<bool> {
        match event {
            RebalanceEvent::Assigned(granted) => {
                let next = match session.take() {
                    // Incremental assignment extends the running generation
                    Some(current) => {
                        let mut assignment = current.assignment().to_vec();
                        assignment.extend(granted);
                        ConsumerSession::new(current.generation(), assignment)
                    }
                    None => {
                        self.generations += 1;
                        let next = ConsumerSession::new(self.generations, granted);
                        handler.setup(&next).await?;
                        next
                    }
                };
                *session = Some(next);
                Ok(false)
            }
            RebalanceEvent::Revoked(_) => match session.take() {
                Some(current) => {
                    handler.cleanup(&current).await?;
                    Ok(true)
                }
                None => Ok(false),
            },
            RebalanceEvent::Failed(reason) => Err(Error::Membership(reason)),
        }
    }
}
