use async_trait::async_trait;
use kafka_types::ConsumerMessage;

use crate::error::{Error, Result};
use crate::ready::ReadyGate;
use crate::session::ConsumerSession;

/// Callbacks invoked by a [`crate::GroupTransport`] over one generation.
///
/// `setup` runs once when an assignment is granted, before any message of
/// that generation; `cleanup` runs once when it is revoked, after the last
/// one. An error from `handle` ends membership.
#[async_trait]
pub trait GroupHandler: Send + Sync {
    async fn setup(&self, session: &ConsumerSession) -> Result<()>;

    async fn cleanup(&self, session: &ConsumerSession) -> Result<()>;

    async fn handle(&self, session: &ConsumerSession, message: &ConsumerMessage) -> Result<()>;
}

/// A handler that also exposes the member's readiness.
#[async_trait]
pub trait ConsumerGroupHandler: GroupHandler {
    fn readiness(&self) -> &ReadyGate;

    /// Wait for the current generation's assignment.
    async fn wait_ready(&self) -> Result<u64> {
        self.readiness().wait_ready().await
    }

    /// Re-arm readiness before rejoining the group.
    fn reset(&self) {
        self.readiness().reset();
    }
}

/// Handler running a synchronous processor for every message.
///
/// Readiness follows the session lifecycle: set on `setup`, withdrawn on
/// `cleanup`.
pub struct SyncGroupHandler<F> {
    gate: ReadyGate,
    processor: F,
}

impl<F> SyncGroupHandler<F>
where
    F: Fn(&ConsumerSession, &ConsumerMessage) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(processor: F) -> Self {
        Self {
            gate: ReadyGate::new(),
            processor,
        }
    }
}

#[async_trait]
impl<F> GroupHandler for SyncGroupHandler<F>
where
    F: Fn(&ConsumerSession, &ConsumerMessage) -> anyhow::Result<()> + Send + Sync,
{
    async fn setup(&self, session: &ConsumerSession) -> Result<()> {
        tracing::info!(
            "Generation {} assigned {} partitions",
            session.generation(),
            session.assignment().len()
        );
        self.gate.mark_ready(session.generation());
        Ok(())
    }

    async fn cleanup(&self, session: &ConsumerSession) -> Result<()> {
        tracing::info!("Generation {} revoked", session.generation());
        self.gate.revoke();
        Ok(())
    }

    async fn handle(&self, session: &ConsumerSession, message: &ConsumerMessage) -> Result<()> {
        (self.processor)(session, message).map_err(|e| Error::Handler {
            topic: message.topic.clone(),
            partition: message.partition,
            offset: message.offset,
            reason: format!("{e:#}"),
        })
    }
}

impl<F> ConsumerGroupHandler for SyncGroupHandler<F>
where
    F: Fn(&ConsumerSession, &ConsumerMessage) -> anyhow::Result<()> + Send + Sync,
{
    fn readiness(&self) -> &ReadyGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ready::GroupState;
    use kafka_types::TopicPartition;

    fn message(offset: i64) -> ConsumerMessage {
        ConsumerMessage {
            topic: "ucenter".to_string(),
            partition: 0,
            offset,
            key: Some(b"k".to_vec()),
            payload: vec![0x06],
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_setup_and_cleanup_drive_readiness() {
        let handler = SyncGroupHandler::new(|_, _| Ok(()));
        let session = ConsumerSession::new(1, vec![TopicPartition::new("ucenter", 0)]);

        handler.setup(&session).await.unwrap();
        assert_eq!(handler.wait_ready().await.unwrap(), 1);

        handler.cleanup(&session).await.unwrap();
        assert_eq!(handler.readiness().state(), GroupState::Rebalancing);

        handler.reset();
        assert_eq!(handler.readiness().state(), GroupState::Joining);
    }

    #[tokio::test]
    async fn test_processor_error_carries_position() {
        let handler = SyncGroupHandler::new(|_, _| Err(anyhow::anyhow!("bad payload")));
        let session = ConsumerSession::new(1, vec![TopicPartition::new("ucenter", 0)]);

        let err = handler.handle(&session, &message(7)).await.unwrap_err();
        match err {
            Error::Handler {
                topic,
                partition,
                offset,
                reason,
            } => {
                assert_eq!(topic, "ucenter");
                assert_eq!(partition, 0);
                assert_eq!(offset, 7);
                assert_eq!(reason, "bad payload");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
