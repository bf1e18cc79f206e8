use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::ConsumerConfig;
use crate::error::{Error, Result};
use crate::handler::ConsumerGroupHandler;
use crate::ready::GroupState;
use crate::transport::{GroupTransport, KafkaGroup};

/// A running consumer group member.
///
/// Membership runs in its own task, rejoining the group after every
/// rebalance until the group is closed or a fatal error occurs. Fatal errors
/// are returned through [`ConsumerGroup::wait`] and [`ConsumerGroup::close`];
/// the coordinator itself never terminates the process.
pub struct ConsumerGroup<T, H>
where
    T: GroupTransport + 'static,
    H: ConsumerGroupHandler + 'static,
{
    transport: Arc<T>,
    handler: Arc<H>,
    task: Option<JoinHandle<Result<()>>>,
}

impl<H: ConsumerGroupHandler + 'static> ConsumerGroup<KafkaGroup, H> {
    /// Join the group over Kafka and wait for the first assignment.
    pub async fn open(config: &ConsumerConfig, handler: Arc<H>) -> Result<Self> {
        let transport = KafkaGroup::join(config)?;
        Self::start(transport, handler).await
    }
}

impl<T, H> ConsumerGroup<T, H>
where
    T: GroupTransport + 'static,
    H: ConsumerGroupHandler + 'static,
{
    /// Spawn the membership loop and wait until the first generation is
    /// ready, or return the loop's error if it ends before that.
    pub async fn start(transport: T, handler: Arc<H>) -> Result<Self> {
        let transport = Arc::new(transport);
        let task = tokio::spawn(membership_loop(transport.clone(), handler.clone()));
        let mut group = Self {
            transport,
            handler: handler.clone(),
            task: Some(task),
        };

        tokio::select! {
            ready = handler.wait_ready() => match ready {
                Ok(generation) => {
                    tracing::info!("Consumer group ready at generation {generation}");
                    Ok(group)
                }
                Err(_) => {
                    group.wait().await?;
                    Err(Error::Closed)
                }
            },
            result = group.wait() => {
                result?;
                Err(Error::Closed)
            }
        }
    }

    pub fn state(&self) -> GroupState {
        self.handler.readiness().state()
    }

    /// Wait for the current generation's assignment.
    ///
    /// After a revocation this blocks until the next assignment is granted.
    pub async fn wait_ready(&self) -> Result<u64> {
        self.handler.wait_ready().await
    }

    /// Resolve when the membership loop exits, yielding its result.
    ///
    /// Cancel-safe. Once the result has been yielded later calls return
    /// `Ok(())`.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let joined = task.await;
        self.task = None;
        joined.map_err(|e| Error::Membership(format!("Membership task failed: {e}")))?
    }

    /// Leave the group and wait for the membership loop to finish.
    ///
    /// Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close();
        self.handler.readiness().close();
        self.wait().await
    }
}

impl<T, H> Drop for ConsumerGroup<T, H>
where
    T: GroupTransport + 'static,
    H: ConsumerGroupHandler + 'static,
{
    fn drop(&mut self) {
        if self.task.is_some() {
            tracing::debug!("Consumer group dropped without close(), leaving group");
            self.transport.close();
            self.handler.readiness().close();
        }
    }
}

async fn membership_loop<T, H>(transport: Arc<T>, handler: Arc<H>) -> Result<()>
where
    T: GroupTransport,
    H: ConsumerGroupHandler,
{
    let result = loop {
        match transport.consume(handler.as_ref()).await {
            Ok(()) if transport.is_closed() => break Ok(()),
            Ok(()) => {
                tracing::debug!("Generation ended, rejoining consumer group");
                handler.reset();
            }
            Err(e) if e.is_closed() => break Ok(()),
            Err(e) => {
                tracing::error!("Consumer group membership failed: {e}");
                break Err(e);
            }
        }
    };

    handler.readiness().close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{GroupHandler, SyncGroupHandler};
    use crate::ready::ReadyGate;
    use crate::session::ConsumerSession;
    use crate::testing::{GroupController, MemoryGroup};
    use async_trait::async_trait;
    use kafka_types::{ConsumerMessage, TopicPartition};
    use std::sync::Mutex;
    use std::time::Duration;

    fn partition() -> TopicPartition {
        TopicPartition::new("ucenter", 0)
    }

    fn message(offset: i64) -> ConsumerMessage {
        ConsumerMessage {
            topic: "ucenter".to_string(),
            partition: 0,
            offset,
            key: Some(offset.to_string().into_bytes()),
            payload: vec![0x06],
            timestamp: None,
        }
    }

    /// Records the order of lifecycle callbacks.
    #[derive(Default)]
    struct RecordingHandler {
        gate: ReadyGate,
        timeline: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        fn record(&self, entry: String) {
            self.timeline.lock().unwrap().push(entry);
        }

        fn timeline(&self) -> Vec<String> {
            self.timeline.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GroupHandler for RecordingHandler {
        async fn setup(&self, session: &ConsumerSession) -> Result<()> {
            self.record(format!("setup {}", session.generation()));
            self.gate.mark_ready(session.generation());
            Ok(())
        }

        async fn cleanup(&self, session: &ConsumerSession) -> Result<()> {
            self.record(format!("cleanup {}", session.generation()));
            self.gate.revoke();
            Ok(())
        }

        async fn handle(&self, session: &ConsumerSession, message: &ConsumerMessage) -> Result<()> {
            self.record(format!("handle {} {}", session.generation(), message.offset));
            Ok(())
        }
    }

    impl ConsumerGroupHandler for RecordingHandler {
        fn readiness(&self) -> &ReadyGate {
            &self.gate
        }
    }

    async fn until_committed(controller: &GroupController, offset: i64) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while controller.committed(&partition()) != Some(offset) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("messages were not handled in time");
    }

    #[tokio::test]
    async fn test_rebalance_mid_stream() {
        let (transport, controller) = MemoryGroup::new();
        let handler = Arc::new(RecordingHandler::default());

        controller.assign(vec![partition()]);
        let mut group = ConsumerGroup::start(transport, handler.clone())
            .await
            .unwrap();
        assert_eq!(group.state(), GroupState::Active { generation: 1 });

        for offset in 0..5 {
            controller.deliver(message(offset));
        }
        controller.revoke();

        let mut states = handler.readiness().subscribe();
        tokio::time::timeout(
            Duration::from_secs(1),
            states.wait_for(|state| *state != GroupState::Active { generation: 1 }),
        )
        .await
        .expect("revocation was not observed")
        .unwrap();

        // A fresh wait after revocation must not see the old generation
        let stale = tokio::time::timeout(Duration::from_millis(50), group.wait_ready()).await;
        assert!(stale.is_err());

        let waiter = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.wait_ready().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        controller.assign(vec![partition()]);
        for offset in 5..10 {
            controller.deliver(message(offset));
        }
        assert_eq!(waiter.await.unwrap().unwrap(), 2);
        until_committed(&controller, 10).await;

        group.close().await.unwrap();

        let timeline = handler.timeline();
        let handled = timeline.iter().filter(|e| e.starts_with("handle")).count();
        assert_eq!(handled, 10);

        let cleanup = timeline.iter().position(|e| e == "cleanup 1").unwrap();
        let setup = timeline.iter().position(|e| e == "setup 2").unwrap();
        assert!(cleanup < setup);
        assert_eq!(timeline[cleanup - 1], "handle 1 4");
        assert_eq!(timeline[setup + 1], "handle 2 5");
        assert_eq!(timeline.last().unwrap(), "cleanup 2");
    }

    #[tokio::test]
    async fn test_start_waits_for_first_assignment() {
        let (transport, controller) = MemoryGroup::new();
        let handler = Arc::new(RecordingHandler::default());

        let starting = tokio::spawn(ConsumerGroup::start(transport, handler.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!starting.is_finished());
        assert_eq!(handler.readiness().state(), GroupState::Joining);

        controller.assign(vec![partition()]);
        let mut group = starting.await.unwrap().unwrap();
        assert_eq!(group.wait_ready().await.unwrap(), 1);
        group.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_error_is_fatal() {
        let (transport, controller) = MemoryGroup::new();
        let handler = Arc::new(SyncGroupHandler::new(|_, message| {
            if message.offset == 3 {
                anyhow::bail!("cannot decode payload");
            }
            Ok(())
        }));

        controller.assign(vec![partition()]);
        let mut group = ConsumerGroup::start(transport, handler).await.unwrap();
        for offset in 0..5 {
            controller.deliver(message(offset));
        }

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, Error::Handler { offset: 3, .. }));
        assert_eq!(group.state(), GroupState::Closed);
        // Offsets stop before the failed message
        assert_eq!(controller.committed(&partition()), Some(3));

        group.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_membership_failure_is_fatal() {
        let (transport, controller) = MemoryGroup::new();
        let handler = Arc::new(RecordingHandler::default());

        controller.assign(vec![partition()]);
        let mut group = ConsumerGroup::start(transport, handler).await.unwrap();
        controller.fail("coordinator lost");

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, Error::Membership(ref reason) if reason == "coordinator lost"));
    }

    #[tokio::test]
    async fn test_start_reports_failure_before_ready() {
        let (transport, controller) = MemoryGroup::new();
        let handler = Arc::new(RecordingHandler::default());

        controller.fail("group authorization failed");
        let result = ConsumerGroup::start(transport, handler).await;
        assert!(matches!(result, Err(Error::Membership(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (transport, controller) = MemoryGroup::new();
        let handler = Arc::new(RecordingHandler::default());

        controller.assign(vec![partition()]);
        let mut group = ConsumerGroup::start(transport, handler.clone())
            .await
            .unwrap();

        group.close().await.unwrap();
        group.close().await.unwrap();

        assert_eq!(group.state(), GroupState::Closed);
        assert!(matches!(group.wait_ready().await, Err(Error::Closed)));
        assert_eq!(handler.timeline(), vec!["setup 1", "cleanup 1"]);
    }
}
