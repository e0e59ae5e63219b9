use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use super::{PresenceChannel, PresenceEvent, PresenceStream, TopicBroadcaster};
use crate::errors::LockError;

/// In-process presence channel; clones share the same topics.
///
/// Every subscriber, the publisher's own included, sees each event. An
/// optional delivery latency simulates a network hop.
#[derive(Clone)]
pub struct LocalPresenceChannel {
    topics: TopicBroadcaster<String, PresenceEvent>,
    latency: Duration,
}

impl Default for LocalPresenceChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

impl LocalPresenceChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: TopicBroadcaster::new(capacity),
            latency: Duration::ZERO,
        }
    }

    /// Clone sharing topics, whose subscriptions see events `latency` late.
    pub fn with_latency(&self, latency: Duration) -> Self {
        Self {
            topics: self.topics.clone(),
            latency,
        }
    }

    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.subscriber_count(&topic.to_string()).await
    }
}

#[async_trait]
impl PresenceChannel for LocalPresenceChannel {
    async fn subscribe(&self, topic: &str) -> Result<PresenceStream, LockError> {
        let receiver = self.topics.subscribe(topic.to_string()).await;
        let latency = self.latency;
        let stream = BroadcastStream::new(receiver).filter_map(move |item| async move {
            match item {
                Ok(event) => {
                    if !latency.is_zero() {
                        tokio::time::sleep(latency).await;
                    }
                    Some(event)
                }
                Err(err) => {
                    tracing::warn!("Presence subscriber lagged: {}", err);
                    None
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn publish(&self, topic: &str, event: PresenceEvent) -> Result<(), LockError> {
        let delivered = self.topics.publish(topic.to_string(), event).await;
        tracing::trace!(topic, delivered, "Published presence event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lock;
    use crate::presence::PresenceEventKind;

    #[tokio::test]
    async fn test_round_trip_through_topic() {
        let channel = LocalPresenceChannel::default();
        let mut stream = channel.subscribe("script").await.unwrap();

        let lock = Lock::new("q1", "alice", chrono::Duration::seconds(30));
        channel
            .publish("script", PresenceEvent::claimed(&lock, 30_000))
            .await
            .unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.event, PresenceEventKind::Claimed);
        assert_eq!(event.node_id, "q1");
        assert_eq!(event.holder, "alice");
        assert_eq!(channel.subscriber_count("script").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_delivery() {
        let channel = LocalPresenceChannel::default();
        let slow = channel.with_latency(Duration::from_millis(50));
        let mut stream = slow.subscribe("script").await.unwrap();

        let started = tokio::time::Instant::now();
        channel
            .publish("script", PresenceEvent::departed("bob"))
            .await
            .unwrap();
        let event = stream.next().await.unwrap();
        assert_eq!(event.event, PresenceEventKind::Departed);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
