use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

/// Broadcast channels created lazily per topic.
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
///
/// # Examples
///
/// ```rust,no_run
/// use scriptgraph::presence::TopicBroadcaster;
///
/// # async fn example() {
/// let topics = TopicBroadcaster::<String, u32>::new(64);
/// let mut rx = topics.subscribe("script-1".to_string()).await;
/// topics.publish("script-1".to_string(), 7).await;
/// assert_eq!(rx.recv().await.unwrap(), 7);
/// # }
/// ```
pub struct TopicBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    topics: Arc<RwLock<HashMap<K, broadcast::Sender<V>>>>,
    capacity: usize,
}

impl<K, V> TopicBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self, topic: K) -> broadcast::Receiver<V> {
        self.sender(topic).await.subscribe()
    }

    /// Delivers to current subscribers and returns how many there were.
    pub async fn publish(&self, topic: K, event: V) -> usize {
        self.sender(topic).await.send(event).unwrap_or(0)
    }

    pub async fn subscriber_count(&self, topic: &K) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    /// Drops topics nobody listens to; returns how many were dropped.
    pub async fn prune(&self) -> usize {
        let mut topics = self.topics.write().await;
        let before = topics.len();
        topics.retain(|_, sender| sender.receiver_count() > 0);
        before - topics.len()
    }

    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }

    async fn sender(&self, topic: K) -> broadcast::Sender<V> {
        if let Some(sender) = self.topics.read().await.get(&topic) {
            return sender.clone();
        }

        // Re-check under the write lock: another task may have created it.
        let mut topics = self.topics.write().await;
        topics
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl<K, V> Clone for TopicBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            topics: Arc::clone(&self.topics),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let topics = TopicBroadcaster::<&'static str, i32>::new(8);
        let mut a = topics.subscribe("t").await;
        let mut b = topics.subscribe("t").await;

        assert_eq!(topics.publish("t", 5).await, 2);
        assert_eq!(a.recv().await.unwrap(), 5);
        assert_eq!(b.recv().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let topics = TopicBroadcaster::<&'static str, i32>::new(8);
        let mut a = topics.subscribe("a").await;
        assert_eq!(topics.publish("b", 1).await, 0);
        topics.publish("a", 2).await;
        assert_eq!(a.recv().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prune_drops_idle_topics() {
        let topics = TopicBroadcaster::<i32, i32>::new(8);
        {
            let _rx = topics.subscribe(1).await;
            assert_eq!(topics.subscriber_count(&1).await, 1);
        }
        let _kept = topics.subscribe(2).await;

        assert_eq!(topics.prune().await, 1);
        assert_eq!(topics.topic_count().await, 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let topics = TopicBroadcaster::<i32, i32>::new(0);
        tokio_test::block_on(async {
            assert_eq!(topics.publish(9, 1).await, 0);
            assert_eq!(topics.prune().await, 1);
        });
    }
}
