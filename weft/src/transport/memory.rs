//! An in-memory broker.
//!
//! Direct-exchange semantics only: the routing key names the queue. Good
//! enough to wire peers together in one process, which is all the tests
//! need; a real deployment points the pool at an actual broker instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::transport::{Channel, ChannelPool, Delivery, DeliveryStream};

/// An in-process broker shared by every channel drawn from its pools.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Delivery>>>>,
}

impl MemoryBroker {
    /// A broker with no queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel pool connected to this broker.
    pub fn pool(&self) -> MemoryChannelPool {
        MemoryChannelPool {
            broker: self.clone(),
        }
    }
}

/// A pool of [`MemoryChannel`]s.
#[derive(Debug, Clone)]
pub struct MemoryChannelPool {
    broker: MemoryBroker,
}

impl ChannelPool for MemoryChannelPool {
    type Channel = MemoryChannel;

    fn get(&self) -> Result<MemoryChannel, Error> {
        Ok(MemoryChannel {
            broker: self.broker.clone(),
        })
    }

    fn put(&self, _channel: MemoryChannel) {}
}

/// A channel into a [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    broker: MemoryBroker,
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn publish(&self, exchange: &str, routing_key: &str, body: Bytes) -> Result<(), Error> {
        let sender = self.broker.queues.lock().get(routing_key).cloned();
        if let Some(tx) = sender {
            // A consumer that went away is indistinguishable from a queue
            // with no consumer; the message is dropped either way.
            let _ = tx.send(Delivery {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                body,
            });
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.broker.queues.lock().insert(queue.to_string(), tx);
        let stream =
            futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|d| (d, rx)) });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_by_queue_name() {
        let broker = MemoryBroker::new();
        let pool = broker.pool();

        let consumer = pool.get().unwrap();
        let mut deliveries = consumer.consume("peer-a").await.unwrap();

        let publisher = pool.get().unwrap();
        publisher
            .publish("commands", "peer-a", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        publisher
            .publish("commands", "peer-b", Bytes::from_static(b"lost"))
            .await
            .unwrap();
        pool.put(publisher);

        let delivery = deliveries.next().await.unwrap();
        assert_eq!(delivery.exchange, "commands");
        assert_eq!(delivery.routing_key, "peer-a");
        assert_eq!(delivery.body, Bytes::from_static(b"hello"));
    }
}
