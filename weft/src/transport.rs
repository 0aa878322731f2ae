//! The broker boundary.
//!
//! The core never parses transport frames. The (external) broker layer
//! moves opaque bodies between peers over [`Channel`]s drawn from a
//! [`ChannelPool`], and a codec on that side extracts an [`Envelope`]
//! (source ref, piggybacked attribute snapshot, trace ID, deadline) from
//! the message headers. This module defines those seams and an in-memory
//! implementation used by the tests.

use std::fmt::Debug;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use weft_base::{MessageId, Ref};

use crate::{error::Error, table::AttrMeta};

pub mod memory;

/// The message metadata the codec extracts from transport headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The session the message originated from, at the revision it held
    /// when the message was sent.
    pub source: Ref,
    /// Attribute snapshots piggybacked on the message, per namespace.
    /// Receiving peers feed these to their remote cache.
    pub attrs: Vec<(String, Vec<AttrMeta>)>,
    /// The trace ID tying this message to the root request that caused it.
    pub trace_id: Option<String>,
    /// The deadline the sender attached, if any.
    pub deadline: Option<SystemTime>,
}

impl Envelope {
    /// The trace ID for work triggered by this message.
    ///
    /// A message with no trace ID is a root request: its own message ID
    /// becomes the trace ID for everything it causes.
    pub fn trace_or(&self, message_id: MessageId) -> String {
        match &self.trace_id {
            Some(trace_id) => trace_id.clone(),
            None => message_id.to_string(),
        }
    }
}

/// A message as delivered by the broker.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The exchange the message was published to.
    pub exchange: String,
    /// The routing key it was published under.
    pub routing_key: String,
    /// The opaque message body.
    pub body: Bytes,
}

/// A stream of deliveries from one queue.
pub type DeliveryStream = BoxStream<'static, Delivery>;

/// One channel to the broker.
#[async_trait]
pub trait Channel: Send + Sync + Debug {
    /// Publishes `body` to `exchange` under `routing_key`.
    async fn publish(&self, exchange: &str, routing_key: &str, body: Bytes) -> Result<(), Error>;

    /// Consumes deliveries from the queue named `queue`.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, Error>;
}

/// A pool of broker channels.
///
/// Callers draw a channel, use it, and put it back; the pool bounds how
/// many channels a peer holds open against the broker.
pub trait ChannelPool: Send + Sync + Debug {
    /// The channel type this pool manages.
    type Channel: Channel;

    /// Draws a channel from the pool.
    fn get(&self) -> Result<Self::Channel, Error>;

    /// Returns a channel to the pool.
    fn put(&self, channel: Self::Channel);
}
