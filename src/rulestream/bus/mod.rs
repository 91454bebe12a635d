//! Topic-bus client contract.
//!
//! The publish/subscribe transport is an external, process-wide service;
//! this module specifies only the surface the task node consumes: subscribe
//! to a set of topic patterns under a subscriber identity and receive a
//! lazy, unbounded message stream. Delivery guarantees and the wire
//! protocol are properties of the transport, not of this crate.
//!
//! Cancellation is by dropping the stream: the node's disposal handle
//! tears down the consuming task, which drops the stream with it.

use crate::rulestream::sql::types::{row_from_json, FieldValue, RowMap};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;
use std::error::Error;

/// Lazy, unbounded sequence of inbound messages.
pub type MessageStream = BoxStream<'static, TopicMessage>;

/// A subscription request for one topic pattern.
///
/// Patterns may match multiple concrete channels (e.g. `/device/+/event`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Topic pattern to match inbound messages against
    pub topic_pattern: String,
}

impl Subscription {
    /// Create a subscription for a topic pattern
    pub fn new(topic_pattern: impl Into<String>) -> Self {
        Self {
            topic_pattern: topic_pattern.into(),
        }
    }
}

/// An inbound message delivered by the bus.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    /// Concrete topic the message arrived on
    pub topic: String,
    /// Message payload
    pub payload: JsonValue,
}

impl TopicMessage {
    pub fn new(topic: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Standard message-to-row conversion.
    ///
    /// Object payloads map to columns; any other payload lands under a
    /// `payload` column. The source topic is added under `topic` unless the
    /// payload already carries that column.
    pub fn convert(&self) -> RowMap {
        let mut row = row_from_json(self.payload.clone());
        row.entry("topic".to_string())
            .or_insert_with(|| FieldValue::String(self.topic.clone()));
        row
    }
}

/// Client surface of the topic bus.
///
/// Shared process-wide; any number of concurrently running task nodes may
/// subscribe. Implementations must hand out independent streams per call.
#[async_trait]
pub trait TopicBus: Send + Sync {
    /// Establish one subscription covering the given patterns.
    ///
    /// `subscriber_id` namespaces the consumer on the bus so reloads of the
    /// same task resume the same identity. `require_ack` requests
    /// acknowledged delivery where the transport supports it.
    ///
    /// Fails if the subscription cannot be established; an error here is
    /// fatal to the caller's start attempt.
    async fn subscribe(
        &self,
        subscriptions: Vec<Subscription>,
        subscriber_id: &str,
        require_ack: bool,
    ) -> Result<MessageStream, Box<dyn Error + Send + Sync>>;
}
