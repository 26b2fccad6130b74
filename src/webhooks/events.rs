//! Discourse webhook payload model.
//!
//! The webhook body is JSON of the form:
//!
//! ```json
//! { "topic": { "id": 42, "created_at": "...", "category_id": 7, "title": "..." } }
//! ```
//!
//! or, for a liveness ping configured on the forum side:
//!
//! ```json
//! { "ping": true }
//! ```
//!
//! Payloads carry many more fields than this; everything not listed here is
//! ignored during deserialization.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::types::{CategoryId, TopicEvent, TopicId};

/// Errors from interpreting a webhook payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body was not valid JSON or did not match the expected shape.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A topic event was expected but the payload carried no `topic` object.
    #[error("payload has no topic object")]
    MissingTopic,
}

/// A deserialized webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Set on liveness pings; such payloads carry no topic.
    #[serde(default)]
    pub ping: Option<bool>,

    /// The topic this event concerns, absent on pings.
    #[serde(default)]
    pub topic: Option<TopicPayload>,
}

/// The `topic` object within a webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicPayload {
    pub id: TopicId,
    pub created_at: DateTime<Utc>,
    pub category_id: CategoryId,
    pub title: String,
}

impl WebhookPayload {
    /// Parses a payload from the raw body bytes.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Returns true if this payload is a liveness ping.
    pub fn is_ping(&self) -> bool {
        self.ping == Some(true)
    }

    /// Extracts the topic event, failing if the payload has no topic.
    pub fn into_topic_event(self) -> Result<TopicEvent, PayloadError> {
        let topic = self.topic.ok_or(PayloadError::MissingTopic)?;
        Ok(TopicEvent {
            id: topic.id,
            created_at: topic.created_at,
            category_id: topic.category_id,
            title: topic.title,
        })
    }
}
