//! The topic event extracted from a webhook delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CategoryId, TopicId};

/// The kind of webhook event, derived from the `x-discourse-event` header.
///
/// Discourse sends many event kinds; only topic creation and edits can
/// trigger a reservation. Everything else is `Other` and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A topic was created (`topic_created`).
    Created,
    /// A topic was edited (`topic_edited`).
    Edited,
    /// Any other event kind; never triggers a reservation.
    Other,
}

impl EventKind {
    /// Parses the `x-discourse-event` header value.
    ///
    /// Unknown values map to `Other` rather than an error, since the forum
    /// sends many event kinds we deliberately ignore.
    pub fn from_header(value: &str) -> Self {
        match value {
            "topic_created" => EventKind::Created,
            "topic_edited" => EventKind::Edited,
            _ => EventKind::Other,
        }
    }

    /// Returns true if this event kind can trigger a reservation.
    pub fn is_reservable(&self) -> bool {
        matches!(self, EventKind::Created | EventKind::Edited)
    }
}

/// A topic event derived from a single webhook delivery.
///
/// This is transient per-request data; only the topic ID ever gets persisted
/// (as a ledger record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEvent {
    /// The topic's opaque identifier.
    pub id: TopicId,

    /// When the topic was created on the forum.
    pub created_at: DateTime<Utc>,

    /// The category the topic was posted in.
    pub category_id: CategoryId,

    /// The topic title, used in the reservation reply and the sheet hyperlink.
    pub title: String,
}
