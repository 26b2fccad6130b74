//! Core domain types.

pub mod ids;
pub mod topic;

pub use ids::{CategoryId, TopicId};
pub use topic::{EventKind, TopicEvent};
