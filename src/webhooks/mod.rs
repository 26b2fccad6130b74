//! Webhook authenticity and payload handling.

pub mod events;
pub mod signature;

pub use events::{PayloadError, TopicPayload, WebhookPayload};
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
};
