//! Topic Reserver - a webhook service that reserves forum topics for
//! proposal summaries.
//!
//! When the forum delivers a topic event, the service verifies the delivery's
//! HMAC signature, checks the topic against the eligibility policy, claims it
//! in a durable ledger, posts a reservation reply on the topic, and records
//! the topic in a tracking spreadsheet.

pub mod config;
pub mod eligibility;
pub mod gateways;
pub mod ledger;
pub mod reservation;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
