//! The replied-topic ledger (dedup store).
//!
//! The ledger is the sole correctness mechanism against duplicate webhook
//! delivery: a topic is reserved by exactly the delivery that wins the claim.
//! Records are created once, never mutated, never deleted.

use std::io;

use thiserror::Error;

use crate::types::TopicId;

pub mod file;

pub use file::FileLedger;

/// Errors from ledger operations.
///
/// Note that losing a claim race is *not* an error; it is the
/// `AlreadyClaimed` outcome of [`ReplyLedger::record`].
#[derive(Debug, Error)]
pub enum LedgerError {
    /// IO error during ledger operations.
    #[error("ledger IO error: {0}")]
    Io(#[from] io::Error),
}

/// The outcome of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller inserted the record and owns the side effects.
    Claimed,

    /// A record already existed: another delivery won the race.
    /// The caller must skip all side effects.
    AlreadyClaimed,
}

/// A durable store of which topics have already been replied to.
///
/// Implementations must enforce uniqueness at the storage layer, not merely
/// in application code: two near-simultaneous `record` calls for the same
/// topic must resolve to exactly one `Claimed` and one `AlreadyClaimed`.
pub trait ReplyLedger {
    /// Returns true iff a record for `topic` is present.
    fn exists(&self, topic: TopicId) -> Result<bool, LedgerError>;

    /// Inserts a record for `topic`, claiming the right to perform side
    /// effects for it. Returns `AlreadyClaimed` if the record already exists.
    fn record(&self, topic: TopicId) -> Result<ClaimOutcome, LedgerError>;
}

impl<T: ReplyLedger> ReplyLedger for std::sync::Arc<T> {
    fn exists(&self, topic: TopicId) -> Result<bool, LedgerError> {
        (**self).exists(topic)
    }

    fn record(&self, topic: TopicId) -> Result<ClaimOutcome, LedgerError> {
        (**self).record(topic)
    }
}
