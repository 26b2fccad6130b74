//! File-backed ledger with exclusive-create claim semantics.
//!
//! Each replied topic is one file, `<topic-id>.reserved`, in the ledger
//! directory. The claim is `File::create_new` (O_CREAT | O_EXCL), so
//! uniqueness is enforced by the filesystem even when two claim attempts
//! race: exactly one create succeeds, the other observes `AlreadyExists`.
//! The directory is fsynced after a successful create so the claim survives
//! a crash.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{ClaimOutcome, LedgerError, ReplyLedger};
use crate::types::TopicId;

/// A [`ReplyLedger`] persisting one file per replied topic.
#[derive(Debug, Clone)]
pub struct FileLedger {
    dir: PathBuf,
}

impl FileLedger {
    /// Creates a ledger rooted at `dir`. The directory is created if absent.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileLedger { dir })
    }

    fn record_path(&self, topic: TopicId) -> PathBuf {
        self.dir.join(format!("{}.reserved", topic.as_u64()))
    }
}

impl ReplyLedger for FileLedger {
    fn exists(&self, topic: TopicId) -> Result<bool, LedgerError> {
        Ok(self.record_path(topic).exists())
    }

    fn record(&self, topic: TopicId) -> Result<ClaimOutcome, LedgerError> {
        match File::create_new(self.record_path(topic)) {
            Ok(mut file) => {
                // The content is informational only; the file's existence is
                // the claim. The timestamp helps manual remediation after a
                // partial failure.
                file.write_all(Utc::now().to_rfc3339().as_bytes())?;
                file.sync_all()?;
                fsync_dir(&self.dir)?;
                Ok(ClaimOutcome::Claimed)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(ClaimOutcome::AlreadyClaimed),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fsyncs a directory so a just-created entry is durable.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
