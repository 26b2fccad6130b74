//! Shared test doubles for the gateway and ledger seams.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::gateways::{CellWrite, ForumGateway, GatewayError, SheetsGateway};
use crate::ledger::{ClaimOutcome, LedgerError, ReplyLedger};
use crate::types::TopicId;

/// A forum gateway that records posts in memory.
pub struct MockForum {
    posts: Mutex<Vec<(TopicId, String)>>,
    fail: bool,
}

impl MockForum {
    pub fn new() -> Self {
        MockForum {
            posts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A forum whose every call fails with a transient error.
    pub fn failing() -> Self {
        MockForum {
            posts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn posts(&self) -> Vec<(TopicId, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

impl ForumGateway for MockForum {
    async fn create_post(&self, topic: TopicId, body: String) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::transient("mock forum down"));
        }
        self.posts.lock().unwrap().push((topic, body));
        Ok(())
    }
}

/// A sheets gateway backed by in-memory state.
pub struct MockSheets {
    pointer: Option<String>,
    inserted: Mutex<Vec<(i64, u32)>>,
    writes: Mutex<Vec<CellWrite>>,
    reads: Mutex<Vec<String>>,
    fail: bool,
}

impl MockSheets {
    /// A sheet whose pointer cell holds `value`.
    pub fn with_pointer(value: &str) -> Self {
        MockSheets {
            pointer: Some(value.to_string()),
            inserted: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            reads: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A sheet whose pointer cell is empty.
    pub fn with_empty_pointer() -> Self {
        MockSheets {
            pointer: None,
            ..Self::with_pointer("")
        }
    }

    /// A sheet whose every call fails with a transient error.
    pub fn failing() -> Self {
        MockSheets {
            fail: true,
            ..Self::with_pointer("5")
        }
    }

    pub fn inserted(&self) -> Vec<(i64, u32)> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<CellWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Total number of gateway calls made (reads + inserts + writes).
    pub fn call_count(&self) -> usize {
        self.reads.lock().unwrap().len()
            + self.inserted.lock().unwrap().len()
            + self.writes.lock().unwrap().len()
    }
}

impl SheetsGateway for MockSheets {
    async fn read_cell(&self, range: &str) -> Result<Option<String>, GatewayError> {
        if self.fail {
            return Err(GatewayError::transient("mock sheets down"));
        }
        self.reads.lock().unwrap().push(range.to_string());
        Ok(self.pointer.clone())
    }

    async fn insert_row(&self, sheet_id: i64, at_index: u32) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::transient("mock sheets down"));
        }
        self.inserted.lock().unwrap().push((sheet_id, at_index));
        Ok(())
    }

    async fn batch_write_cells(&self, writes: Vec<CellWrite>) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::transient("mock sheets down"));
        }
        self.writes.lock().unwrap().extend(writes);
        Ok(())
    }
}

/// A ledger backed by an in-memory set with atomic insert semantics.
pub struct MemoryLedger {
    seen: Mutex<HashSet<u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger {
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl ReplyLedger for MemoryLedger {
    fn exists(&self, topic: TopicId) -> Result<bool, LedgerError> {
        Ok(self.seen.lock().unwrap().contains(&topic.as_u64()))
    }

    fn record(&self, topic: TopicId) -> Result<ClaimOutcome, LedgerError> {
        if self.seen.lock().unwrap().insert(topic.as_u64()) {
            Ok(ClaimOutcome::Claimed)
        } else {
            Ok(ClaimOutcome::AlreadyClaimed)
        }
    }
}
