//! The reservation orchestrator.
//!
//! Ties together the gates (event kind, eligibility, ledger) and the side
//! effects (forum reply, spreadsheet row) for a single webhook delivery:
//!
//! ```text
//! event -> kind gate -> eligibility gate -> exists gate -> claim -> post reply
//!       -> read pointer -> insert row -> write cells
//! ```
//!
//! The claim is written *before* the side effects. That is deliberate: the
//! ledger's uniqueness constraint is the only mechanism stopping two
//! concurrent deliveries of the same event from both acting, and claiming
//! after a successful side effect would leave a window where both pass the
//! exists check. The cost is that a gateway failure after the claim leaves
//! the topic permanently marked as attempted with its side effects partly
//! missing; that partial-failure state is logged as an incident for manual
//! remediation, since no automatic reconciliation exists.

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::row::{self, SheetLayout};
use crate::eligibility::EligibilityPolicy;
use crate::gateways::{ForumGateway, GatewayError, SheetsGateway};
use crate::ledger::{ClaimOutcome, LedgerError, ReplyLedger};
use crate::types::{EventKind, TopicEvent, TopicId};

/// The gateway stage that failed after a claim was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    /// Posting the reservation reply on the forum.
    ForumReply,
    /// The pointer read / row insert / cell write sequence.
    SheetUpdate,
}

impl std::fmt::Display for FailedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailedStage::ForumReply => write!(f, "forum reply"),
            FailedStage::SheetUpdate => write!(f, "sheet update"),
        }
    }
}

/// Errors from processing a delivery.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The ledger itself failed (not a lost race).
    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// A gateway call failed after the claim was recorded. The topic is
    /// marked as attempted and will not be retried automatically.
    #[error("{stage} failed after claim on topic {topic}: {source}")]
    Gateway {
        topic: TopicId,
        stage: FailedStage,
        #[source]
        source: GatewayError,
    },

    /// The pointer cell did not contain a usable row index.
    #[error("pointer cell {range} did not contain a row index (got {value:?})")]
    MalformedPointer {
        range: String,
        value: Option<String>,
    },
}

/// The outcome of processing one delivery. Every variant except `Reserved`
/// is an intentional no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// This delivery won the claim and performed both side effects.
    Reserved,

    /// The event kind is not `topic_created`/`topic_edited`.
    NotApplicable,

    /// The topic is outside the eligibility policy.
    Ineligible,

    /// A ledger record already existed before we tried to claim.
    AlreadyReserved,

    /// Another delivery claimed the topic between our exists check and our
    /// claim attempt.
    LostClaimRace,
}

/// The reservation orchestrator.
///
/// Generic over its collaborators so tests can substitute doubles; the
/// production wiring injects [`DiscourseClient`](crate::gateways::DiscourseClient),
/// [`SheetsClient`](crate::gateways::SheetsClient), and
/// [`FileLedger`](crate::ledger::FileLedger).
pub struct Reserver<F, S, L> {
    policy: EligibilityPolicy,
    forum: F,
    sheets: S,
    ledger: L,
    layout: SheetLayout,
    forum_base_url: String,

    /// Serializes the read-pointer -> insert-row -> write-cells sequence.
    /// The pointer cell is a shared counter with no remote guard; two
    /// different topics processed concurrently would otherwise compute the
    /// same row index.
    sheet_lock: Mutex<()>,
}

impl<F, S, L> Reserver<F, S, L>
where
    F: ForumGateway + Send + Sync,
    S: SheetsGateway + Send + Sync,
    L: ReplyLedger + Send + Sync,
{
    pub fn new(
        policy: EligibilityPolicy,
        forum: F,
        sheets: S,
        ledger: L,
        layout: SheetLayout,
        forum_base_url: impl Into<String>,
    ) -> Self {
        Reserver {
            policy,
            forum,
            sheets,
            ledger,
            layout,
            forum_base_url: forum_base_url.into(),
            sheet_lock: Mutex::new(()),
        }
    }

    /// Processes one topic event through the full gate-and-act pipeline.
    pub async fn process(
        &self,
        event: &TopicEvent,
        kind: EventKind,
    ) -> Result<ReservationOutcome, ReservationError> {
        if !kind.is_reservable() {
            return Ok(ReservationOutcome::NotApplicable);
        }

        if !self.policy.is_eligible(event) {
            return Ok(ReservationOutcome::Ineligible);
        }

        if self.ledger.exists(event.id)? {
            return Ok(ReservationOutcome::AlreadyReserved);
        }

        match self.ledger.record(event.id)? {
            ClaimOutcome::AlreadyClaimed => {
                info!(topic_id = %event.id, "lost claim race; another delivery is handling this topic");
                return Ok(ReservationOutcome::LostClaimRace);
            }
            ClaimOutcome::Claimed => {}
        }

        // From here on, any failure is a partial-failure incident: the claim
        // is durable and blocks automatic retries for this topic.
        self.post_reply(event).await?;
        self.append_sheet_row(event).await?;

        info!(
            topic_id = %event.id,
            title = %event.title,
            "topic reserved"
        );
        Ok(ReservationOutcome::Reserved)
    }

    async fn post_reply(&self, event: &TopicEvent) -> Result<(), ReservationError> {
        let body = row::reservation_reply(event.id, &event.title);
        self.forum
            .create_post(event.id, body)
            .await
            .map_err(|source| self.partial_failure(event.id, FailedStage::ForumReply, source))
    }

    async fn append_sheet_row(&self, event: &TopicEvent) -> Result<(), ReservationError> {
        let _guard = self.sheet_lock.lock().await;

        let raw = self
            .sheets
            .read_cell(&self.layout.pointer_range)
            .await
            .map_err(|source| self.partial_failure(event.id, FailedStage::SheetUpdate, source))?;

        let pointer = match raw.as_deref().and_then(row::parse_row_pointer) {
            Some(p) => p,
            None => {
                error!(
                    topic_id = %event.id,
                    range = %self.layout.pointer_range,
                    value = ?raw,
                    "partial reservation: pointer cell unusable after claim; manual remediation required"
                );
                return Err(ReservationError::MalformedPointer {
                    range: self.layout.pointer_range.clone(),
                    value: raw,
                });
            }
        };

        self.sheets
            .insert_row(self.layout.sheet_id, pointer)
            .await
            .map_err(|source| self.partial_failure(event.id, FailedStage::SheetUpdate, source))?;

        let writes = row::row_writes(
            &self.layout,
            &self.forum_base_url,
            event.id,
            &event.title,
            event.created_at,
            pointer,
        );
        self.sheets
            .batch_write_cells(writes)
            .await
            .map_err(|source| self.partial_failure(event.id, FailedStage::SheetUpdate, source))
    }

    fn partial_failure(
        &self,
        topic: TopicId,
        stage: FailedStage,
        source: GatewayError,
    ) -> ReservationError {
        error!(
            topic_id = %topic,
            %stage,
            error = %source,
            "partial reservation: claim recorded but side effects incomplete; manual remediation required"
        );
        ReservationError::Gateway {
            topic,
            stage,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryLedger, MockForum, MockSheets};
    use crate::types::CategoryId;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 17, 20, 0, 0).unwrap()
    }

    fn policy() -> EligibilityPolicy {
        EligibilityPolicy::new(cutoff(), [CategoryId(5)])
    }

    fn layout() -> SheetLayout {
        SheetLayout {
            pointer_range: "Parameters!B2".to_string(),
            sheet_name: "Summary".to_string(),
            sheet_id: 0,
            date_column: 'A',
            link_column: 'D',
        }
    }

    fn eligible_event(id: u64) -> TopicEvent {
        TopicEvent {
            id: TopicId(id),
            created_at: cutoff(),
            category_id: CategoryId(5),
            title: format!("MIP-{}: Example", id),
        }
    }

    fn reserver(
        forum: MockForum,
        sheets: MockSheets,
        ledger: MemoryLedger,
    ) -> Reserver<MockForum, MockSheets, MemoryLedger> {
        Reserver::new(
            policy(),
            forum,
            sheets,
            ledger,
            layout(),
            "https://forum.example.org",
        )
    }

    #[tokio::test]
    async fn fresh_eligible_topic_gets_reserved() {
        let r = reserver(MockForum::new(), MockSheets::with_pointer("5"), MemoryLedger::new());
        let event = eligible_event(42);

        let outcome = r.process(&event, EventKind::Created).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::Reserved);

        // One forum post referencing the topic id and title
        let posts = r.forum.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, TopicId(42));
        assert!(posts[0].1.contains("42"));
        assert!(posts[0].1.contains("MIP-42: Example"));

        // One row inserted at the pointer index
        assert_eq!(r.sheets.inserted(), vec![(0, 5)]);

        // Cell writes target row pointer+1
        let writes = r.sheets.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].range, "'Summary'!A6");
        assert!(writes[1].value.contains("/t/42"));

        // Ledger has the record
        assert!(r.ledger.exists(TopicId(42)).unwrap());
    }

    #[tokio::test]
    async fn non_topic_events_are_no_ops() {
        let r = reserver(MockForum::new(), MockSheets::with_pointer("5"), MemoryLedger::new());
        let event = eligible_event(1);

        let outcome = r.process(&event, EventKind::Other).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::NotApplicable);
        assert_eq!(r.forum.post_count(), 0);
        assert_eq!(r.sheets.call_count(), 0);
        assert!(!r.ledger.exists(TopicId(1)).unwrap());
    }

    #[tokio::test]
    async fn edited_events_are_reservable() {
        let r = reserver(MockForum::new(), MockSheets::with_pointer("3"), MemoryLedger::new());
        let outcome = r
            .process(&eligible_event(2), EventKind::Edited)
            .await
            .unwrap();
        assert_eq!(outcome, ReservationOutcome::Reserved);
    }

    #[tokio::test]
    async fn pre_cutoff_topic_is_ineligible_with_zero_side_effects() {
        let r = reserver(MockForum::new(), MockSheets::with_pointer("5"), MemoryLedger::new());
        let mut event = eligible_event(3);
        event.created_at = cutoff() - chrono::Duration::seconds(1);

        let outcome = r.process(&event, EventKind::Created).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::Ineligible);
        assert_eq!(r.forum.post_count(), 0);
        assert_eq!(r.sheets.call_count(), 0);
        assert!(!r.ledger.exists(TopicId(3)).unwrap());
    }

    #[tokio::test]
    async fn disallowed_category_is_ineligible_regardless_of_timestamp() {
        let r = reserver(MockForum::new(), MockSheets::with_pointer("5"), MemoryLedger::new());
        let mut event = eligible_event(4);
        event.category_id = CategoryId(99);
        event.created_at = cutoff() + chrono::Duration::days(100);

        let outcome = r.process(&event, EventKind::Created).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::Ineligible);
        assert_eq!(r.sheets.call_count(), 0);
    }

    #[tokio::test]
    async fn replay_of_a_reserved_topic_is_a_no_op() {
        let r = reserver(MockForum::new(), MockSheets::with_pointer("5"), MemoryLedger::new());
        let event = eligible_event(5);

        let first = r.process(&event, EventKind::Created).await.unwrap();
        assert_eq!(first, ReservationOutcome::Reserved);

        let second = r.process(&event, EventKind::Created).await.unwrap();
        assert_eq!(second, ReservationOutcome::AlreadyReserved);

        // No additional side effects
        assert_eq!(r.forum.post_count(), 1);
        assert_eq!(r.sheets.inserted().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_produce_exactly_one_side_effect() {
        let r = std::sync::Arc::new(reserver(
            MockForum::new(),
            MockSheets::with_pointer("5"),
            MemoryLedger::new(),
        ));
        let event = eligible_event(6);

        let (a, b) = tokio::join!(
            r.process(&event, EventKind::Created),
            r.process(&event, EventKind::Created),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let reserved = outcomes
            .iter()
            .filter(|o| **o == ReservationOutcome::Reserved)
            .count();
        assert_eq!(reserved, 1, "exactly one delivery must win");
        assert!(outcomes.iter().any(|o| matches!(
            o,
            ReservationOutcome::AlreadyReserved | ReservationOutcome::LostClaimRace
        )));

        assert_eq!(r.forum.post_count(), 1);
        assert_eq!(r.sheets.inserted().len(), 1);
    }

    /// A ledger that reports absence on `exists` but loses every claim,
    /// simulating a race lost between the two calls.
    struct RacyLedger;

    impl ReplyLedger for RacyLedger {
        fn exists(&self, _topic: TopicId) -> Result<bool, LedgerError> {
            Ok(false)
        }
        fn record(&self, _topic: TopicId) -> Result<ClaimOutcome, LedgerError> {
            Ok(ClaimOutcome::AlreadyClaimed)
        }
    }

    #[tokio::test]
    async fn lost_claim_race_skips_side_effects() {
        let forum = MockForum::new();
        let sheets = MockSheets::with_pointer("5");
        let r = Reserver::new(
            policy(),
            forum,
            sheets,
            RacyLedger,
            layout(),
            "https://forum.example.org",
        );

        let outcome = r
            .process(&eligible_event(7), EventKind::Created)
            .await
            .unwrap();
        assert_eq!(outcome, ReservationOutcome::LostClaimRace);
        assert_eq!(r.forum.post_count(), 0);
        assert_eq!(r.sheets.call_count(), 0);
    }

    #[tokio::test]
    async fn forum_failure_after_claim_is_a_partial_failure() {
        let forum = MockForum::failing();
        let r = Reserver::new(
            policy(),
            forum,
            MockSheets::with_pointer("5"),
            MemoryLedger::new(),
            layout(),
            "https://forum.example.org",
        );
        let event = eligible_event(8);

        let err = r.process(&event, EventKind::Created).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::Gateway {
                stage: FailedStage::ForumReply,
                ..
            }
        ));

        // The claim stands: the topic is blocked from retries.
        assert!(r.ledger.exists(TopicId(8)).unwrap());
        // The sheet was never touched.
        assert_eq!(r.sheets.call_count(), 0);

        // A replay observes the claim and does nothing.
        let outcome = r.process(&event, EventKind::Created).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::AlreadyReserved);
    }

    #[tokio::test]
    async fn sheet_failure_after_claim_is_a_partial_failure() {
        let r = Reserver::new(
            policy(),
            MockForum::new(),
            MockSheets::failing(),
            MemoryLedger::new(),
            layout(),
            "https://forum.example.org",
        );
        let event = eligible_event(9);

        let err = r.process(&event, EventKind::Created).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::Gateway {
                stage: FailedStage::SheetUpdate,
                ..
            }
        ));

        // The forum reply did go out before the sheet failed.
        assert_eq!(r.forum.post_count(), 1);
        assert!(r.ledger.exists(TopicId(9)).unwrap());
    }

    #[tokio::test]
    async fn unusable_pointer_cell_is_a_distinct_error() {
        for pointer in [None, Some("not-a-number")] {
            let sheets = match pointer {
                Some(p) => MockSheets::with_pointer(p),
                None => MockSheets::with_empty_pointer(),
            };
            let r = Reserver::new(
                policy(),
                MockForum::new(),
                sheets,
                MemoryLedger::new(),
                layout(),
                "https://forum.example.org",
            );

            let err = r
                .process(&eligible_event(10), EventKind::Created)
                .await
                .unwrap_err();
            assert!(matches!(err, ReservationError::MalformedPointer { .. }));
            // No row insert or write happened.
            assert!(r.sheets.inserted().is_empty());
            assert!(r.sheets.writes().is_empty());
        }
    }

    /// A sheets double that records the interleaving of pointer reads and
    /// row inserts, to check the mutex serializes the sequence.
    struct InterleavingSheets {
        log: StdMutex<Vec<&'static str>>,
    }

    impl SheetsGateway for InterleavingSheets {
        async fn read_cell(&self, _range: &str) -> Result<Option<String>, GatewayError> {
            self.log.lock().unwrap().push("read");
            // Yield so a concurrent task could interleave if unserialized.
            tokio::task::yield_now().await;
            Ok(Some("5".to_string()))
        }
        async fn insert_row(&self, _sheet_id: i64, _at_index: u32) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push("insert");
            tokio::task::yield_now().await;
            Ok(())
        }
        async fn batch_write_cells(
            &self,
            _writes: Vec<crate::gateways::CellWrite>,
        ) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push("write");
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn sheet_sequences_for_different_topics_never_interleave() {
        let r = std::sync::Arc::new(Reserver::new(
            policy(),
            MockForum::new(),
            InterleavingSheets {
                log: StdMutex::new(Vec::new()),
            },
            MemoryLedger::new(),
            layout(),
            "https://forum.example.org",
        ));

        let e1 = eligible_event(11);
        let e2 = eligible_event(12);
        let (a, b) = tokio::join!(
            r.process(&e1, EventKind::Created),
            r.process(&e2, EventKind::Created),
        );
        a.unwrap();
        b.unwrap();

        let log = r.sheets.log.lock().unwrap().clone();
        assert_eq!(log.len(), 6);
        // Each read/insert/write triple must be contiguous.
        for chunk in log.chunks(3) {
            assert_eq!(chunk, ["read", "insert", "write"]);
        }

        let distinct: HashSet<_> = log.iter().collect();
        assert_eq!(distinct.len(), 3);
    }
}
