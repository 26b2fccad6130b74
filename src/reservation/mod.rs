//! The reservation pipeline: row composition and the orchestrator.

pub mod orchestrator;
pub mod row;

pub use orchestrator::{FailedStage, ReservationError, ReservationOutcome, Reserver};
pub use row::SheetLayout;
