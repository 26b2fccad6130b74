//! External-system gateways.
//!
//! The forum and spreadsheet are collaborators outside the core: the traits
//! here are the seams the orchestrator is written against, so tests can
//! substitute doubles, and the production clients are constructed once at
//! startup and injected.

pub mod error;
pub mod forum;
pub mod sheets;

pub use error::{GatewayError, GatewayErrorKind};
pub use forum::{DiscourseClient, ForumGateway};
pub use sheets::{CellWrite, SheetsClient, SheetsGateway};
