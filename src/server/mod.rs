//! HTTP server for the topic reservation service.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts Discourse webhook deliveries
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

use crate::gateways::{ForumGateway, SheetsGateway};
use crate::ledger::ReplyLedger;
use crate::reservation::Reserver;

/// Shared application state, passed to handlers via Axum's `State` extractor.
pub struct AppState<F, S, L> {
    inner: Arc<AppStateInner<F, S, L>>,
}

// Manual Clone: the derive would demand F/S/L: Clone, but only the Arc is cloned.
impl<F, S, L> Clone for AppState<F, S, L> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<F, S, L> {
    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,

    /// The reservation orchestrator with its gateways and ledger.
    reserver: Reserver<F, S, L>,
}

impl<F, S, L> AppState<F, S, L>
where
    F: ForumGateway + Send + Sync,
    S: SheetsGateway + Send + Sync,
    L: ReplyLedger + Send + Sync,
{
    pub fn new(webhook_secret: impl Into<Vec<u8>>, reserver: Reserver<F, S, L>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                reserver,
            }),
        }
    }

    /// Returns the webhook secret.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    /// Returns the reservation orchestrator.
    pub fn reserver(&self) -> &Reserver<F, S, L> {
        &self.inner.reserver
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<F, S, L>(app_state: AppState<F, S, L>) -> axum::Router
where
    F: ForumGateway + Send + Sync + 'static,
    S: SheetsGateway + Send + Sync + 'static,
    L: ReplyLedger + Send + Sync + 'static,
{
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler::<F, S, L>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
