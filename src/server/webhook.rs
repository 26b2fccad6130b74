//! Webhook endpoint handler.
//!
//! Accepts Discourse webhook deliveries, verifies the signature over the raw
//! body bytes, and runs eligible topic events through the reservation
//! orchestrator. The body is taken as raw `Bytes` so the HMAC covers exactly
//! the byte sequence the forum signed.
//!
//! Response contract:
//!
//! - `200` - reserved, or an intentionally-ignored event (ping, irrelevant
//!   kind, ineligible topic, already-reserved topic)
//! - `400` - signature header missing, or unusable payload
//! - `403` - signature mismatch
//! - `500` - failure while performing side effects; body is
//!   `{ "success": false, "error": "..." }`

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, extract::State};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::gateways::{ForumGateway, SheetsGateway};
use crate::ledger::ReplyLedger;
use crate::reservation::{ReservationError, ReservationOutcome};
use crate::types::EventKind;
use crate::webhooks::{PayloadError, WebhookPayload, verify_signature};

/// Header carrying the HMAC signature.
const HEADER_SIGNATURE: &str = "x-discourse-event-signature";
/// Header naming the event kind.
const HEADER_EVENT: &str = "x-discourse-event";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The signature header was absent.
    #[error("missing required header: {HEADER_SIGNATURE}")]
    MissingSignature,

    /// The signature header did not match the body.
    #[error("invalid signature")]
    SignatureMismatch,

    /// The body was not a usable payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// The reservation pipeline failed while performing side effects.
    #[error(transparent)]
    Reservation(#[from] ReservationError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match &self {
            WebhookError::MissingSignature => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            WebhookError::SignatureMismatch => {
                (StatusCode::FORBIDDEN, self.to_string()).into_response()
            }
            WebhookError::InvalidPayload(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            WebhookError::Reservation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": self.to_string() })),
            )
                .into_response(),
        }
    }
}

/// Webhook handler.
///
/// Signature verification comes first, before the ping short-circuit and
/// before parsing: unauthenticated traffic must not be able to probe the
/// endpoint, even with a ping payload.
pub async fn webhook_handler<F, S, L>(
    State(app_state): State<AppState<F, S, L>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError>
where
    F: ForumGateway + Send + Sync + 'static,
    S: SheetsGateway + Send + Sync + 'static,
    L: ReplyLedger + Send + Sync + 'static,
{
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    if !verify_signature(&body, signature, app_state.webhook_secret()) {
        warn!("webhook delivery with invalid signature");
        return Err(WebhookError::SignatureMismatch);
    }

    let payload = WebhookPayload::from_slice(&body)?;

    if payload.is_ping() {
        debug!("liveness ping");
        return Ok((StatusCode::OK, "pong"));
    }

    let kind = headers
        .get(HEADER_EVENT)
        .and_then(|v| v.to_str().ok())
        .map(EventKind::from_header)
        .unwrap_or(EventKind::Other);

    if !kind.is_reservable() {
        debug!(?kind, "ignoring non-topic event");
        return Ok((StatusCode::OK, "ignored"));
    }

    let event = payload.into_topic_event()?;
    debug!(topic_id = %event.id, ?kind, "processing topic event");

    match app_state.reserver().process(&event, kind).await? {
        ReservationOutcome::Reserved => Ok((StatusCode::OK, "reserved")),
        ReservationOutcome::NotApplicable | ReservationOutcome::Ineligible => {
            Ok((StatusCode::OK, "ignored"))
        }
        ReservationOutcome::AlreadyReserved | ReservationOutcome::LostClaimRace => {
            Ok((StatusCode::OK, "already reserved"))
        }
    }
}
