use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::services::identity::{self, IdentityEvent, IdentityOutcome, WebhookHeaders};
use crate::services::payments::{self, PaymentEvent, PaymentOutcome};
use crate::state::AppState;

pub const PAYMENT_SIGNATURE_HEADER: &str = "stripe-signature";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// POST /webhook/payment
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // Skipped when no secret is configured (dev mode)
    let secret = &state.config.payment_webhook_secret;
    if !secret.is_empty() {
        let signature = header(&headers, PAYMENT_SIGNATURE_HEADER);
        if signature.is_empty() {
            tracing::warn!("missing payment webhook signature");
            return Err(AppError::InvalidSignature);
        }
        if !payments::verify_signature(secret, signature, &body, Utc::now().timestamp()) {
            tracing::warn!("invalid payment webhook signature");
            return Err(AppError::InvalidSignature);
        }
    }

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid payment event: {e}")))?;

    let outcome = {
        let db = state.db();
        payments::apply_payment_event(&db, &event)?
    };

    match &outcome {
        PaymentOutcome::Confirmed(booking_id) => {
            tracing::info!(booking_id = %booking_id, "booking paid and confirmed");
        }
        PaymentOutcome::UnknownBooking => {
            // Acknowledged anyway so the provider stops retrying.
            tracing::warn!(session_id = %event.data.object.id, "payment for unknown or cancelled booking");
        }
        PaymentOutcome::Ignored => {
            tracing::debug!(kind = %event.kind, "payment event ignored");
        }
    }

    Ok(Json(json!({ "received": true })))
}

// POST /webhook/auth
pub async fn auth_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let secret = &state.config.auth_webhook_secret;
    if !secret.is_empty() {
        let webhook_headers = WebhookHeaders {
            id: header(&headers, "svix-id"),
            timestamp: header(&headers, "svix-timestamp"),
            signature: header(&headers, "svix-signature"),
        };
        if !identity::verify_webhook(secret, &webhook_headers, &body, Utc::now().timestamp()) {
            tracing::warn!(msg_id = %webhook_headers.id, "invalid identity webhook signature");
            return Err(AppError::InvalidSignature);
        }
    }

    let event: IdentityEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid identity event: {e}")))?;

    let outcome = {
        let db = state.db();
        identity::apply_identity_event(&db, &event)?
    };
    if outcome == IdentityOutcome::Ignored {
        tracing::debug!(kind = %event.kind, "identity event ignored");
    }

    Ok(Json(json!({ "received": true })))
}
