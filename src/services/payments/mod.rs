pub mod hosted;

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Deserialize;
use sha2::Sha256;

use crate::db::queries;

/// Webhook timestamps older than this are rejected as replays.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub booking_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession>;
}

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    pub object: CheckoutSessionObject,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum PaymentOutcome {
    Confirmed(String),
    UnknownBooking,
    Ignored,
}

/// Applies a checkout webhook event to the booking it references.
pub fn apply_payment_event(conn: &Connection, event: &PaymentEvent) -> anyhow::Result<PaymentOutcome> {
    if event.kind != "checkout.session.completed" {
        return Ok(PaymentOutcome::Ignored);
    }

    let session = &event.data.object;
    if session.payment_status.as_deref() == Some("unpaid") {
        // Delayed payment methods complete the session before the money arrives.
        return Ok(PaymentOutcome::Ignored);
    }

    let booking_id = match session
        .client_reference_id
        .clone()
        .or_else(|| session.metadata.get("booking_id").cloned())
    {
        Some(id) => Some(id),
        None => queries::get_booking_by_session(conn, &session.id)?.map(|b| b.id),
    };

    let Some(booking_id) = booking_id else {
        return Ok(PaymentOutcome::UnknownBooking);
    };

    if queries::mark_booking_paid(conn, &booking_id)? {
        Ok(PaymentOutcome::Confirmed(booking_id))
    } else {
        Ok(PaymentOutcome::UnknownBooking)
    }
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Builds a `t=<unix>,v1=<hex>` signature header for `payload`.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = signed_mac(secret, timestamp, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={timestamp},v1={signature}")
}

pub fn verify_signature(secret: &str, header: &str, payload: &[u8], now: i64) -> bool {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }
    let Some(mac) = signed_mac(secret, timestamp, payload) else {
        return false;
    };

    candidates.into_iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    })
}
