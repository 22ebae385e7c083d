use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Deserialize;
use sha2::Sha256;

use crate::db::queries;
use crate::models::User;

const TOLERANCE_SECS: i64 = 300;

/// Headers the identity provider attaches to its user-sync webhooks.
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

fn signing_key(secret: &str) -> Option<Vec<u8>> {
    let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}

fn signed_mac(key: &[u8], id: &str, timestamp: &str, payload: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).ok()?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Produces the `v1,<base64>` signature the provider would send.
pub fn sign_webhook(secret: &str, id: &str, timestamp: &str, payload: &[u8]) -> String {
    let signature = signing_key(secret)
        .and_then(|key| signed_mac(&key, id, timestamp, payload))
        .map(|mac| base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("v1,{signature}")
}

pub fn verify_webhook(secret: &str, headers: &WebhookHeaders<'_>, payload: &[u8], now: i64) -> bool {
    let Ok(timestamp) = headers.timestamp.parse::<i64>() else {
        return false;
    };
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return false;
    }
    let Some(key) = signing_key(secret) else {
        return false;
    };
    let Some(mac) = signed_mac(&key, headers.id, headers.timestamp, payload) else {
        return false;
    };

    // Several space-separated signatures may be sent during key rotation.
    headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .any(|candidate| {
            base64::engine::general_purpose::STANDARD
                .decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        })
}

#[derive(Debug, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: IdentityUser,
}

#[derive(Debug, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

impl IdentityUser {
    fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref();
        self.email_addresses
            .iter()
            .find(|e| Some(e.id.as_str()) == primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum IdentityOutcome {
    Upserted(String),
    Deleted(String),
    Ignored,
}

pub fn apply_identity_event(conn: &Connection, event: &IdentityEvent) -> anyhow::Result<IdentityOutcome> {
    match event.kind.as_str() {
        "user.created" | "user.updated" => {
            let existing = queries::get_user(conn, &event.data.id)?;
            let user = User {
                id: event.data.id.clone(),
                email: event.data.primary_email().unwrap_or_default().to_string(),
                name: event.data.display_name(),
                created_at: existing
                    .map(|u| u.created_at)
                    .unwrap_or_else(|| Utc::now().naive_utc()),
            };
            queries::upsert_user(conn, &user)?;
            tracing::info!(user_id = %user.id, kind = %event.kind, "synced user from identity provider");
            Ok(IdentityOutcome::Upserted(user.id))
        }
        "user.deleted" => {
            // Users with bookings are kept so the booking history stays intact.
            let has_bookings = !queries::get_bookings_for_user(conn, &event.data.id)?.is_empty();
            if !has_bookings {
                queries::delete_user(conn, &event.data.id)?;
            }
            tracing::info!(user_id = %event.data.id, kept = has_bookings, "user deleted at identity provider");
            Ok(IdentityOutcome::Deleted(event.data.id.clone()))
        }
        _ => Ok(IdentityOutcome::Ignored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    // base64("test-signing-key")
    const SECRET: &str = "whsec_dGVzdC1zaWduaW5nLWtleQ==";

    fn headers<'a>(timestamp: &'a str, signature: &'a str) -> WebhookHeaders<'a> {
        WebhookHeaders {
            id: "msg_1",
            timestamp,
            signature,
        }
    }

    #[test]
    fn test_valid_webhook_signature() {
        let payload = br#"{"type":"user.created"}"#;
        let signature = sign_webhook(SECRET, "msg_1", "1900000000", payload);
        assert!(verify_webhook(SECRET, &headers("1900000000", &signature), payload, 1_900_000_000));
    }

    #[test]
    fn test_rotated_signatures() {
        let payload = b"{}";
        let good = sign_webhook(SECRET, "msg_1", "1900000000", payload);
        let combined = format!("v1,bm90LXRoZS1zaWc= {good}");
        assert!(verify_webhook(SECRET, &headers("1900000000", &combined), payload, 1_900_000_000));
    }

    #[test]
    fn test_invalid_webhook_signature() {
        let signature = sign_webhook(SECRET, "msg_1", "1900000000", b"original");
        assert!(!verify_webhook(SECRET, &headers("1900000000", &signature), b"changed", 1_900_000_000));
        assert!(!verify_webhook(SECRET, &headers("1900000000", &signature), b"original", 1_900_001_000));
        assert!(!verify_webhook(SECRET, &headers("not-a-number", &signature), b"original", 0));
    }

    #[test]
    fn test_user_lifecycle() {
        let conn = db::init_db(":memory:").unwrap();
        let created: IdentityEvent = serde_json::from_str(
            r#"{"type":"user.created","data":{"id":"user_1","email_addresses":[{"id":"e2","email_address":"alt@example.com"},{"id":"e1","email_address":"ana@example.com"}],"primary_email_address_id":"e1","first_name":"Ana","last_name":"Silva"}}"#,
        )
        .unwrap();
        assert_eq!(
            apply_identity_event(&conn, &created).unwrap(),
            IdentityOutcome::Upserted("user_1".to_string())
        );
        let user = queries::get_user(&conn, "user_1").unwrap().unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.name.as_deref(), Some("Ana Silva"));

        let deleted: IdentityEvent =
            serde_json::from_str(r#"{"type":"user.deleted","data":{"id":"user_1","deleted":true}}"#).unwrap();
        apply_identity_event(&conn, &deleted).unwrap();
        assert!(queries::get_user(&conn, "user_1").unwrap().is_none());
    }

    #[test]
    fn test_user_with_bookings_survives_deletion() {
        use crate::models::{Booking, BookingStatus, Hotel, PaymentStatus, Room};

        let conn = db::init_db(":memory:").unwrap();
        let now = Utc::now().naive_utc();
        queries::upsert_user(
            &conn,
            &User {
                id: "user_1".to_string(),
                email: "ana@example.com".to_string(),
                name: None,
                created_at: now,
            },
        )
        .unwrap();
        queries::create_hotel(
            &conn,
            &Hotel {
                id: "h1".to_string(),
                name: "Harbor Inn".to_string(),
                city: "Lisbon".to_string(),
                address: None,
                description: None,
                rating: None,
                created_at: now,
            },
        )
        .unwrap();
        queries::create_room(
            &conn,
            &Room {
                id: "r1".to_string(),
                hotel_id: "h1".to_string(),
                name: "Sea View Double".to_string(),
                room_type: "double".to_string(),
                capacity: 2,
                price_per_night_cents: 12000,
                description: None,
            },
        )
        .unwrap();
        queries::create_booking(
            &conn,
            &Booking {
                id: "b1".to_string(),
                user_id: "user_1".to_string(),
                room_id: "r1".to_string(),
                check_in: "2030-05-01".parse().unwrap(),
                check_out: "2030-05-03".parse().unwrap(),
                guests: 2,
                total_price_cents: 24000,
                status: BookingStatus::Confirmed,
                payment_status: PaymentStatus::Paid,
                checkout_session_id: None,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();

        let deleted: IdentityEvent =
            serde_json::from_str(r#"{"type":"user.deleted","data":{"id":"user_1","deleted":true}}"#).unwrap();
        assert_eq!(
            apply_identity_event(&conn, &deleted).unwrap(),
            IdentityOutcome::Deleted("user_1".to_string())
        );
        assert!(queries::get_user(&conn, "user_1").unwrap().is_some());
        assert!(queries::get_booking_by_id(&conn, "b1").unwrap().is_some());
    }

    #[test]
    fn test_unrelated_event_ignored() {
        let conn = db::init_db(":memory:").unwrap();
        let event: IdentityEvent =
            serde_json::from_str(r#"{"type":"session.created","data":{"id":"sess_1"}}"#).unwrap();
        assert_eq!(apply_identity_event(&conn, &event).unwrap(), IdentityOutcome::Ignored);
    }
}
