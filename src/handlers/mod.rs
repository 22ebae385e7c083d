pub mod admin;
pub mod bookings;
pub mod calendar;
pub mod chat;
pub mod health;
pub mod hotels;
pub mod webhook;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

use crate::errors::AppError;
use crate::state::AppState;

/// Set by the auth gateway in front of the service once the identity
/// provider has validated the session.
///
/// The service trusts this header as-is. Deployments must put the gateway in
/// front of every route, and the gateway must strip any inbound `x-user-id`
/// before setting its own. Otherwise a client can act as any user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The gateway-asserted user id, see [`USER_ID_HEADER`]. Blank values count
/// as signed out.
pub fn current_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    current_user_id(headers).ok_or(AppError::Unauthorized)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::chat))
        .route("/api/hotels", get(hotels::list_hotels))
        .route("/api/hotels/:id", get(hotels::get_hotel))
        .route("/api/hotels/:id/rooms", get(hotels::list_hotel_rooms))
        .route("/api/rooms/search", get(hotels::search_rooms))
        .route(
            "/api/rooms/:id/availability",
            get(hotels::room_availability),
        )
        .route(
            "/api/bookings",
            get(bookings::list_my_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_my_booking))
        .route(
            "/api/bookings/:id/cancel",
            post(bookings::cancel_my_booking),
        )
        .route(
            "/api/bookings/:id/checkout",
            post(bookings::start_checkout),
        )
        .route(
            "/calendar/:booking_id",
            get(calendar::download_ics),
        )
        .route("/webhook/payment", post(webhook::payment_webhook))
        .route("/webhook/auth", post(webhook::auth_webhook))
        .route("/api/admin/hotels", post(admin::create_hotel))
        .route("/api/admin/rooms", post(admin::create_room))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/cancel",
            post(admin::cancel_booking),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_current_user_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(current_user_id(&headers), None);
        assert!(matches!(require_user(&headers), Err(AppError::Unauthorized)));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(current_user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" user_1 "));
        assert_eq!(current_user_id(&headers).as_deref(), Some("user_1"));
        assert_eq!(require_user(&headers).unwrap(), "user_1");
    }
}
