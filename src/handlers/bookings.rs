use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{format_price, Booking, BookingStatus, NewBooking, PaymentStatus};
use crate::services::booking;
use crate::services::payments::CheckoutRequest;
use crate::state::AppState;

use super::require_user;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let user_id = require_user(&headers)?;
    let today = Utc::now().date_naive();

    let (booking, _room) = booking::create_booking(&state, &user_id, &request, today).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    let user_id = require_user(&headers)?;
    let db = state.db();
    Ok(Json(queries::get_bookings_for_user(&db, &user_id)?))
}

fn owned_booking(state: &AppState, id: &str, user_id: &str) -> Result<Booking, AppError> {
    let db = state.db();
    queries::get_booking_by_id(&db, id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// GET /api/bookings/:id
pub async fn get_my_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let user_id = require_user(&headers)?;
    Ok(Json(owned_booking(&state, &id, &user_id)?))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_my_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let user_id = require_user(&headers)?;
    let today = Utc::now().date_naive();
    let db = state.db();
    Ok(Json(booking::cancel_for_guest(&db, &id, &user_id, today)?))
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub booking_id: String,
    pub checkout_url: String,
}

// POST /api/bookings/:id/checkout
pub async fn start_checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let user_id = require_user(&headers)?;

    let request = {
        let db = state.db();
        let booking = queries::get_booking_by_id(&db, &id)?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::Conflict("This booking was cancelled.".to_string()));
        }
        if booking.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict("This booking is already paid.".to_string()));
        }

        let room = queries::get_room(&db, &booking.room_id)?
            .ok_or_else(|| AppError::NotFound(format!("room {}", booking.room_id)))?;
        let customer_email = queries::get_user(&db, &user_id)?
            .map(|u| u.email)
            .filter(|e| !e.is_empty());

        let base = state.config.public_base_url.trim_end_matches('/');
        CheckoutRequest {
            booking_id: booking.id.clone(),
            description: format!(
                "{} at {}, {} to {}",
                room.room.name, room.hotel_name, booking.check_in, booking.check_out
            ),
            amount_cents: booking.total_price_cents,
            currency: state.config.payment_currency.clone(),
            customer_email,
            success_url: format!("{base}/bookings/{}?paid=1", booking.id),
            cancel_url: format!("{base}/bookings/{}", booking.id),
        }
    };

    let session = state
        .payments
        .create_checkout(&request)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    {
        let db = state.db();
        queries::set_checkout_session(&db, &request.booking_id, &session.id)?;
    }

    tracing::info!(
        booking_id = %request.booking_id,
        session_id = %session.id,
        amount = %format_price(request.amount_cents),
        "checkout session created"
    );

    Ok(Json(CheckoutResponse {
        booking_id: request.booking_id,
        checkout_url: session.url,
    }))
}
