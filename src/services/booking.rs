use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{
    Booking, BookingStatus, NewBooking, PaymentStatus, RoomListing, StayDates, User,
};
use crate::services::email;
use crate::state::AppState;

pub const MAX_NIGHTS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Check-out must be after check-in.")]
    InvalidDates,

    #[error("Check-in can't be in the past.")]
    PastCheckIn,

    #[error("Stays are limited to {} nights.", MAX_NIGHTS)]
    TooLong,

    #[error("A booking needs at least one guest.")]
    NoGuests,

    #[error("This room sleeps at most {capacity} guests.")]
    OverCapacity { capacity: i32 },

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("Sorry, that room is already booked for those dates.")]
    Unavailable,

    #[error("Bookings can only be cancelled before check-in.")]
    CancelTooLate,

    #[error("This booking is already cancelled.")]
    AlreadyCancelled,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct Availability {
    pub room: RoomListing,
    pub dates: StayDates,
    pub available: bool,
    pub total_price_cents: i64,
}

pub fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
) -> Result<StayDates, BookingError> {
    if check_out <= check_in {
        return Err(BookingError::InvalidDates);
    }
    if check_in < today {
        return Err(BookingError::PastCheckIn);
    }
    let dates = StayDates {
        check_in,
        check_out,
    };
    if dates.nights() > MAX_NIGHTS {
        return Err(BookingError::TooLong);
    }
    Ok(dates)
}

/// Nights × nightly rate, in cents.
pub fn quote_price(dates: &StayDates, price_per_night_cents: i64) -> i64 {
    dates.nights() * price_per_night_cents
}

/// The query narrows by date in SQL; each candidate is re-checked against the
/// half-open rule before the room counts as taken.
pub fn is_room_free(conn: &Connection, room_id: &str, dates: &StayDates) -> anyhow::Result<bool> {
    let conflicts = queries::get_overlapping_bookings(conn, room_id, dates)?;
    Ok(!conflicts.iter().any(|b| b.dates().overlaps(dates)))
}

pub fn check_availability(
    conn: &Connection,
    room_id: &str,
    dates: StayDates,
) -> Result<Availability, BookingError> {
    let room = queries::get_room(conn, room_id)?
        .ok_or_else(|| BookingError::RoomNotFound(room_id.to_string()))?;
    let available = is_room_free(conn, room_id, &dates)?;
    let total_price_cents = quote_price(&dates, room.room.price_per_night_cents);

    Ok(Availability {
        room,
        dates,
        available,
        total_price_cents,
    })
}

/// Reserves a room for a guest and emails a confirmation. The booking stays
/// `pending` until the checkout webhook marks it paid.
pub async fn create_booking(
    state: &AppState,
    user_id: &str,
    request: &NewBooking,
    today: NaiveDate,
) -> Result<(Booking, RoomListing), BookingError> {
    if request.guests < 1 {
        return Err(BookingError::NoGuests);
    }
    let dates = validate_stay(request.check_in, request.check_out, today)?;

    let (booking, room, user) = {
        // The overlap check and the insert happen under one lock, so two
        // requests for the same room can't both pass the check.
        let db = state.db();

        let room = queries::get_room(&db, &request.room_id)?
            .ok_or_else(|| BookingError::RoomNotFound(request.room_id.clone()))?;
        if request.guests > room.room.capacity {
            return Err(BookingError::OverCapacity {
                capacity: room.room.capacity,
            });
        }

        let user = ensure_user(&db, user_id)?;

        if !is_room_free(&db, &request.room_id, &dates)? {
            return Err(BookingError::Unavailable);
        }

        let now = Utc::now().naive_utc();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            room_id: room.room.id.clone(),
            check_in: dates.check_in,
            check_out: dates.check_out,
            guests: request.guests,
            total_price_cents: quote_price(&dates, room.room.price_per_night_cents),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            checkout_session_id: None,
            created_at: now,
            updated_at: now,
        };
        queries::create_booking(&db, &booking)?;
        (booking, room, user)
    };

    tracing::info!(
        booking_id = %booking.id,
        room_id = %booking.room_id,
        user_id = %booking.user_id,
        nights = dates.nights(),
        total_cents = booking.total_price_cents,
        "booking created"
    );

    send_confirmation(state, &user, &booking, &room).await;

    Ok((booking, room))
}

/// The identity webhook may arrive after the guest's first request; a bare
/// record is created so the booking has an owner.
fn ensure_user(conn: &Connection, user_id: &str) -> anyhow::Result<User> {
    if let Some(user) = queries::get_user(conn, user_id)? {
        return Ok(user);
    }
    let user = User {
        id: user_id.to_string(),
        email: String::new(),
        name: None,
        created_at: Utc::now().naive_utc(),
    };
    queries::upsert_user(conn, &user)?;
    tracing::info!(user_id = %user_id, "provisioned user ahead of identity sync");
    Ok(user)
}

async fn send_confirmation(state: &AppState, user: &User, booking: &Booking, room: &RoomListing) {
    if user.email.is_empty() {
        tracing::warn!(user_id = %user.id, "no email on file, skipping booking confirmation");
        return;
    }

    let message = email::booking_confirmation(booking, room);
    if let Err(e) = state.mailer.send(&user.email, &message).await {
        tracing::error!(error = %e, booking_id = %booking.id, "failed to send booking confirmation");
    }
}

/// Cancels a guest's own booking. Only allowed before the check-in day.
pub fn cancel_for_guest(
    conn: &Connection,
    booking_id: &str,
    user_id: &str,
    today: NaiveDate,
) -> Result<Booking, BookingError> {
    let mut booking = queries::get_booking_by_id(conn, booking_id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

    if booking.status == BookingStatus::Cancelled {
        return Err(BookingError::AlreadyCancelled);
    }
    if booking.check_in <= today {
        return Err(BookingError::CancelTooLate);
    }

    queries::update_booking_status(conn, &booking.id, &BookingStatus::Cancelled)?;
    booking.status = BookingStatus::Cancelled;
    tracing::info!(booking_id = %booking.id, user_id = %user_id, "booking cancelled by guest");
    Ok(booking)
}
