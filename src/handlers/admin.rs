use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Hotel, Room};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

// POST /api/admin/hotels
#[derive(Deserialize)]
pub struct NewHotel {
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
}

pub async fn create_hotel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewHotel>,
) -> Result<(StatusCode, Json<Hotel>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
        return Err(AppError::BadRequest("rating must be between 0 and 5".to_string()));
    }

    let hotel = Hotel {
        id: uuid::Uuid::new_v4().to_string(),
        name: required(&body.name, "name")?,
        city: required(&body.city, "city")?,
        address: body.address,
        description: body.description,
        rating: body.rating,
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db();
        queries::create_hotel(&db, &hotel)?;
    }

    tracing::info!(hotel_id = %hotel.id, city = %hotel.city, "hotel created");
    Ok((StatusCode::CREATED, Json(hotel)))
}

// POST /api/admin/rooms
#[derive(Deserialize)]
pub struct NewRoom {
    pub hotel_id: String,
    pub name: String,
    pub room_type: String,
    pub capacity: i32,
    pub price_per_night_cents: i64,
    pub description: Option<String>,
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewRoom>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.capacity < 1 {
        return Err(AppError::BadRequest("capacity must be at least 1".to_string()));
    }
    if body.price_per_night_cents < 0 {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let room = Room {
        id: uuid::Uuid::new_v4().to_string(),
        hotel_id: body.hotel_id,
        name: required(&body.name, "name")?,
        room_type: required(&body.room_type, "room_type")?.to_lowercase(),
        capacity: body.capacity,
        price_per_night_cents: body.price_per_night_cents,
        description: body.description,
    };

    {
        let db = state.db();
        if queries::get_hotel(&db, &room.hotel_id)?.is_none() {
            return Err(AppError::NotFound(format!("hotel {}", room.hotel_id)));
        }
        queries::create_room(&db, &room)?;
    }

    tracing::info!(room_id = %room.id, hotel_id = %room.hotel_id, "room created");
    Ok((StatusCode::CREATED, Json(room)))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let status_filter = query.status.as_deref();

    let db = state.db();
    Ok(Json(queries::get_all_bookings(&db, status_filter, limit)?))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let updated = {
        let db = state.db();
        queries::update_booking_status(&db, &id, &BookingStatus::Cancelled)?
    };

    if updated {
        tracing::info!(booking_id = %id, "booking cancelled by admin");
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("booking {id}")))
    }
}
