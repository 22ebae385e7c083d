use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Hotel, RoomListing, RoomSearch, StayDates};
use crate::services::booking;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HotelsQuery {
    pub city: Option<String>,
}

// GET /api/hotels
pub async fn list_hotels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HotelsQuery>,
) -> Result<Json<Vec<Hotel>>, AppError> {
    let db = state.db();
    let hotels = queries::list_hotels(&db, query.city.as_deref())?;
    Ok(Json(hotels))
}

// GET /api/hotels/:id
pub async fn get_hotel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Hotel>, AppError> {
    let db = state.db();
    queries::get_hotel(&db, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("hotel {id}")))
}

// GET /api/hotels/:id/rooms
pub async fn list_hotel_rooms(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RoomListing>>, AppError> {
    let db = state.db();
    if queries::get_hotel(&db, &id)?.is_none() {
        return Err(AppError::NotFound(format!("hotel {id}")));
    }
    Ok(Json(queries::list_rooms_for_hotel(&db, &id)?))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub city: Option<String>,
    pub guests: Option<i32>,
    /// Whole currency units, as typed by the guest.
    pub max_price: Option<f64>,
    pub room_type: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub listing: RoomListing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price_cents: Option<i64>,
}

fn stay_from(
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
) -> Result<Option<StayDates>, AppError> {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => {
            let today = Utc::now().date_naive();
            Ok(Some(booking::validate_stay(check_in, check_out, today)?))
        }
        (None, None) => Ok(None),
        _ => Err(AppError::BadRequest(
            "check_in and check_out must be given together".to_string(),
        )),
    }
}

// GET /api/rooms/search
pub async fn search_rooms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let dates = stay_from(query.check_in, query.check_out)?;
    let filters = RoomSearch {
        city: query.city.filter(|c| !c.trim().is_empty()),
        guests: query.guests,
        max_price_cents: query.max_price.map(|p| (p * 100.0).round() as i64),
        room_type: query.room_type.filter(|t| !t.trim().is_empty()),
    };

    let db = state.db();
    let mut results = Vec::new();
    for listing in queries::search_rooms(&db, &filters)? {
        let total_price_cents = match &dates {
            Some(d) if !booking::is_room_free(&db, &listing.room.id, d)? => continue,
            Some(d) => Some(booking::quote_price(d, listing.room.price_per_night_cents)),
            None => None,
        };
        results.push(SearchResult {
            listing,
            total_price_cents,
        });
    }

    tracing::debug!(results = results.len(), "room search");
    Ok(Json(results))
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub room_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub available: bool,
    pub price_per_night_cents: i64,
    pub total_price_cents: i64,
}

// GET /api/rooms/:id/availability
pub async fn room_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let today = Utc::now().date_naive();
    let dates = booking::validate_stay(query.check_in, query.check_out, today)?;

    let availability = {
        let db = state.db();
        booking::check_availability(&db, &id, dates)?
    };

    Ok(Json(AvailabilityResponse {
        room_id: availability.room.room.id,
        check_in: dates.check_in,
        check_out: dates.check_out,
        nights: dates.nights(),
        available: availability.available,
        price_per_night_cents: availability.room.room.price_per_night_cents,
        total_price_cents: availability.total_price_cents,
    }))
}
