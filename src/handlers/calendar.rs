use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

use super::require_user;

// GET /calendar/:booking_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let user_id = require_user(&headers)?;
    // Strip .ics suffix if present
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let (booking, room) = {
        let db = state.db();
        let booking = queries::get_booking_by_id(&db, booking_id)?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        let room = queries::get_room(&db, &booking.room_id)?
            .ok_or_else(|| AppError::NotFound(format!("room {}", booking.room_id)))?;
        (booking, room)
    };

    let ics = generate_ics(&booking, &room);
    let filename = format!("booking-{booking_id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
