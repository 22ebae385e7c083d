use chrono::{NaiveDate, Utc};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    format_price, ActionData, AgentReply, ChatMessage, ChatReply, Intent, NewBooking, RoomListing,
    RoomSearch, StayDates,
};
use crate::services::ai::intent::extract_agent_reply;
use crate::services::ai::RetryPolicy;
use crate::services::booking::{self, BookingError};
use crate::state::AppState;

pub const MAX_SEARCH_RESULTS: usize = 5;

const DEFAULT_GREETING: &str =
    "Hello! I can help you find and book a hotel room. Where would you like to stay?";
const ASK_FOR_ROOM: &str =
    "Which room would you like? You can pick one from the search results, or tell me where you're headed.";
const ASK_FOR_DATES: &str =
    "What dates would you like? Please give me a check-in and a check-out date.";

/// Handles one chat turn: asks the model what the guest wants, then runs the
/// matching search, availability check or booking.
pub async fn process_message(
    state: &AppState,
    user_id: Option<&str>,
    message: &str,
    history: &[ChatMessage],
) -> Result<ChatReply, AppError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let today = Utc::now().date_naive();
    let context = site_context(state)?;

    let agent = extract_agent_reply(
        state.llm.as_ref(),
        &state.config.llm_models,
        &RetryPolicy::from_config(&state.config),
        history,
        message,
        today,
        &context,
    )
    .await?;

    tracing::info!(
        intent = ?agent.intent,
        signed_in = user_id.is_some(),
        "processing chat message"
    );

    dispatch(state, user_id, agent, today).await
}

fn site_context(state: &AppState) -> Result<String, AppError> {
    let hotels = {
        let db = state.db();
        queries::list_hotels(&db, None)?
    };
    let mut cities: Vec<String> = hotels.into_iter().map(|h| h.city).collect();
    cities.sort();
    cities.dedup();

    if cities.is_empty() {
        Ok("No hotels are listed yet.".to_string())
    } else {
        Ok(format!("Cities with hotels: {}.", cities.join(", ")))
    }
}

pub async fn dispatch(
    state: &AppState,
    user_id: Option<&str>,
    agent: AgentReply,
    today: NaiveDate,
) -> Result<ChatReply, AppError> {
    match agent.intent {
        Intent::Search => search(state, &agent, today),
        Intent::CheckAvailability => check_availability(state, &agent, today),
        Intent::Book => book(state, user_id, &agent, today).await,
        Intent::Greeting => Ok(text_reply(&agent, DEFAULT_GREETING)),
        Intent::Question | Intent::Unknown => Ok(text_reply(
            &agent,
            "I'm not sure I understood. Could you rephrase that?",
        )),
    }
}

fn text_reply(agent: &AgentReply, fallback: &str) -> ChatReply {
    ChatReply {
        reply: non_empty_or(&agent.reply, fallback),
        intent: agent.intent,
        action: None,
    }
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

/// Both dates from the model's reply. `None` when either is missing.
fn requested_dates(
    agent: &AgentReply,
    today: NaiveDate,
) -> Option<Result<StayDates, BookingError>> {
    let check_in = parse_date(agent.check_in.as_deref())?;
    let check_out = parse_date(agent.check_out.as_deref())?;
    Some(booking::validate_stay(check_in, check_out, today))
}

fn requested_room(agent: &AgentReply) -> Option<&str> {
    agent
        .room_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn search(state: &AppState, agent: &AgentReply, today: NaiveDate) -> Result<ChatReply, AppError> {
    let dates = match requested_dates(agent, today) {
        Some(Ok(dates)) => Some(dates),
        Some(Err(e)) => return booking_error_reply(agent.intent, e),
        None => None,
    };

    let filters = RoomSearch {
        city: agent.city.clone(),
        guests: agent.guests.filter(|g| *g > 0),
        max_price_cents: agent
            .max_price
            .filter(|p| *p > 0.0)
            .map(|p| (p * 100.0).round() as i64),
        room_type: agent.room_type.clone(),
    };

    let rooms: Vec<RoomListing> = {
        let db = state.db();
        let mut rooms = Vec::new();
        for listing in queries::search_rooms(&db, &filters)? {
            if rooms.len() == MAX_SEARCH_RESULTS {
                break;
            }
            let free = match &dates {
                Some(d) => booking::is_room_free(&db, &listing.room.id, d)?,
                None => true,
            };
            if free {
                rooms.push(listing);
            }
        }
        rooms
    };

    tracing::info!(
        city = ?filters.city,
        guests = ?filters.guests,
        results = rooms.len(),
        "chat room search"
    );

    if rooms.is_empty() {
        let place = filters
            .city
            .as_deref()
            .map(|c| format!(" in {c}"))
            .unwrap_or_default();
        return Ok(ChatReply {
            reply: format!(
                "I couldn't find any rooms{place} matching that. Try different dates, fewer filters or a higher budget."
            ),
            intent: Intent::Search,
            action: None,
        });
    }

    let mut lines = vec![non_empty_or(&agent.reply, "Here are some rooms that match:")];
    lines.extend(rooms.iter().map(|r| room_line(r, dates.as_ref())));

    Ok(ChatReply {
        reply: lines.join("\n"),
        intent: Intent::Search,
        action: Some(ActionData::ShowRooms {
            room_ids: rooms.into_iter().map(|r| r.room.id).collect(),
        }),
    })
}

fn room_line(listing: &RoomListing, dates: Option<&StayDates>) -> String {
    let mut line = format!(
        "- {} at {}, {} ({}, sleeps {}): {}/night",
        listing.room.name,
        listing.hotel_name,
        listing.city,
        listing.room.room_type,
        listing.room.capacity,
        format_price(listing.room.price_per_night_cents),
    );
    if let Some(d) = dates {
        line.push_str(&format!(
            ", {} for {} night{}",
            format_price(booking::quote_price(d, listing.room.price_per_night_cents)),
            d.nights(),
            if d.nights() == 1 { "" } else { "s" },
        ));
    }
    line.push_str(&format!(" [room {}]", listing.room.id));
    line
}

fn check_availability(
    state: &AppState,
    agent: &AgentReply,
    today: NaiveDate,
) -> Result<ChatReply, AppError> {
    let Some(room_id) = requested_room(agent) else {
        return Ok(plain(Intent::CheckAvailability, ASK_FOR_ROOM));
    };
    let dates = match requested_dates(agent, today) {
        Some(Ok(dates)) => dates,
        Some(Err(e)) => return booking_error_reply(agent.intent, e),
        None => return Ok(plain(Intent::CheckAvailability, ASK_FOR_DATES)),
    };

    let availability = {
        let db = state.db();
        booking::check_availability(&db, room_id, dates)
    };
    let availability = match availability {
        Ok(a) => a,
        Err(e) => return booking_error_reply(agent.intent, e),
    };

    let room = &availability.room;
    let guests = agent.guests.filter(|g| *g > 0).unwrap_or(1);
    if guests > room.room.capacity {
        return booking_error_reply(
            agent.intent,
            BookingError::OverCapacity {
                capacity: room.room.capacity,
            },
        );
    }
    if !availability.available {
        return Ok(plain(
            Intent::CheckAvailability,
            &format!(
                "Sorry, {} at {} is already booked between {} and {}. Want me to look for other rooms?",
                room.room.name, room.hotel_name, dates.check_in, dates.check_out
            ),
        ));
    }

    let nights = dates.nights();
    Ok(ChatReply {
        reply: format!(
            "Good news! {} at {} is available from {} to {}: {} night{}, {} in total. Shall I book it?",
            room.room.name,
            room.hotel_name,
            dates.check_in,
            dates.check_out,
            nights,
            if nights == 1 { "" } else { "s" },
            format_price(availability.total_price_cents),
        ),
        intent: Intent::CheckAvailability,
        action: Some(ActionData::ConfirmBooking {
            room_id: room.room.id.clone(),
            check_in: dates.check_in,
            check_out: dates.check_out,
            guests,
            total_price_cents: availability.total_price_cents,
        }),
    })
}

async fn book(
    state: &AppState,
    user_id: Option<&str>,
    agent: &AgentReply,
    today: NaiveDate,
) -> Result<ChatReply, AppError> {
    let Some(user_id) = user_id else {
        return Ok(plain(
            Intent::Book,
            "Please sign in to make a booking. I'll keep your search right here.",
        ));
    };
    let Some(room_id) = requested_room(agent) else {
        return Ok(plain(Intent::Book, ASK_FOR_ROOM));
    };
    let (Some(check_in), Some(check_out)) = (
        parse_date(agent.check_in.as_deref()),
        parse_date(agent.check_out.as_deref()),
    ) else {
        return Ok(plain(Intent::Book, ASK_FOR_DATES));
    };

    let request = NewBooking {
        room_id: room_id.to_string(),
        check_in,
        check_out,
        guests: agent.guests.filter(|g| *g > 0).unwrap_or(1),
    };

    let (booking, room) = match booking::create_booking(state, user_id, &request, today).await {
        Ok(created) => created,
        Err(e) => return booking_error_reply(Intent::Book, e),
    };

    let nights = booking.dates().nights();
    Ok(ChatReply {
        reply: format!(
            "Your booking is reserved: {} at {}, {} to {} ({} night{}), {} in total. Complete the payment to confirm it.",
            room.room.name,
            room.hotel_name,
            booking.check_in,
            booking.check_out,
            nights,
            if nights == 1 { "" } else { "s" },
            format_price(booking.total_price_cents),
        ),
        intent: Intent::Book,
        action: Some(ActionData::Payment {
            booking_id: booking.id,
            total_price_cents: booking.total_price_cents,
        }),
    })
}

fn plain(intent: Intent, reply: &str) -> ChatReply {
    ChatReply {
        reply: reply.to_string(),
        intent,
        action: None,
    }
}

/// Turns a booking rule violation into something the guest can act on.
/// Storage failures are not the guest's problem and propagate.
fn booking_error_reply(intent: Intent, err: BookingError) -> Result<ChatReply, AppError> {
    let reply = match err {
        BookingError::Storage(e) => return Err(AppError::Internal(e)),
        BookingError::RoomNotFound(_) => {
            "I couldn't find that room. Could you search again and pick one from the results?"
                .to_string()
        }
        BookingError::Unavailable => {
            "Sorry, that room was just booked for those dates. Want me to look for other rooms?"
                .to_string()
        }
        other => other.to_string(),
    };
    Ok(plain(intent, &reply))
}
