use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub hotel_id: String,
    pub name: String,
    pub room_type: String,
    pub capacity: i32,
    pub price_per_night_cents: i64,
    pub description: Option<String>,
}

/// A room joined with the hotel it belongs to, as returned by searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListing {
    #[serde(flatten)]
    pub room: Room,
    pub hotel_name: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomSearch {
    pub city: Option<String>,
    pub guests: Option<i32>,
    pub max_price_cents: Option<i64>,
    pub room_type: Option<String>,
}
