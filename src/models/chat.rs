use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Intent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Follow-up payload the client renders as a button next to the reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionData {
    ShowRooms {
        room_ids: Vec<String>,
    },
    ConfirmBooking {
        room_id: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
        total_price_cents: i64,
    },
    Payment {
        booking_id: String,
        total_price_cents: i64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionData>,
}
