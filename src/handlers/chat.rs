use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ActionData, ChatMessage, Intent};
use crate::services::chat;
use crate::state::AppState;

use super::current_user_id;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionData>,
}

impl ChatResponse {
    fn failed(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            success: false,
            intent: None,
            action: None,
        }
    }
}

// POST /api/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let user_id = current_user_id(&headers);

    match chat::process_message(&state, user_id.as_deref(), &payload.message, &payload.history).await
    {
        Ok(reply) => Json(ChatResponse {
            reply: reply.reply,
            success: true,
            intent: Some(reply.intent),
            action: reply.action,
        })
        .into_response(),
        Err(AppError::BadRequest(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::failed("Please type a message first.")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, user_id = ?user_id, "chat processing failed");
            let reply = match e {
                AppError::Ai(_) => {
                    "Our assistant is temporarily unavailable. Please try again in a moment."
                }
                _ => "Sorry, something went wrong on our side. Please try again.",
            };
            Json(ChatResponse::failed(reply)).into_response()
        }
    }
}
