use chrono::NaiveDate;

use crate::models::{AgentReply, ChatMessage};
use crate::services::ai::{chat_with_fallback, LlmError, LlmProvider, Message, RetryPolicy};

/// Older turns are dropped before the history is sent to the model.
pub const MAX_HISTORY: usize = 10;

const SYSTEM_PROMPT: &str = r#"You are the booking assistant of a hotel reservation website. Analyze the guest's latest message in context of the conversation history.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "intent": "search|check_availability|book|question|greeting",
  "city": "city name or null",
  "room_id": "room id taken from earlier search results, or null",
  "check_in": "YYYY-MM-DD or null",
  "check_out": "YYYY-MM-DD or null",
  "guests": 2,
  "max_price": 150,
  "room_type": "single|double|suite|... or null",
  "reply": "Your friendly reply to the guest"
}

Intent rules:
- "search": Guest wants to find rooms (by city, dates, budget, number of guests or room type)
- "check_availability": Guest asks whether a specific room is free for specific dates
- "book": Guest wants to reserve a specific room for specific dates
- "question": Guest asks about hotels, policies, payment or anything else
- "greeting": Guest says hello or makes small talk

Resolve relative dates ("next Friday", "for 3 nights") against today's date.
max_price is the nightly budget in whole currency units.
Only use room ids that appeared in earlier messages. Never invent one.

For the reply:
- Be friendly and concise
- For search/check_availability/book, briefly say what you are doing; the system appends the results
- If details are missing (room, dates), ask for them
"#;

pub async fn extract_agent_reply(
    llm: &dyn LlmProvider,
    models: &[String],
    policy: &RetryPolicy,
    history: &[ChatMessage],
    latest_message: &str,
    today: NaiveDate,
    context: &str,
) -> Result<AgentReply, LlmError> {
    let skip = history.len().saturating_sub(MAX_HISTORY);
    let mut messages: Vec<Message> = history
        .iter()
        .skip(skip)
        .filter(|m| m.role == "user" || m.role == "assistant")
        .map(|m| Message {
            role: m.role.clone(),
            content: m.content.clone(),
        })
        .collect();

    messages.push(Message {
        role: "user".to_string(),
        content: latest_message.to_string(),
    });

    let system = format!(
        "{SYSTEM_PROMPT}\nToday's date: {}\n\nSite context:\n{context}",
        today.format("%Y-%m-%d (%A)")
    );

    let response = chat_with_fallback(llm, models, policy, &system, &messages).await?;

    Ok(parse_agent_reply(&response))
}

pub fn parse_agent_reply(response: &str) -> AgentReply {
    // Try direct parse first
    if let Ok(reply) = serde_json::from_str::<AgentReply>(response) {
        return reply;
    }

    // Strip markdown code fences
    let trimmed = response.trim();
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(reply) = serde_json::from_str::<AgentReply>(cleaned) {
        return reply;
    }

    // Try to find a JSON object in the response
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(reply) = serde_json::from_str::<AgentReply>(&cleaned[start..=end]) {
                return reply;
            }
        }
    }

    tracing::warn!("failed to parse LLM response as agent JSON, using fallback");
    AgentReply::question(trimmed)
}
