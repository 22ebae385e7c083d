use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Search,
    CheckAvailability,
    Book,
    Question,
    Greeting,
    #[default]
    #[serde(other)]
    Unknown,
}

/// The structured reply the language model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub check_in: Option<String>,
    #[serde(default)]
    pub check_out: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub guests: Option<i32>,
    /// Nightly budget in whole currency units.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub reply: String,
}

impl AgentReply {
    pub fn question(reply: impl Into<String>) -> Self {
        Self {
            intent: Intent::Question,
            city: None,
            room_id: None,
            check_in: None,
            check_out: None,
            guests: None,
            max_price: None,
            room_type: None,
            reply: reply.into(),
        }
    }
}

// Models often quote numbers ("2", "$150") or send ids as numbers. A value of
// the wrong shape becomes `None` instead of failing the whole reply.

fn number_from(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches(['$', '€', '£'])
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from)
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(i32::MAX))
        .map(|n| n as i32))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
