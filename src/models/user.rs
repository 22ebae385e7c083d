use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A guest account. `id` is the identity provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: NaiveDateTime,
}
