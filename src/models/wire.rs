use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use serde_json::Value;

use crate::models::chat::Source;

/// Body of `POST /api/ask/query`.
#[derive(Serialize, Deserialize, Debug)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Response of `POST /api/ask/query`. `sources` is absent on answers the
/// backend could not ground in any document.
#[derive(Serialize, Deserialize, Debug)]
pub struct QueryResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    pub conversation_id: String,
}

/// One stored turn from `GET /api/ask/sessions/{id}`. Older deployments wrote
/// `createdAt` as epoch millis, newer ones as RFC 3339, so it is kept loose
/// here and coerced on load.
#[derive(Serialize, Deserialize, Debug)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<Value>,
}

impl HistoryEntry {
    /// Coerces `createdAt` to epoch seconds. Unparseable or missing values
    /// fall back to the current time rather than failing the whole load.
    pub fn timestamp(&self) -> i64 {
        match &self.created_at {
            Some(Value::String(s)) => {
                match DateTime::parse_from_rfc3339(s) {
                    Ok(dt) => dt.timestamp(),
                    Err(_) => Utc::now().timestamp(),
                }
            }
            Some(Value::Number(n)) => {
                match n.as_i64() {
                    // Heuristic cutover between epoch seconds and millis:
                    // anything past the year 33658 in seconds is millis.
                    Some(raw) if raw > 1_000_000_000_000 => raw / 1000,
                    Some(raw) => raw,
                    None => Utc::now().timestamp(),
                }
            }
            _ => Utc::now().timestamp(),
        }
    }
}
