use serde::{ Serialize, Deserialize };
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// A citation pointing at a document that grounds part of an answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Source {
    pub fn named(source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            source: Some(source.into()),
            page,
            score: None,
        }
    }
}

/// One turn of the active conversation. Ids are local to this process;
/// the backend never sees them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub timestamp: i64,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ROLE_USER.to_string(),
            content: content.into(),
            sources: Vec::new(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Source>, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ROLE_ASSISTANT.to_string(),
            content: content.into(),
            sources,
            timestamp,
        }
    }
}
