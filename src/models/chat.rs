// src/models/chat.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A session row paired with its first exchange for list previews.
#[derive(Debug, Serialize, FromRow)]
pub struct SessionPreview {
    pub chat_id: String,
    pub chat_name: String,
    pub favorite: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub query: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ChatHistoryEntry {
    pub id: i32,
    pub chat_id: String,
    pub query: String,
    pub answer: String,
    pub pdf_references: Value,
    pub online_images: Value,
    pub online_videos: Value,
    pub online_links: Value,
    pub related_queries: Value,
    pub products: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One role-tagged message inside a session's memory window. Sent verbatim
/// to the AI service as conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: String,
    pub content: String,
}

impl MemoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Memory never grows past the most recent 10 exchanges.
pub const MEMORY_LIMIT: usize = 20;

/// Appends a query/answer exchange and drops the oldest messages beyond
/// [`MEMORY_LIMIT`].
pub fn append_exchange(memory: &mut Vec<MemoryMessage>, query: &str, answer: &str) {
    memory.push(MemoryMessage::user(query));
    memory.push(MemoryMessage::assistant(answer));
    if memory.len() > MEMORY_LIMIT {
        let excess = memory.len() - MEMORY_LIMIT;
        memory.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_appends_user_then_assistant() {
        let mut memory = Vec::new();
        append_exchange(&mut memory, "What is GDPR?", "A regulation.");
        assert_eq!(memory.len(), 2);
        assert_eq!(memory[0], MemoryMessage::user("What is GDPR?"));
        assert_eq!(memory[1], MemoryMessage::assistant("A regulation."));
    }

    #[test]
    fn memory_is_bounded_to_most_recent_exchanges() {
        let mut memory = Vec::new();
        for i in 0..15 {
            append_exchange(&mut memory, &format!("q{}", i), &format!("a{}", i));
        }

        assert_eq!(memory.len(), MEMORY_LIMIT);
        // The first five exchanges fell off; the window starts at q5.
        assert_eq!(memory[0].content, "q5");
        assert_eq!(memory.last().unwrap().content, "a14");
    }
}
