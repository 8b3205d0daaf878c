// src/normalize.rs
//
// Boundary shaping for the AI service's /api/query payload. The upstream
// response is heterogeneous: related queries arrive as bare strings or
// `{query, context}` objects, and list-valued fields can be an array, a
// single object, or null. Everything is modeled explicitly here so the
// orchestrator only ever sees one shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::related_queries::{self, RelatedQuery, GENERATED_CONTEXT};

/// Answers always carry exactly this many related-query suggestions, padded
/// with generated ones when the upstream returns fewer.
pub const RELATED_QUERY_TARGET: usize = 5;

/// The normalized answer payload: what gets persisted as a history entry's
/// side channels and returned to the client (with the resolved chat id).
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub query: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_name: Option<String>,
    pub pdf_references: Vec<Value>,
    pub online_images: Vec<Value>,
    pub online_videos: Vec<Value>,
    pub online_links: Vec<Value>,
    pub related_queries: Vec<RelatedQuery>,
    pub products: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawQueryResponse {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    chat_name: Option<String>,
    #[serde(default)]
    pdf_references: Option<LooseList>,
    #[serde(default)]
    online_images: Option<LooseList>,
    #[serde(default)]
    online_videos: Option<LooseList>,
    #[serde(default)]
    online_links: Option<LooseList>,
    #[serde(default)]
    products: Option<LooseList>,
    #[serde(default)]
    related_queries: Option<RawSuggestions>,
}

/// A list-valued upstream field: array, single object, or anything else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseList {
    Many(Vec<Value>),
    One(serde_json::Map<String, Value>),
    Other(Value),
}

impl LooseList {
    fn into_vec(self) -> Vec<Value> {
        match self {
            LooseList::Many(items) => items,
            LooseList::One(object) => vec![Value::Object(object)],
            LooseList::Other(_) => Vec::new(),
        }
    }
}

fn list(field: Option<LooseList>) -> Vec<Value> {
    field.map(LooseList::into_vec).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSuggestions {
    List(Vec<RawSuggestion>),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSuggestion {
    Shaped {
        query: String,
        #[serde(default)]
        context: Option<String>,
    },
    Text(String),
    Other(Value),
}

/// Normalizes the raw upstream payload for `original_query`. Related queries
/// are coerced to `{query, context}` objects (order preserved) and padded to
/// [`RELATED_QUERY_TARGET`] with generated suggestions; all other side
/// channels default to empty lists.
pub fn normalize_query_response(raw: Value, original_query: &str) -> QueryAnswer {
    let raw: RawQueryResponse = serde_json::from_value(raw).unwrap_or_default();

    let mut related: Vec<RelatedQuery> = match raw.related_queries {
        Some(RawSuggestions::List(items)) => items
            .into_iter()
            .filter_map(|suggestion| match suggestion {
                RawSuggestion::Shaped { query, context } => Some(RelatedQuery {
                    query,
                    context: context.unwrap_or_else(|| GENERATED_CONTEXT.to_string()),
                }),
                RawSuggestion::Text(text) => Some(RelatedQuery {
                    query: text,
                    context: GENERATED_CONTEXT.to_string(),
                }),
                RawSuggestion::Other(_) => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if related.len() < RELATED_QUERY_TARGET {
        let missing = RELATED_QUERY_TARGET - related.len();
        related.extend(related_queries::generate(original_query, missing));
    }

    QueryAnswer {
        query: raw.query.unwrap_or_else(|| original_query.to_string()),
        answer: raw.answer,
        chat_id: None,
        chat_name: raw.chat_name,
        pdf_references: list(raw.pdf_references),
        online_images: list(raw.online_images),
        online_videos: list(raw.online_videos),
        online_links: list(raw.online_links),
        related_queries: related,
        products: list(raw.products),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pads_short_related_queries_preserving_originals_in_order() {
        let raw = json!({
            "answer": "An answer.",
            "related_queries": ["first follow-up", {"query": "second follow-up", "context": "Page 3"}]
        });

        let normalized = normalize_query_response(raw, "chemical storage");

        assert_eq!(normalized.related_queries.len(), RELATED_QUERY_TARGET);
        assert_eq!(normalized.related_queries[0].query, "first follow-up");
        assert_eq!(normalized.related_queries[0].context, GENERATED_CONTEXT);
        assert_eq!(normalized.related_queries[1].query, "second follow-up");
        assert_eq!(normalized.related_queries[1].context, "Page 3");
        for padded in &normalized.related_queries[2..] {
            assert_eq!(padded.context, GENERATED_CONTEXT);
            assert!(padded.query.contains("chemical storage"));
        }
    }

    #[test]
    fn absent_related_queries_yield_all_generated() {
        let normalized = normalize_query_response(json!({"answer": "ok"}), "GDPR");
        assert_eq!(normalized.related_queries.len(), RELATED_QUERY_TARGET);
        assert!(normalized
            .related_queries
            .iter()
            .all(|s| s.context == GENERATED_CONTEXT));
    }

    #[test]
    fn malformed_related_queries_field_is_treated_as_empty() {
        let raw = json!({"answer": "ok", "related_queries": {"oops": true}});
        let normalized = normalize_query_response(raw, "audit trails");
        assert_eq!(normalized.related_queries.len(), RELATED_QUERY_TARGET);
    }

    #[test]
    fn more_than_target_suggestions_are_kept_as_is() {
        let raw = json!({
            "answer": "ok",
            "related_queries": ["a", "b", "c", "d", "e", "f"]
        });
        let normalized = normalize_query_response(raw, "q");
        assert_eq!(normalized.related_queries.len(), 6);
        assert_eq!(normalized.related_queries[5].query, "f");
    }

    #[test]
    fn missing_side_channels_default_to_empty_lists() {
        let normalized = normalize_query_response(json!({"answer": "ok"}), "q");
        assert!(normalized.pdf_references.is_empty());
        assert!(normalized.online_images.is_empty());
        assert!(normalized.online_videos.is_empty());
        assert!(normalized.online_links.is_empty());
        assert!(normalized.products.is_empty());
    }

    #[test]
    fn single_object_side_channel_is_wrapped_in_a_list() {
        let raw = json!({
            "answer": "ok",
            "pdf_references": {"name": "iso-9001", "page_number": [2]}
        });
        let normalized = normalize_query_response(raw, "q");
        assert_eq!(normalized.pdf_references.len(), 1);
        assert_eq!(normalized.pdf_references[0]["name"], "iso-9001");
    }

    #[test]
    fn null_side_channel_is_treated_as_empty() {
        let raw = json!({"answer": "ok", "online_images": null, "online_links": 7});
        let normalized = normalize_query_response(raw, "q");
        assert!(normalized.online_images.is_empty());
        assert!(normalized.online_links.is_empty());
    }

    #[test]
    fn answer_and_chat_name_pass_through() {
        let raw = json!({"answer": "The answer.", "chat_name": "OSHA Storage Rules", "query": "original text"});
        let normalized = normalize_query_response(raw, "fallback");
        assert_eq!(normalized.answer, "The answer.");
        assert_eq!(normalized.chat_name.as_deref(), Some("OSHA Storage Rules"));
        assert_eq!(normalized.query, "original text");
    }
}
