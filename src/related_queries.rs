// src/related_queries.rs
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A follow-up suggestion as returned to the client and stored alongside an
/// answer. Bare strings from the upstream service get the generated context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedQuery {
    pub query: String,
    pub context: String,
}

pub const GENERATED_CONTEXT: &str = "Generated suggestion";

const SUGGESTION_TEMPLATES: [&str; 8] = [
    "What are the best practices for implementing {query}?",
    "How do regulatory requirements affect {query}?",
    "What documentation is required for {query} compliance?",
    "How do different industries approach {query}?",
    "What are the latest updates regarding {query}?",
    "How can organizations measure success in {query}?",
    "What are common challenges when implementing {query}?",
    "How does {query} impact risk management?",
];

/// Produces `count` template-filled suggestions for `query`, shuffled so the
/// same padding does not repeat across answers. Templates cycle when `count`
/// exceeds the template set.
pub fn generate(query: &str, count: usize) -> Vec<RelatedQuery> {
    let mut templates: Vec<&str> = SUGGESTION_TEMPLATES.to_vec();
    templates.shuffle(&mut rand::thread_rng());

    templates
        .into_iter()
        .cycle()
        .take(count)
        .map(|template| RelatedQuery {
            query: template.replace("{query}", query),
            context: GENERATED_CONTEXT.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_count() {
        assert_eq!(generate("GDPR", 3).len(), 3);
        assert_eq!(generate("GDPR", 5).len(), 5);
        assert!(generate("GDPR", 0).is_empty());
    }

    #[test]
    fn fills_template_with_query_text() {
        for suggestion in generate("ISO 27001 audits", 5) {
            assert!(suggestion.query.contains("ISO 27001 audits"));
            assert_eq!(suggestion.context, GENERATED_CONTEXT);
        }
    }

    #[test]
    fn suggestions_are_distinct_within_template_set() {
        let suggestions = generate("chemical storage", 8);
        let mut queries: Vec<&str> = suggestions.iter().map(|s| s.query.as_str()).collect();
        queries.sort();
        queries.dedup();
        assert_eq!(queries.len(), 8);
    }

    #[test]
    fn cycles_when_count_exceeds_templates() {
        assert_eq!(generate("SOC 2", 12).len(), 12);
    }
}
