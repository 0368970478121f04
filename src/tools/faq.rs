// src/tools/faq.rs — search_faq tool over the knowledge base

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, Tool, ToolFailure};
use crate::knowledge::KnowledgeBase;

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

impl SearchArgs {
    fn check(args: &Value) -> Result<String, String> {
        let raw: Self = parse_args(args)?;
        let query = raw.query.trim();
        if query.is_empty() {
            return Err("query must not be empty".into());
        }
        Ok(query.to_string())
    }
}

pub struct SearchFaq {
    kb: Arc<KnowledgeBase>,
}

impl SearchFaq {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }
}

#[async_trait]
impl Tool for SearchFaq {
    fn name(&self) -> &str {
        "search_faq"
    }

    fn description(&self) -> &str {
        "Search the clinic FAQ (prices, opening hours, location, policies). Returns the best matching entries."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The patient's question or keywords" }
            },
            "required": ["query"]
        })
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        SearchArgs::check(args).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        let query = SearchArgs::check(&args).map_err(ToolFailure::validation)?;
        let results = self.kb.search(&query);
        if results.is_empty() {
            return Ok(json!({
                "results": [],
                "note": "No matching FAQ entry. Offer to help with booking or suggest calling the clinic.",
            }));
        }
        Ok(json!({ "results": results }))
    }
}
