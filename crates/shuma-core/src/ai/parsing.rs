//! JSON parsing helpers for provider responses
//!
//! Models often wrap the payload in a fenced block or surround it with prose.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

fn fenced_json() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex")
    })
}

fn truncated(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Pull the JSON object out of a model response
///
/// Tries a fenced ```json block first, then the outermost `{ ... }` span.
pub fn extract_json(response: &str) -> Result<Value> {
    let response = response.trim();

    if let Some(captures) = fenced_json().captures(response) {
        if let Some(body) = captures.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(body.as_str()) {
                return Ok(value);
            }
        }
    }

    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::UnexpectedResponseFormat(format!(
                    "Invalid JSON from model: {} | Raw: {}",
                    e,
                    truncated(json_str)
                ))
            })
        }
        _ => Err(Error::UnexpectedResponseFormat(format!(
            "No JSON found in model response | Raw: {}",
            truncated(response)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let value = extract_json(r#"{"gush": 6158}"#).unwrap();
        assert_eq!(value, json!({"gush": 6158}));
    }

    #[test]
    fn test_fenced_block_with_prose() {
        let response = "Here is the extraction:\n```json\n{\"gush\": {\"value\": 6158}}\n```\nLet me know {if} needed.";
        let value = extract_json(response).unwrap();
        assert_eq!(value, json!({"gush": {"value": 6158}}));
    }

    #[test]
    fn test_surrounding_prose() {
        let value = extract_json("Result: {\"rooms\": 4} done").unwrap();
        assert_eq!(value["rooms"], 4);
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(
            extract_json("I could not read the document"),
            Err(Error::UnexpectedResponseFormat(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            extract_json("{gush: }"),
            Err(Error::UnexpectedResponseFormat(_))
        ));
    }
}
