//! Extracting JSON from model output.
//!
//! Models wrap JSON in markdown fences or add a sentence around it even in
//! JSON mode. Parsing strips fences, then falls back to the outermost `{...}`
//! span before giving up.

use serde::de::DeserializeOwned;

use crate::error::AgentError;

/// Strips a surrounding markdown code fence, if present.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = trimmed.trim_start_matches('`');
    // Drop the info string ("json", "JSON", ...) on the opening line.
    let body = body.split_once('\n').map_or(body, |(_, rest)| rest);
    body.trim_end().trim_end_matches('`').trim()
}

/// Parses model output as `T`.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] carrying the raw content when
/// neither the fenced body nor the outermost object span parses.
pub fn parse_json<T: DeserializeOwned>(content: &str, what: &str) -> Result<T, AgentError> {
    let body = strip_code_fence(content);
    match serde_json::from_str::<T>(body) {
        Ok(value) => Ok(value),
        Err(first) => object_span(body)
            .and_then(|span| serde_json::from_str::<T>(span).ok())
            .ok_or_else(|| AgentError::ResponseParse {
                message: format!("failed to parse {what}: {first}"),
                content: content.to_string(),
            }),
    }
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use test_case::test_case;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        intent: String,
    }

    #[test_case(r#"{"intent":"seo"}"# ; "bare")]
    #[test_case("```json\n{\"intent\":\"seo\"}\n```" ; "fenced json")]
    #[test_case("```\n{\"intent\":\"seo\"}\n```" ; "fenced plain")]
    #[test_case("Here you go: {\"intent\":\"seo\"} hope it helps" ; "surrounding prose")]
    fn test_parse_json_forms(content: &str) {
        let probe: Probe = parse_json(content, "probe").unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(probe.intent, "seo");
    }

    #[test]
    fn test_parse_json_failure_keeps_content() {
        let err = parse_json::<Probe>("not json at all", "intent").unwrap_err();
        match err {
            AgentError::ResponseParse { message, content } => {
                assert!(message.contains("intent"));
                assert_eq!(content, "not json at all");
            }
            other => unreachable!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strip_code_fence_passthrough() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }
}
