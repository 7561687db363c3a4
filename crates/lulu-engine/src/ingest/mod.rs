//! Normalizes suggestion payloads from the AI edits, grammar and writer's
//! note collaborators into [`Suggestion`]s.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::editing::{EditType, Suggestion, SuggestionId, SuggestionSource};
use crate::error::Result;

/// One suggestion as the services return it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionPayload {
    #[serde(default)]
    pub id: Option<SuggestionId>,
    pub original: String,
    pub suggestion: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub edit_type: Option<String>,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

impl SuggestionPayload {
    fn explicit_range(&self) -> Option<Range<usize>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start < end => Some(start..end),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Batch {
    Wrapped { edits: Vec<SuggestionPayload> },
    Bare(Vec<SuggestionPayload>),
}

/// Parse a batch, either a bare array or `{"edits": [...]}`
pub fn parse_batch(json: &str) -> Result<Vec<SuggestionPayload>> {
    let batch: Batch = serde_json::from_str(json)?;
    Ok(match batch {
        Batch::Wrapped { edits } => edits,
        Batch::Bare(edits) => edits,
    })
}

/// Turn payloads into suggestions anchored in `text`.
///
/// Payloads without a usable `start`/`end` are located by searching for
/// `original`, continuing after the previous located suggestion so repeated
/// phrases map to successive occurrences. A phrase that cannot be found gets
/// an empty anchor and will show up as orphaned.
pub fn normalize(
    text: &str,
    payloads: Vec<SuggestionPayload>,
    source: SuggestionSource,
) -> Vec<Suggestion> {
    let mut cursor = 0;

    payloads
        .into_iter()
        .map(|payload| {
            let anchor = payload
                .explicit_range()
                .or_else(|| locate(text, &payload.original, cursor))
                .unwrap_or(0..0);
            if anchor.end > cursor {
                cursor = anchor.end;
            }

            let edit_type = payload
                .edit_type
                .as_deref()
                .map_or(EditType::Other, EditType::from_label);

            Suggestion::new(anchor, payload.original, payload.suggestion)
                .with_id(payload.id.unwrap_or_default())
                .with_edit_type(edit_type)
                .with_source(source)
                .with_rationale(payload.why)
                .with_principles(payload.principles)
        })
        .collect()
}

fn locate(text: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }

    let after = text
        .get(from..)
        .and_then(|rest| rest.find(needle))
        .map(|offset| from + offset);
    after
        .or_else(|| text.find(needle))
        .map(|start| start..start + needle.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "the cat saw the dog and the bird";

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[
            {"original": "cat", "suggestion": "kitten", "why": "cuter", "editType": "Line Editing"}
        ]"#;

        let payloads = parse_batch(json).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].original, "cat");
        assert_eq!(payloads[0].edit_type.as_deref(), Some("Line Editing"));
        assert_eq!(payloads[0].start, None);
    }

    #[test]
    fn test_parse_wrapped_batch() {
        let json = r#"{"edits": [
            {"original": "dog", "suggestion": "hound", "start": 16, "end": 19}
        ]}"#;

        let payloads = parse_batch(json).unwrap();

        assert_eq!(payloads[0].start, Some(16));
        assert_eq!(payloads[0].end, Some(19));
        assert_eq!(payloads[0].why, "");
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let result = parse_batch(r#"{"edits": [{"suggestion": "x"}]}"#);
        assert!(matches!(result, Err(crate::SuggestionError::Payload(_))));
    }

    #[test]
    fn test_normalize_uses_explicit_positions() {
        let payloads = parse_batch(
            r#"[{"original": "dog", "suggestion": "hound", "start": 16, "end": 19, "editType": "Copy"}]"#,
        )
        .unwrap();

        let suggestions = normalize(TEXT, payloads, SuggestionSource::Grammar);

        assert_eq!(suggestions[0].anchor, 16..19);
        assert_eq!(suggestions[0].edit_type, EditType::Copy);
        assert_eq!(suggestions[0].source, SuggestionSource::Grammar);
        assert!(suggestions[0].id.is_nil());
    }

    #[test]
    fn test_normalize_locates_repeated_phrases_in_order() {
        let payloads = parse_batch(
            r#"[
                {"original": "the", "suggestion": "a"},
                {"original": "the", "suggestion": "a"},
                {"original": "the", "suggestion": "a"}
            ]"#,
        )
        .unwrap();

        let suggestions = normalize(TEXT, payloads, SuggestionSource::Edits);

        let anchors: Vec<_> = suggestions.iter().map(|s| s.anchor.clone()).collect();
        assert_eq!(anchors, vec![0..3, 12..15, 24..27]);
    }

    #[test]
    fn test_normalize_missing_phrase_gets_empty_anchor() {
        let payloads = parse_batch(r#"[{"original": "zebra", "suggestion": "horse"}]"#).unwrap();

        let suggestions = normalize(TEXT, payloads, SuggestionSource::WriterNote);

        assert_eq!(suggestions[0].anchor, 0..0);
    }

    #[test]
    fn test_normalize_keeps_payload_ids() {
        let id = SuggestionId::new();
        let payloads = vec![SuggestionPayload {
            id: Some(id),
            original: "bird".to_string(),
            suggestion: "crow".to_string(),
            why: String::new(),
            edit_type: None,
            principles: vec!["specificity".to_string()],
            start: None,
            end: None,
        }];

        let suggestions = normalize(TEXT, payloads, SuggestionSource::Edits);

        assert_eq!(suggestions[0].id, id);
        assert_eq!(suggestions[0].anchor, 28..32);
        assert_eq!(suggestions[0].principles, vec!["specificity".to_string()]);
    }
}
