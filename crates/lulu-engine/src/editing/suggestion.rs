use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a suggestion, generated once at creation
///
/// The nil UUID means "not assigned yet"; the store replaces it with a fresh
/// id when the suggestion is added.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub Uuid);

impl SuggestionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Parse the value of a rendered span's `data-suggestion-id` attribute
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value).map(Self)
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editorial category of a suggestion. Only affects presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EditType {
    Developmental,
    Structural,
    Line,
    Copy,
    Proofreading,
    #[default]
    Other,
}

impl EditType {
    /// Interpret a free-form label such as "Line Editing" or "proofread"
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("developmental") {
            EditType::Developmental
        } else if label.starts_with("structural") {
            EditType::Structural
        } else if label.starts_with("line") {
            EditType::Line
        } else if label.starts_with("copy") {
            EditType::Copy
        } else if label.starts_with("proof") || label.starts_with("grammar") {
            EditType::Proofreading
        } else {
            EditType::Other
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditType::Developmental => "developmental",
            EditType::Structural => "structural",
            EditType::Line => "line",
            EditType::Copy => "copy",
            EditType::Proofreading => "proofreading",
            EditType::Other => "other",
        }
    }
}

/// Which collaborator produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SuggestionSource {
    /// AI "get edits" batch
    #[default]
    Edits,
    /// Passive grammar check
    Grammar,
    /// Note authored by the writer
    WriterNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuggestionState {
    #[default]
    Pending,
    /// Pending, but the anchor cannot currently be rendered
    Orphaned,
    Accepted,
    Rejected,
    Revised,
}

impl SuggestionState {
    /// Pending and orphaned suggestions are live: they get remapped
    pub fn is_pending(&self) -> bool {
        matches!(self, SuggestionState::Pending | SuggestionState::Orphaned)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

/// An edit suggestion anchored to a byte range of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub id: SuggestionId,
    /// Authoritative half-open byte range; owned by the store once added
    pub anchor: Range<usize>,
    #[serde(default)]
    pub edit_type: EditType,
    #[serde(default)]
    pub source: SuggestionSource,
    /// Text expected at `anchor`, used to re-locate it
    pub original_text: String,
    pub replacement_text: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub state: SuggestionState,
    /// Where the suggestion was last rendered (derived)
    #[serde(default)]
    pub rendered: Option<Range<usize>>,
}

impl Suggestion {
    pub fn new(
        anchor: Range<usize>,
        original_text: impl Into<String>,
        replacement_text: impl Into<String>,
    ) -> Self {
        Self {
            id: SuggestionId::new(),
            anchor,
            edit_type: EditType::default(),
            source: SuggestionSource::default(),
            original_text: original_text.into(),
            replacement_text: replacement_text.into(),
            rationale: String::new(),
            principles: Vec::new(),
            state: SuggestionState::Pending,
            rendered: None,
        }
    }

    pub fn with_id(mut self, id: SuggestionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_edit_type(mut self, edit_type: EditType) -> Self {
        self.edit_type = edit_type;
        self
    }

    pub fn with_source(mut self, source: SuggestionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_principles(mut self, principles: Vec<String>) -> Self {
        self.principles = principles;
        self
    }

    pub(crate) fn apply_patch(&mut self, patch: SuggestionPatch) {
        if let Some(anchor) = patch.anchor {
            self.anchor = anchor;
            self.rendered = None;
        }
        if let Some(edit_type) = patch.edit_type {
            self.edit_type = edit_type;
        }
        if let Some(original_text) = patch.original_text {
            self.original_text = original_text;
        }
        if let Some(replacement_text) = patch.replacement_text {
            self.replacement_text = replacement_text;
        }
        if let Some(rationale) = patch.rationale {
            self.rationale = rationale;
        }
        if let Some(principles) = patch.principles {
            self.principles = principles;
        }
    }
}

/// Partial update for a stored suggestion. `anchor` is only touched when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionPatch {
    pub anchor: Option<Range<usize>>,
    pub edit_type: Option<EditType>,
    pub original_text: Option<String>,
    pub replacement_text: Option<String>,
    pub rationale: Option<String>,
    pub principles: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Developmental", EditType::Developmental)]
    #[case("Structural Editing", EditType::Structural)]
    #[case("Line Editing", EditType::Line)]
    #[case("line", EditType::Line)]
    #[case("Copy Editing", EditType::Copy)]
    #[case("Proofreading", EditType::Proofreading)]
    #[case("grammar", EditType::Proofreading)]
    #[case("  COPY  ", EditType::Copy)]
    #[case("tone", EditType::Other)]
    fn test_edit_type_from_label(#[case] label: &str, #[case] expected: EditType) {
        assert_eq!(EditType::from_label(label), expected);
    }

    #[test]
    fn test_suggestion_id_round_trips_through_display() {
        let id = SuggestionId::new();
        let parsed = SuggestionId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
        assert!(SuggestionId::parse("not-an-id").is_err());
    }

    #[test]
    fn test_default_id_is_unassigned() {
        assert!(SuggestionId::default().is_nil());
        assert!(!SuggestionId::new().is_nil());
    }

    #[test]
    fn test_orphaned_is_still_pending() {
        assert!(SuggestionState::Orphaned.is_pending());
        assert!(SuggestionState::Pending.is_pending());
        assert!(SuggestionState::Accepted.is_terminal());
        assert!(SuggestionState::Rejected.is_terminal());
        assert!(SuggestionState::Revised.is_terminal());
    }

    #[test]
    fn test_patch_without_anchor_keeps_position() {
        let mut suggestion = Suggestion::new(15..18, "fox", "cat");
        suggestion.rendered = Some(15..18);

        suggestion.apply_patch(SuggestionPatch {
            rationale: Some("shorter".to_string()),
            replacement_text: Some("dog".to_string()),
            ..Default::default()
        });

        assert_eq!(suggestion.anchor, 15..18);
        assert_eq!(suggestion.rendered, Some(15..18));
        assert_eq!(suggestion.replacement_text, "dog");
        assert_eq!(suggestion.rationale, "shorter");
    }

    #[test]
    fn test_patch_with_anchor_moves_position() {
        let mut suggestion = Suggestion::new(15..18, "fox", "cat");

        suggestion.apply_patch(SuggestionPatch {
            anchor: Some(20..23),
            ..Default::default()
        });

        assert_eq!(suggestion.anchor, 20..23);
        assert_eq!(suggestion.rendered, None);
    }

    #[test]
    fn test_suggestion_deserializes_without_id() {
        let json = r#"{"anchor":{"start":5,"end":10},"original_text":"quick","replacement_text":"fast"}"#;
        let suggestion: Suggestion = serde_json::from_str(json).unwrap();

        assert!(suggestion.id.is_nil());
        assert_eq!(suggestion.anchor, 5..10);
        assert_eq!(suggestion.state, SuggestionState::Pending);
        assert_eq!(suggestion.edit_type, EditType::Other);
    }
}
