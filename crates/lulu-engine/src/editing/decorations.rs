//! # Decoration Builder
//!
//! Derives renderable highlight spans from the live suggestions. This is a
//! pure projection: the store calls it after every change and writes the
//! resolved ranges back as `rendered`, re-anchoring suggestions that had to
//! be found by text search.

use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;

use crate::editing::{EditType, Suggestion, SuggestionId};

/// Highlight color per edit type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: HashMap<EditType, String>,
}

impl Default for Palette {
    fn default() -> Self {
        let colors = [
            (EditType::Developmental, "#8e44ad"),
            (EditType::Structural, "#2980b9"),
            (EditType::Line, "#27ae60"),
            (EditType::Copy, "#f39c12"),
            (EditType::Proofreading, "#e74c3c"),
            (EditType::Other, "#7f8c8d"),
        ]
        .into_iter()
        .map(|(edit_type, color)| (edit_type, color.to_string()))
        .collect();

        Self { colors }
    }
}

impl Palette {
    pub fn with_color(mut self, edit_type: EditType, color: impl Into<String>) -> Self {
        self.colors.insert(edit_type, color.into());
        self
    }

    /// Apply overrides keyed by edit type label (see [`EditType::from_label`])
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        for (label, color) in overrides {
            self.colors.insert(EditType::from_label(label), color.to_string());
        }
        self
    }

    pub fn color(&self, edit_type: EditType) -> &str {
        self.colors.get(&edit_type).map_or("#7f8c8d", String::as_str)
    }
}

/// How a span's range was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// The stored anchor still covers the original text
    Anchor,
    /// The original text was found by searching the document
    Search,
}

/// One renderable highlight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    /// Round-trips hover/click events back to the store
    pub id: SuggestionId,
    pub range: Range<usize>,
    pub edit_type: EditType,
    pub color: String,
    /// 1-based position in the live suggestion list, matches the side panel
    pub badge: usize,
    /// Stacking order; 0 unless the span overlaps an earlier one
    pub layer: usize,
    pub resolution: Resolution,
}

/// A later span that overlaps an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overlap {
    pub earlier: SuggestionId,
    pub later: SuggestionId,
}

/// Decorations in document order plus everything that could not be rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecorationSet {
    pub spans: Vec<Decoration>,
    pub overlaps: Vec<Overlap>,
    /// Zero-width anchors left behind by a deletion
    pub orphaned: Vec<SuggestionId>,
    /// Anchors that are invalid and whose text could not be found
    pub unresolved: Vec<SuggestionId>,
}

impl DecorationSet {
    pub fn get(&self, id: SuggestionId) -> Option<&Decoration> {
        self.spans.iter().find(|span| span.id == id)
    }

    /// The topmost span covering `pos`
    pub fn span_at(&self, pos: usize) -> Option<&Decoration> {
        self.spans
            .iter()
            .filter(|span| span.range.contains(&pos))
            .max_by_key(|span| span.layer)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

pub fn build_decorations(
    text: &str,
    suggestions: &[Suggestion],
    palette: &Palette,
) -> DecorationSet {
    let mut set = DecorationSet::default();

    let mut live: Vec<(usize, &Suggestion)> = suggestions
        .iter()
        .filter(|suggestion| suggestion.state.is_pending())
        .enumerate()
        .map(|(index, suggestion)| (index + 1, suggestion))
        .collect();

    // Resolve in document order so searches can start after the previous span
    live.sort_by_key(|(_, suggestion)| (suggestion.anchor.start, suggestion.anchor.end));

    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut cursor = 0;

    for (badge, suggestion) in live {
        if suggestion.anchor.start >= suggestion.anchor.end {
            set.orphaned.push(suggestion.id);
            continue;
        }

        let resolved = if anchor_matches(text, suggestion) {
            Some((suggestion.anchor.clone(), Resolution::Anchor))
        } else {
            search_original(text, suggestion, cursor, &claimed)
                .map(|range| (range, Resolution::Search))
        };

        let Some((range, resolution)) = resolved else {
            log::warn!(
                "suggestion {} could not be located in the document",
                suggestion.id
            );
            set.unresolved.push(suggestion.id);
            continue;
        };

        cursor = cursor.max(range.end);
        claimed.push(range.clone());
        set.spans.push(Decoration {
            id: suggestion.id,
            range,
            edit_type: suggestion.edit_type,
            color: palette.color(suggestion.edit_type).to_string(),
            badge,
            layer: 0,
            resolution,
        });
    }

    set.spans.sort_by_key(|span| (span.range.start, span.range.end));
    assign_layers(&mut set);

    set
}

fn anchor_matches(text: &str, suggestion: &Suggestion) -> bool {
    text.get(suggestion.anchor.clone()).is_some_and(|slice| {
        suggestion.original_text.is_empty() || slice == suggestion.original_text
    })
}

/// Find `original_text`: the first unclaimed occurrence at or after `cursor`,
/// otherwise the unclaimed occurrence nearest to where the suggestion was
/// last seen
fn search_original(
    text: &str,
    suggestion: &Suggestion,
    cursor: usize,
    claimed: &[Range<usize>],
) -> Option<Range<usize>> {
    let needle = suggestion.original_text.as_str();
    if needle.is_empty() {
        return None;
    }

    let occurrences: Vec<Range<usize>> = text
        .match_indices(needle)
        .map(|(start, found)| start..start + found.len())
        .filter(|range| !claimed.contains(range))
        .collect();

    if let Some(next) = occurrences.iter().find(|range| range.start >= cursor) {
        return Some(next.clone());
    }

    let hint = suggestion
        .rendered
        .as_ref()
        .map_or(suggestion.anchor.start, |rendered| rendered.start);
    occurrences
        .into_iter()
        .min_by_key(|range| range.start.abs_diff(hint))
}

/// Earliest `from` wins; every later span that starts inside an open span is
/// reported and stacked one layer higher per open span
fn assign_layers(set: &mut DecorationSet) {
    let mut open: Vec<(usize, SuggestionId)> = Vec::new();

    for span in &mut set.spans {
        open.retain(|(end, _)| *end > span.range.start);

        if let Some((_, earlier)) = open.first() {
            log::warn!(
                "suggestion {} overlaps suggestion {} at {:?}",
                span.id,
                earlier,
                span.range
            );
            set.overlaps.push(Overlap {
                earlier: *earlier,
                later: span.id,
            });
        }

        span.layer = open.len();
        open.push((span.range.end, span.id));
    }
}

/// Format a decoration set as readable text for snapshot testing and the CLI
pub fn format_decorations(set: &DecorationSet, text: &str) -> String {
    use std::fmt::Write;

    let badge_of = |id: SuggestionId| {
        set.get(id)
            .map_or_else(|| "?".to_string(), |span| format!("#{}", span.badge))
    };

    let mut out = String::new();
    for span in &set.spans {
        let resolution = match span.resolution {
            Resolution::Anchor => "anchor",
            Resolution::Search => "search",
        };
        let _ = writeln!(
            out,
            "#{} {} [{}..{}] {} layer {} {:?}",
            span.badge,
            span.edit_type.name(),
            span.range.start,
            span.range.end,
            resolution,
            span.layer,
            text.get(span.range.clone()).unwrap_or_default()
        );
    }
    for overlap in &set.overlaps {
        let _ = writeln!(
            out,
            "overlap: {} overlaps {}",
            badge_of(overlap.later),
            badge_of(overlap.earlier)
        );
    }
    if !set.orphaned.is_empty() {
        let _ = writeln!(out, "orphaned: {}", set.orphaned.len());
    }
    if !set.unresolved.is_empty() {
        let _ = writeln!(out, "unresolved: {}", set.unresolved.len());
    }
    out
}
