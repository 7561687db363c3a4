//! # Suggestion Store
//!
//! The store is an immutable value. Every operation returns a new snapshot
//! and leaves the receiver untouched, so a reader holding an older snapshot
//! always sees a consistent point-in-time view. The internals are shared
//! through `Arc` and only copied when a snapshot actually changes them.
//!
//! Each snapshot carries the sequence number of the document state it is
//! valid for. A mutation names the state it starts from, and the store only
//! accepts a mutation whose base equals its own sequence number. Replaying
//! a mutation twice, or skipping one, is therefore rejected rather than
//! silently producing shifted anchors.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::editing::decorations::{DecorationSet, Palette, Resolution, build_decorations};
use crate::editing::{Mutation, Suggestion, SuggestionId, SuggestionPatch, SuggestionState};
use crate::error::{MutationError, Result, SuggestionError};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Settings shared by every snapshot derived from the same store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub palette: Palette,
    /// How many processed suggestions to keep for UI history
    pub history_limit: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Store operations, processed by [`SuggestionStore::dispatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Add(Vec<Suggestion>),
    Update {
        id: SuggestionId,
        patch: SuggestionPatch,
    },
    Remove(SuggestionId),
    Clear,
    ApplyMutation {
        mutation: Mutation,
        text: Arc<str>,
    },
    MergeExternal(Vec<Suggestion>),
}

#[derive(Debug, Clone)]
pub struct SuggestionStore {
    pub(crate) seq: u64,
    pub(crate) text: Arc<str>,
    pub(crate) suggestions: Arc<Vec<Suggestion>>,
    pub(crate) processed: Arc<VecDeque<Suggestion>>,
    /// Every id that reached a terminal state, so it can never come back
    pub(crate) retired: Arc<HashSet<SuggestionId>>,
    pub(crate) decorations: Arc<DecorationSet>,
    pub(crate) settings: Arc<StoreSettings>,
}

impl SuggestionStore {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self::with_settings(text, StoreSettings::default())
    }

    pub fn with_settings(text: impl Into<Arc<str>>, settings: StoreSettings) -> Self {
        Self {
            seq: 0,
            text: text.into(),
            suggestions: Arc::new(Vec::new()),
            processed: Arc::new(VecDeque::new()),
            retired: Arc::new(HashSet::new()),
            decorations: Arc::new(DecorationSet::default()),
            settings: Arc::new(settings),
        }
    }

    /// Sequence number of the document state this snapshot is valid for
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Live suggestions (pending and orphaned) in insertion order
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Renderable suggestions only
    pub fn pending(&self) -> impl Iterator<Item = &Suggestion> {
        self.suggestions
            .iter()
            .filter(|suggestion| suggestion.state == SuggestionState::Pending)
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.suggestions.iter().find(|suggestion| suggestion.id == id)
    }

    /// Recently accepted, rejected and revised suggestions, oldest first
    pub fn processed(&self) -> impl Iterator<Item = &Suggestion> {
        self.processed.iter()
    }

    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn dispatch(&self, op: StoreOp) -> Result<Self> {
        match op {
            StoreOp::Add(suggestions) => self.add_suggestions(suggestions),
            StoreOp::Update { id, patch } => self.update_suggestion(id, patch),
            StoreOp::Remove(id) => Ok(self.remove_suggestion(id)),
            StoreOp::Clear => Ok(self.clear()),
            StoreOp::ApplyMutation { mutation, text } => self.apply_mutation(&mutation, text),
            StoreOp::MergeExternal(batch) => Ok(self.merge_external(batch).0),
        }
    }

    /// Remap every live anchor through `mutation` and re-derive decorations
    /// against `text`, the document after the mutation
    pub fn apply_mutation(&self, mutation: &Mutation, text: impl Into<Arc<str>>) -> Result<Self> {
        self.replay(std::iter::once(mutation), text)
    }

    /// Catch this snapshot up through consecutive mutations, remapping once
    /// per mutation and rebuilding decorations once against the final text
    pub fn replay<'a>(
        &self,
        mutations: impl IntoIterator<Item = &'a Mutation>,
        text: impl Into<Arc<str>>,
    ) -> Result<Self> {
        let mut next = self.clone();
        let mut len = self.text.len();

        for mutation in mutations {
            if mutation.base() != next.seq {
                return Err(SuggestionError::StaleSnapshot {
                    snapshot: next.seq,
                    mutation: mutation.base(),
                });
            }
            len = mutation.validate(len)?;
            next.remap_live(mutation);
            next.seq += 1;
        }

        let text = text.into();
        if text.len() != len {
            return Err(MutationError::LengthMismatch {
                expected: len,
                actual: text.len(),
            }
            .into());
        }

        log::debug!(
            "remapped {} suggestions from sequence {} to {}",
            next.suggestions.len(),
            self.seq,
            next.seq
        );
        next.text = text;
        Ok(next.rebuild())
    }

    /// Append suggestions whose anchors are valid for the current text.
    /// Ids that already reached a terminal state cannot come back.
    pub fn add_suggestions(&self, suggestions: Vec<Suggestion>) -> Result<Self> {
        let mut next = self.clone();
        let live = Arc::make_mut(&mut next.suggestions);

        for mut suggestion in suggestions {
            if suggestion.id.is_nil() {
                suggestion.id = SuggestionId::new();
            }
            if live.iter().any(|existing| existing.id == suggestion.id) {
                return Err(SuggestionError::DuplicateId(suggestion.id));
            }
            if next.retired.contains(&suggestion.id) {
                return Err(SuggestionError::Retired(suggestion.id));
            }
            suggestion.state = SuggestionState::Pending;
            suggestion.rendered = None;
            live.push(suggestion);
        }

        Ok(next.rebuild())
    }

    pub fn update_suggestion(&self, id: SuggestionId, patch: SuggestionPatch) -> Result<Self> {
        let index = self.position(id).ok_or(SuggestionError::NotFound(id))?;

        let mut next = self.clone();
        Arc::make_mut(&mut next.suggestions)[index].apply_patch(patch);

        Ok(next.rebuild())
    }

    /// Remove a suggestion; removing an unknown id is a no-op
    pub fn remove_suggestion(&self, id: SuggestionId) -> Self {
        let Some(index) = self.position(id) else {
            log::debug!("suggestion {id} already removed");
            return self.clone();
        };

        let mut next = self.clone();
        Arc::make_mut(&mut next.suggestions).remove(index);
        next.rebuild()
    }

    /// Drop every live suggestion. Processed history is kept.
    pub fn clear(&self) -> Self {
        let mut next = self.clone();
        next.suggestions = Arc::new(Vec::new());
        next.decorations = Arc::new(DecorationSet::default());
        next
    }

    pub(crate) fn position(&self, id: SuggestionId) -> Option<usize> {
        self.suggestions
            .iter()
            .position(|suggestion| suggestion.id == id)
    }

    pub(crate) fn remap_live(&mut self, mutation: &Mutation) {
        for suggestion in Arc::make_mut(&mut self.suggestions)
            .iter_mut()
            .filter(|suggestion| suggestion.state.is_pending())
        {
            suggestion.anchor = mutation.map_range(&suggestion.anchor);
            suggestion.rendered = suggestion
                .rendered
                .as_ref()
                .map(|rendered| mutation.map_range(rendered));
        }
    }

    /// Move a suggestion that reached a terminal state into the history
    pub(crate) fn retire(&mut self, suggestion: Suggestion) {
        Arc::make_mut(&mut self.retired).insert(suggestion.id);

        let limit = self.settings.history_limit;
        let processed = Arc::make_mut(&mut self.processed);
        processed.push_back(suggestion);
        while processed.len() > limit {
            processed.pop_front();
        }
    }

    pub(crate) fn is_retired(&self, id: SuggestionId) -> bool {
        self.retired.contains(&id)
    }

    /// Re-derive decorations and write the resolved positions back
    pub(crate) fn rebuild(mut self) -> Self {
        let set = build_decorations(&self.text, &self.suggestions, &self.settings.palette);

        for suggestion in Arc::make_mut(&mut self.suggestions)
            .iter_mut()
            .filter(|suggestion| suggestion.state.is_pending())
        {
            match set.get(suggestion.id) {
                Some(span) => {
                    if span.resolution == Resolution::Search {
                        log::debug!(
                            "re-anchored suggestion {} from {:?} to {:?}",
                            suggestion.id,
                            suggestion.anchor,
                            span.range
                        );
                        suggestion.anchor = span.range.clone();
                    }
                    suggestion.rendered = Some(span.range.clone());
                    suggestion.state = SuggestionState::Pending;
                }
                None => {
                    suggestion.rendered = None;
                    suggestion.state = SuggestionState::Orphaned;
                }
            }
        }

        self.decorations = Arc::new(set);
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::editing::Splice;
    use pretty_assertions::assert_eq;

    pub(crate) const TEXT: &str = "What quick bold fox jumped over the sleeping lazy dog.";

    pub(crate) fn fixture() -> (SuggestionStore, [SuggestionId; 3]) {
        let quick = Suggestion::new(5..10, "quick", "fast");
        let fox = Suggestion::new(16..19, "fox", "cat");
        let lazy = Suggestion::new(45..49, "lazy", "idle");
        let ids = [quick.id, fox.id, lazy.id];

        let store = SuggestionStore::new(TEXT)
            .add_suggestions(vec![quick, fox, lazy])
            .unwrap();
        (store, ids)
    }

    pub(crate) fn anchor(store: &SuggestionStore, id: SuggestionId) -> std::ops::Range<usize> {
        store.get(id).unwrap().anchor.clone()
    }

    #[test]
    fn test_add_renders_every_suggestion() {
        let (store, [quick, fox, lazy]) = fixture();

        assert_eq!(store.seq(), 0);
        assert_eq!(store.suggestions().len(), 3);
        assert_eq!(store.decorations().spans.len(), 3);
        assert_eq!(store.get(quick).unwrap().rendered, Some(5..10));
        assert_eq!(store.get(fox).unwrap().rendered, Some(16..19));
        assert_eq!(store.get(lazy).unwrap().rendered, Some(45..49));
    }

    #[test]
    fn test_add_assigns_missing_ids() {
        let unassigned = Suggestion::new(5..10, "quick", "fast").with_id(SuggestionId::default());

        let store = SuggestionStore::new(TEXT)
            .add_suggestions(vec![unassigned])
            .unwrap();

        assert!(!store.suggestions()[0].id.is_nil());
    }

    #[test]
    fn test_add_rejects_duplicate_ids() {
        let (store, [quick, _, _]) = fixture();
        let duplicate = Suggestion::new(45..49, "lazy", "idle").with_id(quick);

        let result = store.add_suggestions(vec![duplicate]);

        assert!(matches!(result, Err(SuggestionError::DuplicateId(id)) if id == quick));
    }

    #[test]
    fn test_readding_a_processed_suggestion_is_rejected() {
        let (store, [quick, _, _]) = fixture();
        let original = store.get(quick).unwrap().clone();
        let rejected = store.reject(quick).unwrap().store;

        let result = rejected.add_suggestions(vec![original]);

        assert!(matches!(result, Err(SuggestionError::Retired(id)) if id == quick));
        assert!(rejected.get(quick).is_none());
        assert_eq!(rejected.processed().count(), 1);
    }

    #[test]
    fn test_apply_mutation_remaps_each_anchor_once() {
        let (store, [quick, fox, lazy]) = fixture();
        // Insert "very " before "quick"
        let text = TEXT.replacen("What ", "What very ", 1);
        let mutation = Mutation::single(0, Splice::insert(5, 5));

        let next = store.apply_mutation(&mutation, text).unwrap();

        assert_eq!(next.seq(), 1);
        // The insertion point is the anchor's start, so the mapped anchor
        // grows to "very quick" and is re-anchored by search
        assert_eq!(anchor(&next, quick), 10..15);
        assert_eq!(anchor(&next, fox), 21..24);
        assert_eq!(anchor(&next, lazy), 50..54);
        assert_eq!(&next.text()[21..24], "fox");
    }

    #[test]
    fn test_previous_snapshot_is_untouched() {
        let (store, [_, fox, _]) = fixture();
        let text = TEXT.replacen("What ", "", 1);
        let mutation = Mutation::single(0, Splice::delete(0..5));

        let next = store.apply_mutation(&mutation, text).unwrap();

        assert_eq!(anchor(&next, fox), 11..14);
        assert_eq!(anchor(&store, fox), 16..19);
        assert_eq!(store.seq(), 0);
        assert_eq!(store.text(), TEXT);
    }

    #[test]
    fn test_replaying_a_mutation_is_stale() {
        let (store, _) = fixture();
        let text = TEXT.replacen("What ", "", 1);
        let mutation = Mutation::single(0, Splice::delete(0..5));

        let next = store.apply_mutation(&mutation, text.clone()).unwrap();
        let result = next.apply_mutation(&mutation, text);

        assert!(matches!(
            result,
            Err(SuggestionError::StaleSnapshot {
                snapshot: 1,
                mutation: 0
            })
        ));
    }

    #[test]
    fn test_mutation_from_the_future_is_stale() {
        let (store, _) = fixture();
        let mutation = Mutation::single(3, Splice::insert(0, 1));

        let result = store.apply_mutation(&mutation, format!("x{TEXT}"));

        assert!(matches!(result, Err(SuggestionError::StaleSnapshot { .. })));
    }

    #[test]
    fn test_malformed_mutation_is_rejected() {
        let (store, _) = fixture();
        let mutation = Mutation::single(0, Splice::delete(50..80));

        let result = store.apply_mutation(&mutation, "");

        assert!(matches!(
            result,
            Err(SuggestionError::InvalidMutation(MutationError::OutOfBounds { .. }))
        ));
        assert_eq!(store.seq(), 0);
    }

    #[test]
    fn test_overflowing_splice_is_invalid() {
        let (store, [_, fox, _]) = fixture();
        let splice = Splice {
            at: usize::MAX,
            deleted_len: 1,
            inserted_len: 0,
        };

        let result = store.apply_mutation(&Mutation::single(0, splice), TEXT);

        assert!(matches!(
            result,
            Err(SuggestionError::InvalidMutation(MutationError::OutOfBounds { .. }))
        ));
        assert_eq!(store.seq(), 0);
        assert_eq!(anchor(&store, fox), 16..19);
    }

    #[test]
    fn test_text_length_must_match_mutation() {
        let (store, _) = fixture();
        let mutation = Mutation::single(0, Splice::insert(0, 3));

        let result = store.apply_mutation(&mutation, TEXT);

        assert!(matches!(
            result,
            Err(SuggestionError::InvalidMutation(MutationError::LengthMismatch {
                expected: 57,
                actual: 54
            }))
        ));
    }

    #[test]
    fn test_deletion_swallowing_anchor_orphans_it() {
        let (store, [quick, fox, lazy]) = fixture();
        // Delete " bold fox jumped" (10..26)
        let text = format!("{}{}", &TEXT[..10], &TEXT[26..]);
        let mutation = Mutation::single(0, Splice::delete(10..26));

        let next = store.apply_mutation(&mutation, text).unwrap();

        let orphan = next.get(fox).unwrap();
        assert_eq!(orphan.anchor, 10..10);
        assert_eq!(orphan.state, SuggestionState::Orphaned);
        assert_eq!(next.decorations().orphaned, vec![fox]);
        assert!(next.decorations().get(fox).is_none());
        assert_eq!(anchor(&next, quick), 5..10);
        assert_eq!(anchor(&next, lazy), 29..33);
        assert_eq!(next.pending().count(), 2);
    }

    #[test]
    fn test_replay_catches_up_an_old_snapshot() {
        let (store, [_, fox, _]) = fixture();
        let first = Mutation::single(0, Splice::delete(0..5));
        let second = Mutation::single(1, Splice::insert(0, 2));
        let text = format!("A {}", &TEXT[5..]);

        let caught_up = store.replay([&first, &second], text).unwrap();

        assert_eq!(caught_up.seq(), 2);
        assert_eq!(anchor(&caught_up, fox), 13..16);
        assert_eq!(&caught_up.text()[13..16], "fox");
    }

    #[test]
    fn test_replay_rejects_gaps() {
        let (store, _) = fixture();
        let first = Mutation::single(0, Splice::delete(0..5));
        let third = Mutation::single(2, Splice::insert(0, 2));

        let result = store.replay([&first, &third], "");

        assert!(matches!(
            result,
            Err(SuggestionError::StaleSnapshot {
                snapshot: 1,
                mutation: 2
            })
        ));
    }

    #[test]
    fn test_update_merges_fields_without_moving_anchor() {
        let (store, [_, fox, _]) = fixture();

        let next = store
            .update_suggestion(
                fox,
                SuggestionPatch {
                    replacement_text: Some("hound".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(next.get(fox).unwrap().replacement_text, "hound");
        assert_eq!(anchor(&next, fox), 16..19);
    }

    #[test]
    fn test_update_with_anchor_revives_orphan() {
        let (store, [_, fox, _]) = fixture();
        let text = format!("{}{}", &TEXT[..10], &TEXT[26..]);
        let orphaned = store
            .apply_mutation(&Mutation::single(0, Splice::delete(10..26)), text)
            .unwrap();

        let revived = orphaned
            .update_suggestion(
                fox,
                SuggestionPatch {
                    anchor: Some(29..33),
                    original_text: Some("lazy".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(revived.get(fox).unwrap().state, SuggestionState::Pending);
        assert!(revived.decorations().get(fox).is_some());
    }

    #[test]
    fn test_update_unknown_id_fails() {
        let (store, _) = fixture();
        let unknown = SuggestionId::new();

        let result = store.update_suggestion(unknown, SuggestionPatch::default());

        assert!(matches!(result, Err(SuggestionError::NotFound(id)) if id == unknown));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, [quick, _, _]) = fixture();

        let once = store.remove_suggestion(quick);
        let twice = once.remove_suggestion(quick);

        assert!(once.get(quick).is_none());
        assert_eq!(twice.suggestions().len(), 2);
        assert_eq!(twice.decorations().spans.len(), 2);
    }

    #[test]
    fn test_clear_drops_live_suggestions() {
        let (store, _) = fixture();

        let cleared = store.clear();

        assert!(cleared.suggestions().is_empty());
        assert!(cleared.decorations().is_empty());
        assert_eq!(store.suggestions().len(), 3);
    }

    #[test]
    fn test_dispatch_routes_every_operation() {
        let (store, [quick, fox, _]) = fixture();
        let text: Arc<str> = Arc::from(TEXT.replacen("What ", "", 1));

        let store = store
            .dispatch(StoreOp::ApplyMutation {
                mutation: Mutation::single(0, Splice::delete(0..5)),
                text,
            })
            .unwrap();
        assert_eq!(anchor(&store, fox), 11..14);

        let store = store.dispatch(StoreOp::Remove(quick)).unwrap();
        assert!(store.get(quick).is_none());

        let store = store
            .dispatch(StoreOp::Update {
                id: fox,
                patch: SuggestionPatch {
                    rationale: Some("animal".to_string()),
                    ..Default::default()
                },
            })
            .unwrap();
        assert_eq!(store.get(fox).unwrap().rationale, "animal");

        let store = store.dispatch(StoreOp::Clear).unwrap();
        assert!(store.suggestions().is_empty());

        let store = store
            .dispatch(StoreOp::Add(vec![Suggestion::new(0..5, "quick", "fast")]))
            .unwrap();
        assert_eq!(store.pending().count(), 1);
    }
}
