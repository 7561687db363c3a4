//! # External Sync Bridge
//!
//! The only channel through which the application layer may push a batch of
//! suggestions into the store. Once a suggestion is in the store its anchor
//! belongs to the store: a batch computed against an older document can
//! refresh the wording of a known suggestion but never move it.
//!
//! There is no `replace_all`: resetting means `clear()` followed by
//! `add_suggestions()`.

use std::sync::Arc;

use crate::editing::{Suggestion, SuggestionId, SuggestionState, SuggestionStore};

/// What a merge did with each incoming suggestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    /// Incoming ids that were already accepted, rejected or revised
    pub ignored: usize,
}

impl SuggestionStore {
    pub fn merge_external(&self, batch: Vec<Suggestion>) -> (Self, MergeSummary) {
        let mut summary = MergeSummary::default();
        let mut next = self.clone();
        let retired = Arc::clone(&self.retired);
        let live = Arc::make_mut(&mut next.suggestions);

        for mut incoming in batch {
            if incoming.id.is_nil() {
                incoming.id = SuggestionId::new();
            }

            if retired.contains(&incoming.id) {
                summary.ignored += 1;
                continue;
            }

            match live.iter_mut().find(|existing| existing.id == incoming.id) {
                Some(existing) => {
                    if incoming.anchor != existing.anchor {
                        log::debug!(
                            "ignoring external anchor {:?} for suggestion {} (store has {:?})",
                            incoming.anchor,
                            existing.id,
                            existing.anchor
                        );
                    }
                    existing.edit_type = incoming.edit_type;
                    existing.replacement_text = incoming.replacement_text;
                    existing.rationale = incoming.rationale;
                    existing.principles = incoming.principles;
                    summary.updated += 1;
                }
                None => {
                    incoming.state = SuggestionState::Pending;
                    incoming.rendered = None;
                    live.push(incoming);
                    summary.added += 1;
                }
            }
        }

        log::debug!(
            "merged external batch: {} added, {} updated, {} ignored",
            summary.added,
            summary.updated,
            summary.ignored
        );
        (next.rebuild(), summary)
    }
}
