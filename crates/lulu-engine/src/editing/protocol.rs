//! # Acceptance/Rejection Protocol
//!
//! `Pending -> Accepted | Rejected | Revised`. Every transition is terminal.
//!
//! Accepting (or revising) emits exactly one mutation replacing the anchored
//! range, transitions the suggestion out of the live list, and only then
//! remaps the remaining suggestions through that same mutation. The accepted
//! suggestion is never remapped after its own edit, and every sibling is
//! remapped exactly once against it.

use std::sync::Arc;

use serde::Serialize;

use crate::editing::{EditType, Mutation, Splice, SuggestionId, SuggestionState, SuggestionStore};
use crate::error::{Result, SuggestionError};

/// Emitted for every lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    pub id: SuggestionId,
    pub state: SuggestionState,
    pub edit_type: EditType,
    /// Sequence number of the snapshot produced by the transition
    pub seq: u64,
}

/// Result of a transition: the new snapshot, the document edit the host must
/// apply (accept/revise only) and the event to publish
#[derive(Debug, Clone)]
pub struct Transition {
    pub store: SuggestionStore,
    pub mutation: Option<Mutation>,
    /// Text inserted by `mutation`
    pub replacement: Option<String>,
    pub event: LifecycleEvent,
}

impl SuggestionStore {
    pub fn accept(&self, id: SuggestionId) -> Result<Transition> {
        self.replace_anchor(id, None, SuggestionState::Accepted)
    }

    /// Accept with the writer's own text instead of the proposed replacement
    pub fn revise(&self, id: SuggestionId, text: impl Into<String>) -> Result<Transition> {
        self.replace_anchor(id, Some(text.into()), SuggestionState::Revised)
    }

    /// Reject a suggestion. The document does not change, so nothing is
    /// remapped.
    pub fn reject(&self, id: SuggestionId) -> Result<Transition> {
        let index = self.position(id).ok_or(SuggestionError::NotFound(id))?;

        let mut next = self.clone();
        let mut rejected = Arc::make_mut(&mut next.suggestions).remove(index);
        rejected.state = SuggestionState::Rejected;
        rejected.rendered = None;

        let event = LifecycleEvent {
            id,
            state: SuggestionState::Rejected,
            edit_type: rejected.edit_type,
            seq: next.seq,
        };
        log::debug!("rejected suggestion {id}");

        next.retire(rejected);
        Ok(Transition {
            store: next.rebuild(),
            mutation: None,
            replacement: None,
            event,
        })
    }

    fn replace_anchor(
        &self,
        id: SuggestionId,
        revised: Option<String>,
        outcome: SuggestionState,
    ) -> Result<Transition> {
        let index = self.position(id).ok_or(SuggestionError::NotFound(id))?;
        let target = &self.suggestions[index];
        if target.state == SuggestionState::Orphaned {
            return Err(SuggestionError::OrphanedSuggestion(id));
        }

        let range = target.anchor.clone();
        let (Some(before), Some(after)) = (self.text.get(..range.start), self.text.get(range.end..))
        else {
            return Err(SuggestionError::OrphanedSuggestion(id));
        };
        let replacement = revised.unwrap_or_else(|| target.replacement_text.clone());

        // Emit
        let mutation = Mutation::single(
            self.seq,
            Splice::replace(range.clone(), replacement.len()),
        );
        let text = format!("{before}{replacement}{after}");

        // Transition
        let mut next = self.clone();
        let mut retired = Arc::make_mut(&mut next.suggestions).remove(index);
        retired.state = outcome;
        retired.rendered = None;
        retired.replacement_text = replacement.clone();

        // Remap the siblings through the emitted edit
        next.remap_live(&mutation);
        next.seq += 1;
        next.text = Arc::from(text);

        let event = LifecycleEvent {
            id,
            state: outcome,
            edit_type: retired.edit_type,
            seq: next.seq,
        };
        log::debug!("{outcome:?} suggestion {id} at {range:?}");

        next.retire(retired);
        Ok(Transition {
            store: next.rebuild(),
            mutation: Some(mutation),
            replacement: Some(replacement),
            event,
        })
    }
}
