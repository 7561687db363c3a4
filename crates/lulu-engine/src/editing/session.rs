//! # Editing Session
//!
//! Couples the manuscript [`Document`] with the [`SuggestionStore`] so the
//! two can never disagree about which document state they describe: the
//! document version and the store sequence number advance together, one
//! mutation at a time.
//!
//! The session also keeps a bounded log of recent mutations. Suggestion
//! batches that were requested before the writer kept typing are remapped
//! through that log before they are merged, and an older store snapshot can
//! be caught up with [`Session::resync`].

use std::collections::{HashMap, VecDeque};

use crate::editing::{
    Cmd, DecorationSet, Document, LifecycleEvent, MergeSummary, Mutation, Patch, StoreSettings,
    Suggestion, SuggestionId, SuggestionPatch, SuggestionSource, SuggestionStore, Transition,
};
use crate::error::{Result, SuggestionError};
use crate::ingest::{self, SuggestionPayload};

/// How many mutations are kept for late batches and resync
pub const MUTATION_LOG_LIMIT: usize = 256;

/// Issued when a suggestion request starts; handed back with the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub source: SuggestionSource,
    pub generation: u64,
    /// Store sequence number the request was made against
    pub seq: u64,
}

pub struct Session {
    document: Document,
    store: SuggestionStore,
    log: VecDeque<Mutation>,
    generations: HashMap<SuggestionSource, u64>,
    events: Vec<LifecycleEvent>,
}

impl Session {
    pub fn new(document: Document, settings: StoreSettings) -> Self {
        let mut store = SuggestionStore::with_settings(document.text(), settings);
        store.seq = document.version();

        Self {
            document,
            store,
            log: VecDeque::new(),
            generations: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Current snapshot; cloning it is cheap
    pub fn store(&self) -> &SuggestionStore {
        &self.store
    }

    pub fn decorations(&self) -> &DecorationSet {
        self.store.decorations()
    }

    /// Move the caret or selection; this is not an edit
    pub fn set_selection(&mut self, selection: std::ops::Range<usize>) {
        self.document.set_selection(selection);
    }

    /// Topmost pending suggestion rendered at `pos`
    pub fn suggestion_at(&self, pos: usize) -> Option<&Suggestion> {
        let span = self.store.decorations().span_at(pos)?;
        self.store.get(span.id)
    }

    /// Apply a writer edit and remap every suggestion through it
    pub fn edit(&mut self, cmd: Cmd) -> Result<Patch> {
        let mut document = self.document.clone();
        let patch = document.apply(cmd)?;
        let store = self
            .store
            .apply_mutation(&patch.mutation, document.text())?;

        self.document = document;
        self.store = store;
        self.record(patch.mutation.clone());
        Ok(patch)
    }

    pub fn accept(&mut self, id: SuggestionId) -> Result<LifecycleEvent> {
        let range = self.anchor_of(id)?;
        let transition = self.store.accept(id)?;
        self.commit(range, transition)
    }

    pub fn revise(&mut self, id: SuggestionId, text: impl Into<String>) -> Result<LifecycleEvent> {
        let range = self.anchor_of(id)?;
        let transition = self.store.revise(id, text)?;
        self.commit(range, transition)
    }

    pub fn reject(&mut self, id: SuggestionId) -> Result<LifecycleEvent> {
        let transition = self.store.reject(id)?;
        self.store = transition.store;
        self.events.push(transition.event.clone());
        Ok(transition.event)
    }

    pub fn add_suggestions(&mut self, suggestions: Vec<Suggestion>) -> Result<()> {
        self.store = self.store.add_suggestions(suggestions)?;
        Ok(())
    }

    pub fn update_suggestion(&mut self, id: SuggestionId, patch: SuggestionPatch) -> Result<()> {
        self.store = self.store.update_suggestion(id, patch)?;
        Ok(())
    }

    pub fn remove_suggestion(&mut self, id: SuggestionId) {
        self.store = self.store.remove_suggestion(id);
    }

    pub fn clear(&mut self) {
        self.store = self.store.clear();
    }

    /// Merge a batch that was computed against the current document
    pub fn ingest(
        &mut self,
        source: SuggestionSource,
        payloads: Vec<SuggestionPayload>,
    ) -> MergeSummary {
        let batch = ingest::normalize(self.store.text(), payloads, source);
        let (store, summary) = self.store.merge_external(batch);
        self.store = store;
        summary
    }

    /// Start a request for suggestions from `source`. Any earlier request
    /// for the same source that has not completed yet is superseded.
    pub fn begin_fetch(&mut self, source: SuggestionSource) -> FetchTicket {
        let generation = self.generations.entry(source).or_default();
        *generation += 1;

        FetchTicket {
            source,
            generation: *generation,
            seq: self.store.seq(),
        }
    }

    /// Merge the response to a request. Returns `None` when a newer request
    /// for the same source was started in the meantime.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        mut payloads: Vec<SuggestionPayload>,
    ) -> Option<MergeSummary> {
        let latest = self.generations.get(&ticket.source).copied();
        if latest != Some(ticket.generation) {
            log::info!(
                "discarding superseded {:?} batch (generation {}, latest {:?})",
                ticket.source,
                ticket.generation,
                latest
            );
            return None;
        }

        match self.mutations_since(ticket.seq) {
            Some(mutations) => {
                for payload in &mut payloads {
                    if let (Some(start), Some(end)) = (payload.start, payload.end) {
                        let range = mutations
                            .iter()
                            .fold(start..end, |range, mutation| mutation.map_range(&range));
                        payload.start = Some(range.start);
                        payload.end = Some(range.end);
                    }
                }
            }
            None => {
                log::warn!(
                    "{:?} batch from sequence {} predates the mutation log; locating by text",
                    ticket.source,
                    ticket.seq
                );
                for payload in &mut payloads {
                    payload.start = None;
                    payload.end = None;
                }
            }
        }

        Some(self.ingest(ticket.source, payloads))
    }

    /// Catch an older snapshot up with the current document. Suggestions
    /// that have since been accepted, rejected or revised are dropped before
    /// the replay.
    pub fn resync(&self, stale: &SuggestionStore) -> Result<SuggestionStore> {
        let mutations = self
            .mutations_since(stale.seq())
            .ok_or(SuggestionError::StaleSnapshot {
                snapshot: stale.seq(),
                mutation: self.log.front().map_or(self.store.seq(), Mutation::base),
            })?;

        let retired: Vec<_> = stale
            .suggestions()
            .iter()
            .map(|suggestion| suggestion.id)
            .filter(|id| self.store.is_retired(*id))
            .collect();
        let mut live = stale.clone();
        for id in retired {
            live = live.remove_suggestion(id);
        }
        live.replay(mutations, self.document.text())
    }

    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    fn anchor_of(&self, id: SuggestionId) -> Result<std::ops::Range<usize>> {
        self.store
            .get(id)
            .map(|suggestion| suggestion.anchor.clone())
            .ok_or(SuggestionError::NotFound(id))
    }

    /// Apply an accepted replacement to the document and adopt the snapshot
    fn commit(
        &mut self,
        range: std::ops::Range<usize>,
        transition: Transition,
    ) -> Result<LifecycleEvent> {
        let (Some(mutation), Some(text)) = (transition.mutation, transition.replacement) else {
            return Ok(transition.event);
        };

        let mut document = self.document.clone();
        let patch = document.apply(Cmd::ReplaceRange { range, text })?;
        debug_assert_eq!(patch.mutation, mutation);

        self.document = document;
        self.store = transition.store;
        self.record(mutation);
        self.events.push(transition.event.clone());
        Ok(transition.event)
    }

    fn record(&mut self, mutation: Mutation) {
        self.log.push_back(mutation);
        while self.log.len() > MUTATION_LOG_LIMIT {
            self.log.pop_front();
        }
    }

    /// Logged mutations based on `seq` or later, or `None` when the log no
    /// longer reaches back that far
    fn mutations_since(&self, seq: u64) -> Option<Vec<&Mutation>> {
        let current = self.store.seq();
        if seq > current {
            return None;
        }
        if seq == current {
            return Some(Vec::new());
        }

        let oldest = self.log.front()?.base();
        if oldest > seq {
            return None;
        }
        Some(
            self.log
                .iter()
                .filter(|mutation| mutation.base() >= seq)
                .collect(),
        )
    }
}
