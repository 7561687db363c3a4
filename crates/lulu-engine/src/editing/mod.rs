/*!
 * # Suggestion Position Tracking
 *
 * Keeps AI edit suggestions attached to the right text while the writer
 * keeps editing the manuscript.
 *
 * ## Architecture Overview
 *
 * ### 1. Mutations Describe Every Edit
 * - An edit is a **`Mutation`**: an ordered list of **`Splice`**s (position,
 *   deleted length, inserted length) plus the sequence number it is based on
 * - Writer edits are `Cmd`s applied to an xi-rope `Document`; the resulting
 *   delta is translated into a mutation
 * - Accepting a suggestion emits a mutation of its own
 *
 * ### 2. The Store Owns the Positions
 * - **`SuggestionStore`** is the single owner of suggestion anchors
 * - Snapshots are immutable; every operation returns a new one
 * - A mutation is applied to a snapshot at most once, enforced by comparing
 *   its base with the snapshot's sequence number
 *
 * ### 3. Rendering Is Derived
 * - **`DecorationSet`**s are rebuilt from the live suggestions and the text
 *   after every change and are never fed back as input
 * - Anchors that no longer match their text are re-found by searching, or
 *   reported as orphaned
 *
 * ### 4. One Way In for External Batches
 * - `merge_external` adds unknown suggestions and refreshes the wording of
 *   known ones, but never moves an anchor the store already tracks
 *
 * ## Module Structure
 *
 * - **`mutation`**: `Splice`, `Mutation` and the position mapper
 * - **`suggestion`**: `Suggestion`, its id, edit type, source and state
 * - **`store`**: the immutable `SuggestionStore`
 * - **`protocol`**: accept, revise and reject transitions
 * - **`sync`**: the external merge bridge
 * - **`decorations`**: derived render spans, layers and badges
 * - **`document`**, **`commands`**, **`patch`**: the xi-rope manuscript buffer
 * - **`session`**: document and store kept in step, late batches, resync
 *
 * ## Usage Pattern
 *
 * ```rust
 * use lulu_engine::editing::*;
 *
 * let document = Document::from_bytes(b"What quick bold fox").unwrap();
 * let mut session = Session::new(document, StoreSettings::default());
 *
 * let quick = Suggestion::new(5..10, "quick", "fast");
 * let fox = Suggestion::new(16..19, "fox", "cat");
 * let (quick_id, fox_id) = (quick.id, fox.id);
 * session.add_suggestions(vec![quick, fox]).unwrap();
 *
 * session.accept(quick_id).unwrap();
 *
 * assert_eq!(session.document().text(), "What fast bold fox");
 * assert_eq!(session.store().get(fox_id).unwrap().anchor, 15..18);
 * ```
 */

pub mod commands;
pub mod decorations;
pub mod document;
pub mod mutation;
pub mod patch;
pub mod protocol;
pub mod session;
pub mod store;
pub mod suggestion;
pub mod sync;

pub use commands::Cmd;
pub use decorations::{
    Decoration, DecorationSet, Overlap, Palette, Resolution, build_decorations,
    format_decorations,
};
pub use document::Document;
pub use mutation::{Mutation, Splice, map_position};
pub use patch::Patch;
pub use protocol::{LifecycleEvent, Transition};
pub use session::{FetchTicket, MUTATION_LOG_LIMIT, Session};
pub use store::{DEFAULT_HISTORY_LIMIT, StoreOp, StoreSettings, SuggestionStore};
pub use suggestion::{
    EditType, Suggestion, SuggestionId, SuggestionPatch, SuggestionSource, SuggestionState,
};
pub use sync::MergeSummary;
