use xi_rope::Rope;
use xi_rope::delta::DeltaElement;

use crate::editing::{Cmd, Mutation, Patch};
use crate::error::MutationError;

/// Manuscript buffer owned by the editor integration
///
/// The suggestion core never stores document text of its own; it only sees
/// the [`Mutation`] each edit produces. `Document` is the thin adapter that
/// turns edit commands into xi-rope deltas and those deltas into mutations.
///
/// ```rust
/// # use lulu_engine::editing::{Document, Cmd};
/// let mut doc = Document::from_bytes(b"What quick bold fox").unwrap();
///
/// let patch = doc
///     .apply(Cmd::InsertText { at: 0, text: "So ".to_string() })
///     .unwrap();
///
/// assert_eq!(patch.version, 1);
/// assert_eq!(patch.mutation.map_position(5), 8);
/// assert_eq!(doc.text(), "So What quick bold fox");
/// ```
#[derive(Clone)]
pub struct Document {
    /// xi-rope buffer containing the entire document as UTF-8
    pub(crate) buffer: Rope,
    /// Current selection/cursor position as byte offsets in buffer
    pub(crate) selection: std::ops::Range<usize>,
    /// Incremented on each edit; mutations are based on it
    pub(crate) version: u64,
}

impl Document {
    /// Create a new document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);
        let len = buffer.len();

        Ok(Self {
            buffer,
            selection: len..len,
            version: 0,
        })
    }

    /// Get the document's content as raw bytes (exact round-trip)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Apply a command and describe it as a mutation against the previous
    /// version
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, MutationError> {
        crate::editing::commands::check_command(self, &cmd)?;

        let delta = crate::editing::commands::compile_command(self, &cmd);
        let mutation = Mutation::from_delta(self.version, &delta);

        // Track inserted ranges for the patch
        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                DeltaElement::Copy(from, to) => {
                    cursor += to - from;
                }
                DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    let end = cursor + inserted.len();
                    changed.push(start..end);
                    cursor = end;
                }
            }
        }

        self.buffer = delta.apply(&self.buffer);

        let new_selection = match &cmd {
            Cmd::InsertText { at, text } if self.selection == (*at..*at) => {
                let caret = at + text.len();
                caret..caret
            }
            _ => mutation.map_range(&self.selection),
        };
        self.selection = new_selection.clone();
        self.version += 1;

        log::debug!(
            "applied {:?} at version {}: {} splices",
            cmd.target(),
            self.version,
            mutation.splices().len()
        );

        Ok(Patch {
            changed,
            new_selection,
            version: self.version,
            mutation,
        })
    }

    pub fn selection(&self) -> std::ops::Range<usize> {
        self.selection.clone()
    }

    pub fn set_selection(&mut self, selection: std::ops::Range<usize>) {
        let len = self.len();
        let start = selection.start.min(len);
        let end = selection.end.min(len).max(start);
        self.selection = start..end;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // Rope has no PartialEq; compare content
        self.buffer.to_string() == other.buffer.to_string()
            && self.selection == other.selection
            && self.version == other.version
    }
}
