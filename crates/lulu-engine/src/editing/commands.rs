use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::Document;
use crate::error::MutationError;

/// Commands that can be applied to the document
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        at: usize,
        text: String,
    },
    DeleteRange {
        range: std::ops::Range<usize>,
    },
    ReplaceRange {
        range: std::ops::Range<usize>,
        text: String,
    },
}

impl Cmd {
    /// Byte range of the current document the command replaces
    pub fn target(&self) -> std::ops::Range<usize> {
        match self {
            Cmd::InsertText { at, .. } => *at..*at,
            Cmd::DeleteRange { range } | Cmd::ReplaceRange { range, .. } => range.clone(),
        }
    }
}

/// Check that a command addresses valid character boundaries of the document
pub(crate) fn check_command(doc: &Document, cmd: &Cmd) -> Result<(), MutationError> {
    let target = cmd.target();
    let len = doc.len();

    if target.start > target.end || target.end > len {
        return Err(MutationError::OutOfBounds {
            index: 0,
            at: target.start,
            deleted_len: target.end.saturating_sub(target.start),
            len,
        });
    }

    let text = doc.text();
    for at in [target.start, target.end] {
        if !text.is_char_boundary(at) {
            return Err(MutationError::NotCharBoundary { at });
        }
    }

    Ok(())
}

/// Compile a command into a delta
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Delta<RopeInfo> {
    let mut builder = Builder::new(doc.len());
    match cmd {
        Cmd::InsertText { at, text } => {
            builder.replace(*at..*at, Rope::from(text));
        }
        Cmd::DeleteRange { range } => {
            builder.delete(range.clone());
        }
        Cmd::ReplaceRange { range, text } => {
            builder.replace(range.clone(), Rope::from(text));
        }
    }
    builder.build()
}
