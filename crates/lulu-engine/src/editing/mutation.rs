//! # Range Mapper
//!
//! A [`Mutation`] is the only description of a document change the
//! suggestion core ever sees: an ordered list of [`Splice`]s plus the
//! sequence number of the document state it transforms from.
//!
//! Splices are applied left to right, each one expressed in the coordinates
//! produced by the splice before it. Mapping a position through a mutation
//! is therefore a single fold over the splices and never touches a splice
//! twice.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use xi_rope::delta::DeltaElement;
use xi_rope::{Delta, RopeInfo};

use crate::error::MutationError;

/// One contiguous change: `deleted_len` bytes removed at `at`, then
/// `inserted_len` bytes inserted at the same offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splice {
    pub at: usize,
    pub deleted_len: usize,
    pub inserted_len: usize,
}

impl Splice {
    pub fn insert(at: usize, inserted_len: usize) -> Self {
        Self {
            at,
            deleted_len: 0,
            inserted_len,
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            at: range.start,
            deleted_len: range.len(),
            inserted_len: 0,
        }
    }

    pub fn replace(range: Range<usize>, inserted_len: usize) -> Self {
        Self {
            at: range.start,
            deleted_len: range.len(),
            inserted_len,
        }
    }

    /// Map a position through this splice.
    ///
    /// Positions at or before `at` stay put, positions at or after the end of
    /// the deleted span shift by the length difference, and positions strictly
    /// inside the deleted span collapse to `at`.
    pub fn map(&self, pos: usize) -> usize {
        if pos <= self.at {
            pos
        } else if pos >= self.at + self.deleted_len {
            pos - self.deleted_len + self.inserted_len
        } else {
            self.at
        }
    }
}

/// An ordered set of splices describing one document change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    base: u64,
    splices: Vec<Splice>,
}

impl Mutation {
    /// Create a mutation that transforms the document state `base`
    pub fn new(base: u64, splices: Vec<Splice>) -> Self {
        Self { base, splices }
    }

    pub fn single(base: u64, splice: Splice) -> Self {
        Self::new(base, vec![splice])
    }

    /// Sequence number of the document state this mutation starts from
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn splices(&self) -> &[Splice] {
        &self.splices
    }

    /// Check the splices against a document of `len` bytes and return the
    /// length after the mutation
    pub fn validate(&self, len: usize) -> Result<usize, MutationError> {
        let mut len = len;
        let mut previous: Option<usize> = None;

        for (index, splice) in self.splices.iter().enumerate() {
            if let Some(previous) = previous
                && splice.at < previous
            {
                return Err(MutationError::OutOfOrder {
                    index,
                    at: splice.at,
                    previous,
                });
            }
            let out_of_bounds = MutationError::OutOfBounds {
                index,
                at: splice.at,
                deleted_len: splice.deleted_len,
                len,
            };
            match splice.at.checked_add(splice.deleted_len) {
                Some(end) if end <= len => {}
                _ => return Err(out_of_bounds),
            }
            len = (len - splice.deleted_len)
                .checked_add(splice.inserted_len)
                .ok_or(out_of_bounds)?;
            previous = Some(splice.at);
        }

        Ok(len)
    }

    pub fn map_position(&self, pos: usize) -> usize {
        self.splices.iter().fold(pos, |pos, splice| splice.map(pos))
    }

    /// Map both ends of a range. Mapping is monotonic, so the result is never
    /// inverted; a range swallowed by a deletion comes back empty.
    pub fn map_range(&self, range: &Range<usize>) -> Range<usize> {
        self.map_position(range.start)..self.map_position(range.end)
    }

    /// Translate an xi-rope delta into splices.
    ///
    /// Deltas describe the new document as copies from the old one plus
    /// inserted text; a gap between copies is a deletion. An insertion that is
    /// directly followed by a deletion is folded into one replacing splice.
    pub fn from_delta(base: u64, delta: &Delta<RopeInfo>) -> Self {
        let mut splices = Vec::new();
        let mut old_pos = 0;
        let mut new_pos = 0;
        let mut pending: Option<Splice> = None;

        for element in &delta.els {
            match element {
                DeltaElement::Copy(from, to) => {
                    let deleted_len = from.saturating_sub(old_pos);
                    flush(&mut splices, pending.take(), new_pos, deleted_len);
                    old_pos = *to;
                    new_pos += to - from;
                }
                DeltaElement::Insert(node) => {
                    let inserted_len = node.len();
                    match pending.as_mut() {
                        Some(splice) => splice.inserted_len += inserted_len,
                        None => pending = Some(Splice::insert(new_pos, inserted_len)),
                    }
                    new_pos += inserted_len;
                }
            }
        }

        let trailing = delta.base_len.saturating_sub(old_pos);
        flush(&mut splices, pending.take(), new_pos, trailing);

        Self { base, splices }
    }
}

fn flush(splices: &mut Vec<Splice>, pending: Option<Splice>, at: usize, deleted_len: usize) {
    match pending {
        Some(mut splice) => {
            splice.deleted_len = deleted_len;
            if splice.deleted_len > 0 || splice.inserted_len > 0 {
                splices.push(splice);
            }
        }
        None if deleted_len > 0 => splices.push(Splice {
            at,
            deleted_len,
            inserted_len: 0,
        }),
        None => {}
    }
}

/// Map `pos` through `mutation`
pub fn map_position(pos: usize, mutation: &Mutation) -> usize {
    mutation.map_position(pos)
}
