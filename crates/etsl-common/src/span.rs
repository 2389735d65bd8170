//! Source spans.
//!
//! A `Span` is a half-open byte range `[start, end)` into the source text of a
//! unit. Nodes synthesized by lowering passes carry either the span of the node
//! they replace or a zero-width span at the start of the declaration they were
//! derived from, so that later diagnostics still point somewhere meaningful.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Zero-width span anchored at `pos`.
    #[inline]
    #[must_use]
    pub const fn at(pos: u32) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Zero-width span at the start of this span.
    #[inline]
    #[must_use]
    pub const fn start_point(self) -> Self {
        Self::at(self.start)
    }
}
