// Source spans
//
//  Copyright (C) 2023 The synbind contributors.
//
//  This file is part of synbind.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Mapping to source input byte intervals.
//!
//! A [`Span`] is a half-open byte interval `[start, end)` within the
//!   source input that produced a raw parse tree.
//! Raw trees may or may not report intervals for their nodes;
//!   every model bound from a node that does report one is stamped with
//!   it after each fill
//!     (see [`bind`](crate::bind)).
//!
//! ```
//! use synbind::span::Span;
//!
//! let span = Span::from_byte_interval((2, 8));
//!
//! assert_eq!(2, span.start());
//! assert_eq!(8, span.end());
//! assert_eq!(6, span.len());
//!
//! // Freely copyable
//! let cp = span;
//! assert_eq!(cp, span);
//! ```
//!
//! Spans order first by their starting offset and then by their ending
//!   offset,
//!     which is the order used when sorting the elements of list fields.
//!
//! ```
//! # use synbind::span::Span;
//! // [....,....,....]
//! //    [A--]  [B-]
//! //    [C-----]
//! let a = Span::new(3, 7);
//! let b = Span::new(10, 13);
//! let c = Span::new(3, 10);
//!
//! let mut spans = vec![b, c, a];
//! spans.sort();
//!
//! assert_eq!(spans, vec![a, c, b]);
//! ```
//!
//! Models that were never stamped
//!   (because their raw node reports no interval)
//!   retain [`UNKNOWN_SPAN`],
//!     which is the zero-length span at offset `0`.

use crate::global::SourceOffset;
use std::{convert::TryInto, fmt::Display};

/// A half-open byte interval `(start, end)` as reported by a raw tree.
pub type ByteInterval = (usize, usize);

/// Half-open byte interval `[start, end)` of some bound entity.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Starting 0-indexed byte position, inclusive.
    start: SourceOffset,

    /// Ending 0-indexed byte position, exclusive.
    end: SourceOffset,
}

assert_eq_size!(Span, u64);

impl Span {
    /// Create a new span from its endpoints.
    ///
    /// If `end` precedes `start`,
    ///   the span is collapsed to zero length at `start`,
    ///     preserving `start ≤ end`.
    pub const fn new(start: SourceOffset, end: SourceOffset) -> Self {
        Self {
            start,
            end: if end < start { start } else { end },
        }
    }

    /// Create a span from a byte interval reported by a raw tree.
    ///
    /// Offsets that cannot be represented by [`SourceOffset`] are
    ///   saturated.
    pub fn from_byte_interval<B: Into<ByteInterval>>(interval: B) -> Self {
        let (start, end) = interval.into();

        Self::new(saturate(start), saturate(end))
    }

    /// Byte offset of the beginning of the span.
    pub fn start(&self) -> SourceOffset {
        self.start
    }

    /// Byte offset immediately following the end of the span.
    pub fn end(&self) -> SourceOffset {
        self.end
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> SourceOffset {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The byte interval as `usize` offsets,
    ///   suitable for slicing source text.
    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

fn saturate(offset: usize) -> SourceOffset {
    offset.try_into().unwrap_or(SourceOffset::MAX)
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<(SourceOffset, SourceOffset)> for Span {
    fn from((start, end): (SourceOffset, SourceOffset)) -> Self {
        Self::new(start, end)
    }
}

/// A placeholder span for models bound from nodes with no known source
///   interval.
pub const UNKNOWN_SPAN: Span = Span::new(0, 0);

impl Default for Span {
    fn default() -> Self {
        UNKNOWN_SPAN
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inverted_interval_collapses_to_start() {
        let span = Span::new(10, 4);

        assert_eq!(10, span.start());
        assert_eq!(10, span.end());
        assert!(span.is_empty());
    }

    #[test]
    fn oversized_interval_saturates() {
        let span =
            Span::from_byte_interval((5, SourceOffset::MAX as usize + 10));

        assert_eq!(5, span.start());
        assert_eq!(SourceOffset::MAX, span.end());
    }

    #[test]
    fn merge_covers_both() {
        let a = Span::new(4, 6);
        let b = Span::new(1, 3);

        assert_eq!(Span::new(1, 6), a.merge(b));
        assert_eq!(Span::new(1, 6), b.merge(a));
    }

    #[test]
    fn display_half_open() {
        assert_eq!("[3, 9)", Span::new(3, 9).to_string());
    }
}
