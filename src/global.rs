// Global constants across the entire system
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

//! System-wide static configuration.
//!
//! This module provides a system-wide configuration.
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities or maintenance issues as requirements
//!   change.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature and risk.

/// A size capable of representing any byte offset within a single source
///   input handed to the parser that produced a raw tree.
///
/// Intervals reported by raw trees are converted into this size when
///   stamped onto bound models;
///     offsets exceeding it are saturated.
pub type SourceOffset = u32;

/// A size capable of representing the index of any node materialized
///   within a single [`TreeView`](crate::tree::TreeView).
///
/// This must be ≥ the number of nodes in the largest tree that will be
///   bound in a single pass.
pub type NodeIdSize = u32;

/// Maximum number of arguments accepted by any query function call.
///
/// This exists only to catch runaway argument lists in schema queries;
///   no core or extension function comes anywhere near it.
pub const MAX_FN_ARGS: usize = 64;
