// Schema-driven parse tree binding
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

//! Schema-driven binding of parse trees into typed syntax models.
//!
//! A grammar-based parser produces a raw parse tree that is owned
//!   elsewhere and is read-only to this crate.
//! Rather than walking that tree by hand,
//!   each model type declares which grammar rule it corresponds to and
//!   how each of its fields is computed from the tree,
//!     using [XPath 1.0](xpath) queries evaluated relative to the node
//!     being bound.
//!
//! The system is composed of the following layers:
//!
//!   - [`tree`] adapts any [`tree::RawTree`] into a navigable
//!       [`tree::TreeView`] with per-node user data;
//!   - [`xpath`] compiles and evaluates queries against a view,
//!       caching compiled queries by their text;
//!   - [`model`] is the declaration API implemented by model types
//!       ([`model::SyntaxNode`]) and enumerations
//!       ([`model::SyntaxLiteral`]);
//!   - [`registry`] discovers every type reachable from an entry type
//!       and validates its declarations into a [`registry::SyntaxModel`];
//!   - [`bind`] fills models from a tree according to that schema,
//!       memoizing one model per node; and
//!   - [`stringify`] renders bound models for inspection.
//!
//! Errors throughout the system implement [`diagnose::Diagnostic`].
//! Binding passes can be traced to stderr using the
//!   `bind-trace-stderr` feature
//!   (see [`trace`]).

// We build docs for private items.
#![allow(rustdoc::private_intra_doc_links)]

pub mod global;

#[macro_use]
extern crate static_assertions;

pub mod bind;
pub mod diagnose;
pub mod model;
pub mod registry;
pub mod span;
pub mod stringify;
pub mod trace;
pub mod tree;
pub mod xpath;
