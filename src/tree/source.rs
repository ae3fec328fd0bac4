// Owned raw trees
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

//! An owned raw tree with synthesized source text.
//!
//! [`SourceTree`] is the simplest possible [`RawTree`]:
//!   it is built by hand
//!     (or [loaded from XML](super::xml))
//!   rather than produced by a grammar-based parser.
//! As terminals are added,
//!   their text is appended to a synthesized source string separated by
//!   single spaces,
//!     and each node is given the interval it covers within that string.
//! This gives trees built for tests and tooling the same shape as trees
//!   produced by a real parser:
//!     terminals with text,
//!     non-terminals whose text is the covering substring,
//!     and intervals that order nodes by position.
//!
//! ```
//! use synbind::tree::{RawTree, SourceTree};
//!
//! let tree = SourceTree::build("selectStmt", |b| {
//!     b.rule("columnList", |b| {
//!         b.leaf("columnRef", "a");
//!         b.leaf("columnRef", "b");
//!     });
//!     b.leaf("columnRef", "c");
//! });
//!
//! assert_eq!("a b c", tree.source());
//! assert_eq!(Some((0, 5)), tree.interval(&tree.root()));
//! ```

use super::RawTree;
use crate::span::ByteInterval;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceNode {
    name: String,
    text: Option<String>,
    children: Vec<usize>,
    interval: Option<ByteInterval>,
}

/// Owned raw tree built from rule names and terminal text.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    source: String,
    nodes: Vec<SourceNode>,
}

impl SourceTree {
    /// Begin building a tree whose root is the rule `root`.
    pub fn builder<S: Into<String>>(root: S) -> SourceTreeBuilder {
        let mut builder = SourceTreeBuilder {
            source: String::new(),
            nodes: Vec::new(),
            open: Vec::new(),
        };

        builder.open(root);
        builder
    }

    /// Build a tree rooted at the rule `root` whose children are added by
    ///   `f`.
    pub fn build<S, F>(root: S, f: F) -> Self
    where
        S: Into<String>,
        F: FnOnce(&mut SourceTreeBuilder),
    {
        let mut builder = Self::builder(root);
        f(&mut builder);
        builder.finish()
    }

    /// Synthesized source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl RawTree for SourceTree {
    type Node = usize;

    fn root(&self) -> usize {
        0
    }

    fn name(&self, node: &usize) -> Cow<'_, str> {
        Cow::Borrowed(&self.nodes[*node].name)
    }

    fn children(&self, node: &usize) -> Vec<usize> {
        self.nodes[*node].children.clone()
    }

    fn leaf_text(&self, node: &usize) -> Option<Cow<'_, str>> {
        self.nodes[*node].text.as_deref().map(Cow::Borrowed)
    }

    fn interval(&self, node: &usize) -> Option<ByteInterval> {
        self.nodes[*node].interval
    }

    fn source_text(&self, (start, end): ByteInterval) -> Option<Cow<'_, str>> {
        self.source.get(start..end).map(Cow::Borrowed)
    }
}

/// Incremental construction of a [`SourceTree`].
///
/// Rules are opened and closed in a stack discipline;
///   [`SourceTreeBuilder::finish`] closes any rules left open.
#[derive(Debug)]
pub struct SourceTreeBuilder {
    source: String,
    nodes: Vec<SourceNode>,
    open: Vec<usize>,
}

impl SourceTreeBuilder {
    fn push(&mut self, node: SourceNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);

        if let Some(&parent) = self.open.last() {
            self.nodes[parent].children.push(index);
        }

        index
    }

    /// Open a non-terminal as a child of the innermost open rule.
    pub fn open<S: Into<String>>(&mut self, name: S) -> &mut Self {
        let index = self.push(SourceNode {
            name: name.into(),
            text: None,
            children: vec![],
            interval: None,
        });

        self.open.push(index);
        self
    }

    /// Close the innermost open rule,
    ///   computing its interval from those of its children.
    ///
    /// The root is never closed by this method;
    ///   see [`Self::finish`].
    pub fn close(&mut self) -> &mut Self {
        if self.open.len() > 1 {
            if let Some(index) = self.open.pop() {
                self.close_node(index);
            }
        }

        self
    }

    fn close_node(&mut self, index: usize) {
        let interval = self.nodes[index]
            .children
            .iter()
            .filter_map(|&child| self.nodes[child].interval)
            .reduce(|(start, _), (_, end)| (start, end));

        self.nodes[index].interval = interval;
    }

    /// Add a non-terminal whose children are added by `f`.
    pub fn rule<S, F>(&mut self, name: S, f: F) -> &mut Self
    where
        S: Into<String>,
        F: FnOnce(&mut Self),
    {
        self.open(name);
        f(self);
        self.close()
    }

    /// Add a terminal,
    ///   appending its text to the synthesized source.
    pub fn leaf<S: Into<String>, T: Into<String>>(
        &mut self,
        name: S,
        text: T,
    ) -> &mut Self {
        let text = text.into();

        if !self.source.is_empty() && !text.is_empty() {
            self.source.push(' ');
        }

        let start = self.source.len();
        self.source.push_str(&text);

        self.push(SourceNode {
            name: name.into(),
            interval: Some((start, self.source.len())),
            text: Some(text),
            children: vec![],
        });

        self
    }

    /// Close all open rules and yield the tree.
    pub fn finish(mut self) -> SourceTree {
        while let Some(index) = self.open.pop() {
            self.close_node(index);
        }

        SourceTree {
            source: self.source,
            nodes: self.nodes,
        }
    }
}
