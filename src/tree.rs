// Raw parse tree views
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

//! Read-only view over an externally owned raw parse tree.
//!
//! A grammar-based parser produces a [`RawTree`] that this system does not
//!   own and must never modify.
//! [`TreeView`] wraps it in a uniform navigable shape:
//!   every node gets a dense [`NodeId`],
//!   a cached name,
//!   a lazily materialized child list,
//!   a lazily computed text,
//!   a memo slot for the model bound to it,
//!   and a flat user-data map.
//!
//! Nodes are materialized on demand;
//!   the only node that exists when a view is created is its root.
//! Asking for the children of a node materializes the entire child list
//!   of that node exactly once.
//! Because of this,
//!   [`NodeId`]s reflect materialization order,
//!     _not_ document order;
//!   use [`Navigate::sort_document_order`] when document order matters.
//!
//! Searching
//! =========
//! Three descendant searches are provided,
//!   and they are deliberately different:
//!
//!   - [`TreeView::find_first_descendant_by_name`] yields the first
//!       matching descendant in document order and stops globally;
//!   - [`TreeView::find_descendant_layer_by_name`] yields every matching
//!       descendant that is not itself beneath a match,
//!         stopping expansion of a branch at its first match but
//!         continuing to explore sibling branches; and
//!   - [`TreeView::find_all_descendants_by_name`] yields every match with
//!       no early stop at all.
//!
//! All three walk the tree using an explicit stack rather than recursion,
//!   pushing children in reverse so that they pop left-to-right,
//!   and so are safe for arbitrarily deep trees.
//!
//! Concurrency
//! ===========
//! A view is single-writer:
//!   its node arena,
//!   model memos and user data use unsynchronized interior mutability.
//! It is therefore neither [`Sync`] nor intended to be shared between
//!   concurrent binding passes.

mod source;
pub mod xml;

pub use source::{SourceTree, SourceTreeBuilder};

use crate::{
    global::NodeIdSize,
    model::AnyBound,
    span::{ByteInterval, Span},
};
use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use std::{
    any::Any,
    borrow::Cow,
    cell::RefCell,
    convert::TryInto,
    fmt::{self, Display},
    rc::Rc,
};

/// A raw parse tree produced by an external parser.
///
/// This is the only interface through which the raw tree is accessed,
///   and it is strictly read-only.
/// Node handles are cheap clones
///   (typically an index or a reference).
pub trait RawTree {
    /// Handle to a single raw node.
    type Node: Clone;

    /// The root of the tree.
    fn root(&self) -> Self::Node;

    /// Rule name of a non-terminal,
    ///   or token type name of a terminal.
    fn name(&self, node: &Self::Node) -> Cow<'_, str>;

    /// Children of a node in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Text of a terminal (leaf) node,
    ///   or [`None`] if the node is not a terminal.
    fn leaf_text(&self, node: &Self::Node) -> Option<Cow<'_, str>>;

    /// Global byte interval `[start, end)` covered by a node,
    ///   if known.
    fn interval(&self, node: &Self::Node) -> Option<ByteInterval>;

    /// Source substring covering the given interval,
    ///   if the source is available.
    fn source_text(&self, interval: ByteInterval) -> Option<Cow<'_, str>>;
}

impl<T: RawTree + ?Sized> RawTree for &T {
    type Node = T::Node;

    fn root(&self) -> Self::Node {
        (**self).root()
    }

    fn name(&self, node: &Self::Node) -> Cow<'_, str> {
        (**self).name(node)
    }

    fn children(&self, node: &Self::Node) -> Vec<Self::Node> {
        (**self).children(node)
    }

    fn leaf_text(&self, node: &Self::Node) -> Option<Cow<'_, str>> {
        (**self).leaf_text(node)
    }

    fn interval(&self, node: &Self::Node) -> Option<ByteInterval> {
        (**self).interval(node)
    }

    fn source_text(&self, interval: ByteInterval) -> Option<Cow<'_, str>> {
        (**self).source_text(interval)
    }
}

/// Dense identifier of a node materialized within a [`TreeView`].
///
/// Identifiers are only meaningful for the view that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NodeIdSize);

impl NodeId {
    /// Index of this node within its view's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Self(index.try_into().unwrap_or_else(|_| {
            panic!("tree view exceeds global::NodeIdSize nodes")
        }))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Minimal read-only navigation used by the query evaluator.
///
/// This is intentionally far smaller than a document object model:
///   there are no attributes,
///   no namespaces,
///   and no mutation.
/// Every node is named;
///   terminals are distinguished by [`Navigate::is_leaf`] and are what the
///   `text()` node test selects.
pub trait Navigate {
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Rc<[NodeId]>;
    fn name(&self, node: NodeId) -> Rc<str>;

    /// String value of a node:
    ///   the text of a terminal,
    ///   or the source text covered by a non-terminal.
    fn text(&self, node: NodeId) -> Rc<str>;

    fn is_leaf(&self, node: NodeId) -> bool;

    /// Position of a node among its siblings.
    fn sibling_index(&self, node: NodeId) -> usize;

    /// Walk the parent chain to the parentless root.
    fn root_of(&self, node: NodeId) -> NodeId {
        let mut cur = node;

        while let Some(parent) = self.parent(cur) {
            cur = parent;
        }

        cur
    }

    /// Sibling indexes from the root down to `node`,
    ///   which compare lexicographically in document order.
    fn document_order_key(&self, node: NodeId) -> Vec<usize> {
        let mut key = Vec::new();
        let mut cur = node;

        while let Some(parent) = self.parent(cur) {
            key.push(self.sibling_index(cur));
            cur = parent;
        }

        key.reverse();
        key
    }

    /// Sort nodes into document order.
    fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        nodes.sort_by_cached_key(|&node| self.document_order_key(node));
    }
}

/// A set of nodes that remembers insertion order.
///
/// Membership is tracked in a bitset indexed by [`NodeId`],
///   which is dense within a view.
#[derive(Debug, Default, Clone)]
pub struct NodeSet {
    seen: FixedBitSet,
    nodes: Vec<NodeId>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node,
    ///   returning whether it was not already present.
    pub fn insert(&mut self, node: NodeId) -> bool {
        let i = node.index();

        if i >= self.seen.len() {
            self.seen.grow(i + 1);
        }

        if self.seen.put(i) {
            false
        } else {
            self.nodes.push(node);
            true
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.seen.contains(node.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn into_vec(self) -> Vec<NodeId> {
        self.nodes
    }
}

struct NodeData<N> {
    raw: N,
    parent: Option<NodeId>,
    index: usize,
    name: Rc<str>,
    leaf: bool,
    children: Option<Rc<[NodeId]>>,
    text: Option<Rc<str>>,
    model: Option<Rc<dyn AnyBound>>,
    filling: bool,
    user_data: FxHashMap<String, Rc<dyn Any>>,
}

/// Read-only,
///   lazily materialized view over a [`RawTree`].
///
/// See the [module-level documentation](self) for more information.
pub struct TreeView<R: RawTree> {
    raw: R,
    nodes: RefCell<Vec<NodeData<R::Node>>>,
}

impl<R: RawTree> TreeView<R> {
    /// Wrap a raw tree,
    ///   materializing only its root.
    pub fn new(raw: R) -> Self {
        let root = raw.root();
        let data = Self::node_data(&raw, root, None, 0);

        Self {
            raw,
            nodes: RefCell::new(vec![data]),
        }
    }

    fn node_data(
        raw: &R,
        node: R::Node,
        parent: Option<NodeId>,
        index: usize,
    ) -> NodeData<R::Node> {
        NodeData {
            name: raw.name(&node).into(),
            leaf: raw.leaf_text(&node).is_some(),
            raw: node,
            parent,
            index,
            children: None,
            text: None,
            model: None,
            filling: false,
            user_data: Default::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The wrapped raw tree.
    pub fn raw_tree(&self) -> &R {
        &self.raw
    }

    /// Raw node handle underlying `node`.
    pub fn raw(&self, node: NodeId) -> R::Node {
        self.nodes.borrow()[node.index()].raw.clone()
    }

    /// Number of nodes materialized so far.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn name(&self, node: NodeId) -> Rc<str> {
        self.nodes.borrow()[node.index()].name.clone()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.index()].parent
    }

    /// Position of `node` among its siblings.
    pub fn sibling_index(&self, node: NodeId) -> usize {
        self.nodes.borrow()[node.index()].index
    }

    /// Whether `node` is a terminal.
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes.borrow()[node.index()].leaf
    }

    /// Children of `node` in document order.
    ///
    /// The first request materializes the entire child list;
    ///   subsequent requests return the cached list.
    pub fn children(&self, node: NodeId) -> Rc<[NodeId]> {
        if let Some(children) = &self.nodes.borrow()[node.index()].children {
            return children.clone();
        }

        let raw_children = self.raw.children(&self.raw(node));
        let data = raw_children
            .into_iter()
            .enumerate()
            .map(|(i, child)| Self::node_data(&self.raw, child, Some(node), i))
            .collect::<Vec<_>>();

        let mut nodes = self.nodes.borrow_mut();
        let first = nodes.len();
        nodes.extend(data);

        let ids: Rc<[NodeId]> =
            (first..nodes.len()).map(NodeId::from_index).collect();

        nodes[node.index()].children = Some(ids.clone());
        ids
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.sibling_index(node);

        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.sibling_index(node);

        self.children(parent).get(index + 1).copied()
    }

    /// Source interval of `node`,
    ///   if the raw tree reports one.
    pub fn interval(&self, node: NodeId) -> Option<Span> {
        self.raw.interval(&self.raw(node)).map(Span::from_byte_interval)
    }

    /// Text of `node`.
    ///
    /// Terminals yield their own text.
    /// Non-terminals yield the source substring covering their first
    ///   through last terminals;
    ///     if the raw tree cannot provide source text,
    ///     the texts of all terminals are concatenated instead.
    pub fn text(&self, node: NodeId) -> Rc<str> {
        if let Some(text) = &self.nodes.borrow()[node.index()].text {
            return text.clone();
        }

        let text: Rc<str> = self.compute_text(&self.raw(node)).into();
        self.nodes.borrow_mut()[node.index()].text = Some(text.clone());
        text
    }

    fn compute_text(&self, node: &R::Node) -> String {
        if let Some(text) = self.raw.leaf_text(node) {
            return text.into_owned();
        }

        let edge_leaf = |pick_last: bool| {
            let mut cur = node.clone();

            loop {
                let children = self.raw.children(&cur);
                let next = if pick_last {
                    children.last()
                } else {
                    children.first()
                };

                match next {
                    Some(child) => cur = child.clone(),
                    None => break cur,
                }
            }
        };

        let first = self.raw.interval(&edge_leaf(false));
        let last = self.raw.interval(&edge_leaf(true));

        if let (Some((start, _)), Some((_, end))) = (first, last) {
            if let Some(text) = self.raw.source_text((start, end.max(start))) {
                return text.into_owned();
            }
        }

        self.concat_leaf_text(node)
    }

    fn concat_leaf_text(&self, node: &R::Node) -> String {
        let mut out = String::new();
        let mut stack = vec![node.clone()];

        while let Some(cur) = stack.pop() {
            if let Some(text) = self.raw.leaf_text(&cur) {
                out.push_str(&text);
            } else {
                stack.extend(self.raw.children(&cur).into_iter().rev());
            }
        }

        out
    }

    /// Path of rule names from the root to `node`,
    ///   separated by `/`.
    pub fn full_path_name(&self, node: NodeId) -> String {
        let mut names = vec![self.name(node)];
        let mut cur = node;

        while let Some(parent) = self.parent(cur) {
            names.push(self.name(parent));
            cur = parent;
        }

        names.iter().rev().fold(String::new(), |mut acc, name| {
            acc.push('/');
            acc.push_str(name);
            acc
        })
    }

    /// The first descendant of `node` in document order named `name`.
    ///
    /// The search stops globally at the first match.
    /// `node` itself is not considered.
    pub fn find_first_descendant_by_name(
        &self,
        node: NodeId,
        name: &str,
    ) -> Option<NodeId> {
        let mut stack = self.children(node).iter().rev().copied().collect::<Vec<_>>();

        while let Some(cur) = stack.pop() {
            if &*self.name(cur) == name {
                return Some(cur);
            }

            stack.extend(self.children(cur).iter().rev());
        }

        None
    }

    /// Every descendant of `node` named `name` that is not beneath another
    ///   match.
    ///
    /// Expansion of a branch stops at its first match,
    ///   but sibling branches continue to be explored.
    /// Results are in traversal order.
    /// `node` itself is not considered.
    pub fn find_descendant_layer_by_name(
        &self,
        node: NodeId,
        name: &str,
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = self.children(node).iter().rev().copied().collect::<Vec<_>>();

        while let Some(cur) = stack.pop() {
            if &*self.name(cur) == name {
                found.push(cur);
            } else {
                stack.extend(self.children(cur).iter().rev());
            }
        }

        found
    }

    /// Every descendant of `node` named `name` in document order,
    ///   or every descendant at all if `name` is `*`.
    ///
    /// There is no early stop;
    ///   matches beneath matches are included.
    pub fn find_all_descendants_by_name(
        &self,
        node: NodeId,
        name: &str,
    ) -> Vec<NodeId> {
        let any = name == "*";
        let mut found = Vec::new();
        let mut stack = self.children(node).iter().rev().copied().collect::<Vec<_>>();

        while let Some(cur) = stack.pop() {
            if any || &*self.name(cur) == name {
                found.push(cur);
            }

            stack.extend(self.children(cur).iter().rev());
        }

        found
    }

    /// Value stored under `key` for `node`.
    pub fn user_data(&self, node: NodeId, key: &str) -> Option<Rc<dyn Any>> {
        self.nodes.borrow()[node.index()].user_data.get(key).cloned()
    }

    /// Store `value` under `key` for `node`,
    ///   returning any value it replaced.
    pub fn set_user_data(
        &self,
        node: NodeId,
        key: impl Into<String>,
        value: Rc<dyn Any>,
    ) -> Option<Rc<dyn Any>> {
        self.nodes.borrow_mut()[node.index()]
            .user_data
            .insert(key.into(), value)
    }

    /// Model memoized on `node`,
    ///   if any.
    pub(crate) fn model(&self, node: NodeId) -> Option<Rc<dyn AnyBound>> {
        self.nodes.borrow()[node.index()].model.clone()
    }

    /// Memoize a model on `node`.
    ///
    /// A node binds to at most one model;
    ///   callers must check [`Self::model`] first.
    pub(crate) fn set_model(&self, node: NodeId, model: Rc<dyn AnyBound>) {
        let mut nodes = self.nodes.borrow_mut();
        let slot = &mut nodes[node.index()].model;

        debug_assert!(slot.is_none(), "node {node} already has a model");
        slot.get_or_insert(model);
    }

    /// Mark `node` as being filled,
    ///   returning `false` if it already was.
    pub(crate) fn begin_fill(&self, node: NodeId) -> bool {
        let mut nodes = self.nodes.borrow_mut();

        !std::mem::replace(&mut nodes[node.index()].filling, true)
    }

    pub(crate) fn end_fill(&self, node: NodeId) {
        self.nodes.borrow_mut()[node.index()].filling = false;
    }
}

impl<R: RawTree> Navigate for TreeView<R> {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        TreeView::parent(self, node)
    }

    fn children(&self, node: NodeId) -> Rc<[NodeId]> {
        TreeView::children(self, node)
    }

    fn name(&self, node: NodeId) -> Rc<str> {
        TreeView::name(self, node)
    }

    fn text(&self, node: NodeId) -> Rc<str> {
        TreeView::text(self, node)
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        TreeView::is_leaf(self, node)
    }

    fn sibling_index(&self, node: NodeId) -> usize {
        TreeView::sibling_index(self, node)
    }
}

#[cfg(test)]
mod test;
