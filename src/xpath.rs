// Tree queries
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

//! Tree queries.
//!
//! Queries are written in XPath 1.0 and evaluated against any tree that
//!   can be [navigated](Navigate),
//!     most notably a [`TreeView`](crate::tree::TreeView).
//! Every node of such a tree is an element named by its grammar rule;
//!   there are no attributes,
//!     no namespaces,
//!     and terminals are the nodes selected by `text()`.
//!
//! A query is first compiled into a [`Query`],
//!   which resolves all function names against a [`FunctionLibrary`].
//! Compilation is comparatively expensive,
//!   and a schema may evaluate the same query text many thousands of
//!   times,
//!     so compiled queries are memoized by their text in a
//!     [`QueryCache`]:
//!
//! ```
//! use synbind::tree::{SourceTree, TreeView};
//! use synbind::xpath::{QueryCache, Value};
//!
//! let tree = SourceTree::build("select", |b| {
//!     b.leaf("columnRef", "a");
//!     b.leaf("columnRef", "b");
//! });
//!
//! let view = TreeView::new(&tree);
//! let queries = QueryCache::default();
//!
//! let count = queries.evaluate(&view, view.root(), "count(columnRef)");
//! assert_eq!(Ok(Value::Number(2.0)), count);
//!
//! // The second compilation of the same text is served from the cache.
//! let a = queries.compile("columnRef[1]").unwrap();
//! let b = queries.compile("columnRef[1]").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! ```
//!
//! Evaluation has no side effects on the tree other than the lazy
//!   materialization of the nodes it visits.

mod error;
mod eval;
mod lexer;
mod parser;

pub mod ext;
pub mod func;
pub mod value;

pub use error::XPathError;
pub use func::{Function, FunctionLibrary};
pub use value::Value;

use crate::tree::{Navigate, NodeId};
use fxhash::FxHashMap;
use parser::Expr;
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// Environment in which a query is evaluated.
///
/// Functions receive the environment so that they may inspect the tree
///   and compile queries of their own.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub tree: &'a dyn Navigate,
    pub queries: &'a QueryCache,
}

impl<'a> Env<'a> {
    pub fn new(tree: &'a dyn Navigate, queries: &'a QueryCache) -> Self {
        Self { tree, queries }
    }
}

/// Evaluation context of an expression.
///
/// Positions are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl Context {
    /// Context of a query evaluated against a single node.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            position: 1,
            size: 1,
        }
    }
}

/// A compiled query.
#[derive(Debug)]
pub struct Query {
    text: String,
    expr: Expr,
}

impl Query {
    /// Text from which the query was compiled.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Evaluate against the context node `node`.
    pub fn evaluate(
        &self,
        env: &Env<'_>,
        node: NodeId,
    ) -> Result<Value, XPathError> {
        eval::evaluate(&self.expr, env, &Context::new(node))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.text)
    }
}

/// Compile `text` without caching,
///   resolving functions against `lib`.
pub fn compile(text: &str, lib: &FunctionLibrary) -> Result<Query, XPathError> {
    let tokens = lexer::tokenize(text)?;
    let expr = parser::parse(&tokens, lib, text.len())?;

    Ok(Query {
        text: text.into(),
        expr,
    })
}

/// Compiled queries keyed by their text.
///
/// The cache may be shared between threads;
///   concurrent compilation of the same text may compile it more than
///   once,
///     but only one result is ever retained.
/// Compilation failures are not cached.
#[derive(Debug)]
pub struct QueryCache {
    lib: FunctionLibrary,
    compiled: Mutex<FxHashMap<String, Arc<Query>>>,
}

impl QueryCache {
    pub fn new(lib: FunctionLibrary) -> Self {
        Self {
            lib,
            compiled: Mutex::new(FxHashMap::default()),
        }
    }

    /// Compile `text`,
    ///   or retrieve the query previously compiled from it.
    pub fn compile(&self, text: &str) -> Result<Arc<Query>, XPathError> {
        if let Some(query) = self.lock().get(text) {
            return Ok(query.clone());
        }

        // The lock is not held during compilation.
        let query = Arc::new(compile(text, &self.lib)?);

        Ok(self
            .lock()
            .entry(text.into())
            .or_insert(query)
            .clone())
    }

    /// Compile (if necessary) and evaluate `text` against `node` of `tree`.
    pub fn evaluate(
        &self,
        tree: &dyn Navigate,
        node: NodeId,
        text: &str,
    ) -> Result<Value, XPathError> {
        self.compile(text)?.evaluate(&Env::new(tree, self), node)
    }

    /// Functions against which queries are compiled.
    pub fn functions(&self) -> &FunctionLibrary {
        &self.lib
    }

    /// Number of distinct queries compiled so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, FxHashMap<String, Arc<Query>>> {
        // Entries are inserted whole;
        //   poisoning cannot leave the map inconsistent.
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(FunctionLibrary::standard())
    }
}

assert_impl_all!(QueryCache: Send, Sync);
