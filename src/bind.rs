// Binding engine
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

//! Binding engine.
//!
//! Binding turns the nodes of a [`TreeView`] into the [`Model`]s of a
//!   schema held by a [`SyntaxModel`].
//! A single top-down pass begins at some node for some entry type and
//!   proceeds through every field of every model that it fills:
//!
//!   - the node for the entry type is the node itself if its rule name
//!       matches,
//!         or otherwise its first descendant in document order that
//!         matches;
//!   - scalar, literal and text list fields evaluate their term queries in
//!       declaration order against the node being filled,
//!         each non-empty result overwriting the last;
//!   - model list fields gather every node matched by every subnode
//!       specification,
//!         once per node,
//!         and order the filled models by the start of their spans; and
//!   - nested model fields take the first match of the first subnode
//!       specification that has one.
//!
//! ```
//! use synbind::bind::bind;
//! use synbind::model::{Model, NodeDef, SubnodeDef, SyntaxNode};
//! use synbind::registry::SyntaxModel;
//! use synbind::tree::{SourceTree, TreeView};
//!
//! #[derive(Default)]
//! struct Column {
//!     name: String,
//! }
//!
//! impl SyntaxNode for Column {
//!     fn describe(def: &mut NodeDef<Self>) {
//!         def.rule("columnRef").construct_default();
//!         def.field("name", |c| &mut c.name).term(".");
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Select {
//!     columns: Vec<Model<Column>>,
//! }
//!
//! impl SyntaxNode for Select {
//!     fn describe(def: &mut NodeDef<Self>) {
//!         def.rule("selectStmt").construct_default();
//!         def.field("columns", |s| &mut s.columns)
//!             .subnode(SubnodeDef::nearest());
//!     }
//! }
//!
//! let schema = SyntaxModel::from_entry::<Select>().unwrap();
//!
//! let tree = SourceTree::build("selectStmt", |b| {
//!     b.rule("columnList", |b| {
//!         b.leaf("columnRef", "a");
//!         b.leaf("columnRef", "b");
//!     });
//!     b.leaf("columnRef", "c");
//! });
//! let view = TreeView::new(&tree);
//!
//! let result = bind::<Select, _>(&schema, &view, view.root());
//! let select = result.into_model().unwrap();
//!
//! let names = select
//!     .borrow()
//!     .columns
//!     .iter()
//!     .map(|c| c.borrow().name.clone())
//!     .collect::<Vec<_>>();
//!
//! assert_eq!(vec!["a", "b", "c"], names);
//! ```
//!
//! Memoization
//! ===========
//! Every node binds to at most one model.
//! The model is memoized on the node when it is first constructed,
//!   and so resolving the same node again yields the very same model
//!   ([`Rc::ptr_eq`]),
//!     refilled in place.
//! A node that is reached again while it is still being filled
//!   (for example through a scope query selecting an ancestor)
//!   yields its memoized model without being refilled.
//!
//! Errors
//! ======
//! Binding never fails outright because nothing matched;
//!   [`BindResult::is_ok`] reports whether a model was produced.
//! Problems with individual fields are collected as [`BindError`]s
//!   alongside the result.
//! Under [`FieldErrorPolicy::Continue`] the offending field is left as it
//!   was and binding continues with the next;
//!     under [`FieldErrorPolicy::Abort`] the first error ends the pass and
//!     no model is produced.
//! Warnings never end a pass.

mod error;

pub use error::BindError;

use crate::{
    diagnose::{Diagnostic, Level},
    model::{
        downcast_model, AnyBound, AssignError, Binding, FieldData, FieldKind,
        Lookup, Model, SyntaxLiteral, SyntaxNode,
    },
    registry::{FieldType, LiteralCase, LiteralType, NodeType, SyntaxModel},
    span::{Span, UNKNOWN_SPAN},
    trace::{BindTrace, DefaultTrace},
    tree::{NodeId, NodeSet, RawTree, TreeView},
    xpath::{value::number_to_string, Env, Query, Value, XPathError},
};
use std::{any::type_name, rc::Rc};

/// What to do when a field cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldErrorPolicy {
    /// Leave the field unset,
    ///   record the error,
    ///   and continue binding.
    #[default]
    Continue,

    /// End the binding pass at the first error.
    Abort,
}

/// Run-time configuration of a binding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindOptions {
    pub policy: FieldErrorPolicy,
}

/// Outcome of a top-level bind request.
#[derive(Debug)]
pub struct BindResult<T> {
    model: Option<Model<T>>,
    diagnostics: Vec<BindError>,
}

impl<T> BindResult<T> {
    /// Whether a model was produced.
    pub fn is_ok(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&Model<T>> {
        self.model.as_ref()
    }

    pub fn into_model(self) -> Option<Model<T>> {
        self.model
    }

    /// Errors and warnings recorded during the pass,
    ///   in the order they occurred.
    pub fn diagnostics(&self) -> &[BindError] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (Option<Model<T>>, Vec<BindError>) {
        (self.model, self.diagnostics)
    }
}

/// Bind `node` of `view` as the entry type `T`.
///
/// See the [module-level documentation](self) for more information.
pub fn bind<T: SyntaxNode, R: RawTree>(
    model: &SyntaxModel,
    view: &TreeView<R>,
    node: NodeId,
) -> BindResult<T> {
    bind_with(model, view, node, BindOptions::default())
}

/// Bind `node` of `view` as the entry type `T` with the given `options`.
pub fn bind_with<T: SyntaxNode, R: RawTree>(
    model: &SyntaxModel,
    view: &TreeView<R>,
    node: NodeId,
    options: BindOptions,
) -> BindResult<T> {
    let mut session = BindSession::new(model, view, options);
    let bound = session
        .resolve::<T>(node, true)
        .filter(|_| !session.is_aborted());

    BindResult {
        model: bound,
        diagnostics: session.finish(),
    }
}

/// A single binding pass over a single tree.
///
/// A session may be used to resolve any number of nodes;
///   models memoized on the tree by one resolution are shared by the next.
/// The session borrows the view,
///   and so a view cannot be bound by two sessions at once.
pub struct BindSession<'a, R: RawTree, S: BindTrace = DefaultTrace> {
    model: &'a SyntaxModel,
    view: &'a TreeView<R>,
    options: BindOptions,
    trace: S,
    diagnostics: Vec<BindError>,
    aborted: bool,
}

impl<'a, R: RawTree> BindSession<'a, R> {
    pub fn new(
        model: &'a SyntaxModel,
        view: &'a TreeView<R>,
        options: BindOptions,
    ) -> Self {
        Self::with_trace(model, view, options, DefaultTrace::default())
    }
}

impl<'a, R: RawTree, S: BindTrace> BindSession<'a, R, S> {
    pub fn with_trace(
        model: &'a SyntaxModel,
        view: &'a TreeView<R>,
        options: BindOptions,
        trace: S,
    ) -> Self {
        Self {
            model,
            view,
            options,
            trace,
            diagnostics: Vec::new(),
            aborted: false,
        }
    }

    /// Bind `node` as `T` if its rule name matches,
    ///   or otherwise
    ///     (if `descend`)
    ///   the first descendant of `node` in document order that matches.
    pub fn resolve<T: SyntaxNode>(
        &mut self,
        node: NodeId,
        descend: bool,
    ) -> Option<Model<T>> {
        let ty = self.node_type::<T>()?;

        let found = if self.is_named(node, ty.rule()) {
            Some(node)
        } else if descend {
            self.view.find_first_descendant_by_name(node, ty.rule())
        } else {
            None
        };

        found
            .and_then(|found| self.fill_node(found, ty))
            .and_then(downcast_model)
    }

    /// Bind every match of `T` from `node`.
    ///
    /// `node` itself is the only match if its rule name matches.
    /// Otherwise,
    ///   under [`Lookup::Nearest`],
    ///   every descendant that matches and is not beneath another match is
    ///   bound;
    ///     under [`Lookup::Immediate`] there is no match.
    /// Models are yielded once per node in the order they were found.
    pub fn resolve_all<T: SyntaxNode>(
        &mut self,
        node: NodeId,
        lookup: Lookup,
    ) -> Vec<Model<T>> {
        let Some(ty) = self.node_type::<T>() else {
            return vec![];
        };

        let mut found = NodeSet::new();
        self.collect_matches(node, ty, lookup, &mut found);

        found
            .into_vec()
            .into_iter()
            .filter_map(|node| self.fill_node(node, ty))
            .filter_map(downcast_model)
            .collect()
    }

    /// Bind `node` as `T` regardless of its rule name.
    pub fn fill<T: SyntaxNode>(&mut self, node: NodeId) -> Option<Model<T>> {
        let ty = self.node_type::<T>()?;
        self.fill_node(node, ty).and_then(downcast_model)
    }

    /// Resolve the literal value of `node` as `E`.
    pub fn resolve_literal<E: SyntaxLiteral>(
        &mut self,
        node: NodeId,
    ) -> Option<E> {
        let lit = self.model.literal_type::<E>()?;

        self.literal_of_node(node, lit)
            .and_then(|case| case.value().downcast_ref::<E>())
            .copied()
    }

    /// Whether a fatal error or an error under [`FieldErrorPolicy::Abort`]
    ///   has ended this pass.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Errors and warnings recorded so far.
    pub fn diagnostics(&self) -> &[BindError] {
        &self.diagnostics
    }

    /// End the pass,
    ///   yielding its diagnostics.
    pub fn finish(self) -> Vec<BindError> {
        self.diagnostics
    }

    fn node_type<T: SyntaxNode>(&mut self) -> Option<&'a NodeType> {
        let ty = self.model.node_type::<T>();

        if ty.is_none() {
            self.record(BindError::Unregistered {
                type_name: type_name::<T>(),
            });
        }

        ty
    }

    fn is_named(&self, node: NodeId, rule: &str) -> bool {
        *self.view.name(node) == *rule
    }

    fn span_of(&self, node: NodeId) -> Span {
        self.view.interval(node).unwrap_or(UNKNOWN_SPAN)
    }

    fn env(&self) -> Env<'a> {
        Env::new(self.view, self.model.queries())
    }

    fn record(&mut self, err: BindError) {
        self.trace.trace_error(&err);

        let aborts = err.is_fatal()
            || (self.options.policy == FieldErrorPolicy::Abort
                && err.level() <= Level::Error);

        self.aborted |= aborts;
        self.diagnostics.push(err);
    }

    /// Construct or retrieve the model memoized on `node` and fill each of
    ///   its fields.
    fn fill_node(
        &mut self,
        node: NodeId,
        ty: &'a NodeType,
    ) -> Option<Rc<dyn AnyBound>> {
        let (model, fresh) = match self.view.model(node) {
            Some(model) if model.value_type_id() == ty.type_id() => {
                (model, false)
            }
            Some(model) => {
                self.record(BindError::ModelMismatch {
                    node,
                    existing: model.value_type_name(),
                    requested: ty.type_name(),
                    span: self.span_of(node),
                });
                return None;
            }
            None => {
                let model = ty.construct(node);
                self.view.set_model(node, model.clone());
                (model, true)
            }
        };

        if self.aborted || !self.view.begin_fill(node) {
            return Some(model);
        }

        self.trace.trace_fill_begin(ty.rule(), node, fresh);

        model.clear_bindings();

        for field in ty.fields() {
            if self.aborted {
                break;
            }

            self.fill_field(node, ty, &*model, field);
        }

        self.view.end_fill(node);

        let span = self.view.interval(node);
        if let Some(span) = span {
            model.set_span(span);
        }

        self.trace.trace_fill_end(ty.rule(), node, span);

        Some(model)
    }

    fn fill_field(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        model: &dyn AnyBound,
        field: &'a FieldType,
    ) {
        match field.kind() {
            FieldKind::Array if !field.subnodes().is_empty() => {
                self.record(BindError::UnsupportedArray {
                    rule: ty.rule(),
                    field: field.name(),
                })
            }
            FieldKind::Array => (),
            FieldKind::List => self.fill_list(node, ty, model, field),
            FieldKind::Object => self.fill_object(node, ty, model, field),
            _ => self.fill_terms(node, ty, model, field),
        }
    }

    /// Assign each non-empty term result in turn.
    fn fill_terms(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        model: &dyn AnyBound,
        field: &'a FieldType,
    ) {
        let mut bound_from = None;

        for query in field.terms() {
            let value = match query.evaluate(&self.env(), node) {
                Ok(value) if value.is_empty() => continue,
                Ok(value) => value,
                Err(err) => {
                    self.query_error(node, ty, Some(field.name()), query, err);
                    continue;
                }
            };

            let Some((data, source)) = self.field_data(node, ty, field, value)
            else {
                continue;
            };

            if self.assign(node, ty, model, field, data) {
                bound_from = source;
            }

            if self.aborted {
                return;
            }
        }

        if let Some(source) = bound_from {
            model.push_binding(self.binding(field, node, source));
        }
    }

    /// Convert a term result into data for `field`,
    ///   along with the node that produced it if there was exactly one.
    fn field_data(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        field: &'a FieldType,
        value: Value,
    ) -> Option<(FieldData, Option<NodeId>)> {
        match field.kind() {
            FieldKind::Enum => {
                let model = self.model;
                let lit = field
                    .literal()
                    .and_then(|id| model.literal_type_by_id(id))?;

                let (case, source) = match value.nodes() {
                    // Unlike scalars,
                    //   an enumerated field is only bound by a single node.
                    Some(&[source]) => {
                        (self.literal_of_node(source, lit), Some(source))
                    }
                    Some(_) => return None,
                    None => {
                        let s = value.to_string_value(self.view);
                        (self.literal_of_str(node, lit, &s), None)
                    }
                };

                case.map(|case| (FieldData::Literal(case.value().clone()), source))
            }

            FieldKind::TextList => match value.nodes() {
                Some(nodes) => Some((
                    FieldData::Texts(
                        nodes.iter().map(|&n| self.view.text(n).to_string()).collect(),
                    ),
                    value.single_node(),
                )),
                None => Some((
                    FieldData::Texts(vec![value.to_string_value(self.view)]),
                    None,
                )),
            },

            kind if kind.is_scalar() => match &value {
                Value::Node(_) | Value::NodeSet(_) => {
                    let nodes = value.nodes().unwrap_or_default();
                    let source = self.first_node(node, ty, field, nodes)?;

                    Some((FieldData::Scalar(self.view.text(source)), Some(source)))
                }
                Value::String(s) => Some((FieldData::Scalar(s.as_str().into()), None)),
                Value::Number(n) => {
                    Some((FieldData::Scalar(number_to_string(*n).into()), None))
                }
                Value::Boolean(b) => {
                    Some((FieldData::Scalar(b.to_string().into()), None))
                }
            },

            _ => None,
        }
    }

    /// The first of `nodes`,
    ///   warning if there was more than one.
    fn first_node(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        field: &FieldType,
        nodes: &[NodeId],
    ) -> Option<NodeId> {
        if nodes.len() > 1 {
            self.record(BindError::AmbiguousScalar {
                rule: ty.rule(),
                field: field.name(),
                count: nodes.len(),
                span: self.span_of(node),
            });
        }

        nodes.first().copied()
    }

    /// Bind every node matched by any subnode specification of a model
    ///   list field.
    ///
    /// The list is always reassigned,
    ///   even when nothing matched.
    fn fill_list(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        model: &dyn AnyBound,
        field: &'a FieldType,
    ) {
        let mut seen = NodeSet::new();
        let mut models = Vec::new();

        for spec in field.subnodes() {
            let Some(target) = self.model.node_type_by_id(spec.target()) else {
                continue;
            };

            let mut found = NodeSet::new();

            match spec.scope() {
                Some(scope) => {
                    let roots = self.scope_roots(node, ty, field, scope);

                    for root in roots.unwrap_or_default() {
                        self.collect_matches(root, target, spec.lookup(), &mut found);
                    }
                }

                // The node being filled is never a match of its own field.
                None => match spec.lookup() {
                    Lookup::Nearest => self
                        .view
                        .find_descendant_layer_by_name(node, target.rule())
                        .into_iter()
                        .for_each(|n| {
                            found.insert(n);
                        }),
                    Lookup::Immediate => {
                        for &child in self.view.children(node).iter() {
                            if self.is_named(child, target.rule()) {
                                found.insert(child);
                            }
                        }
                    }
                },
            }

            if found.is_empty() {
                self.trace.trace_miss(field.name(), target.rule(), node);
            }

            for matched in found.into_vec() {
                if !seen.insert(matched) {
                    continue;
                }

                if let Some(bound) = self.fill_node(matched, target) {
                    models.push(bound);
                }

                if self.aborted {
                    return;
                }
            }
        }

        // Stable, so that models with equal starts keep discovery order.
        models.sort_by_key(|m| m.span().start());

        let bindings = models
            .iter()
            .map(|m| self.binding(field, node, m.node()))
            .collect::<Vec<_>>();

        if self.assign(node, ty, model, field, FieldData::Models(models)) {
            bindings.into_iter().for_each(|b| model.push_binding(b));
        }
    }

    /// Bind the first match of the first subnode specification of a nested
    ///   model field that has one.
    fn fill_object(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        model: &dyn AnyBound,
        field: &'a FieldType,
    ) {
        for spec in field.subnodes() {
            let Some(target) = self.model.node_type_by_id(spec.target()) else {
                continue;
            };

            let found = match spec.scope() {
                Some(scope) => self
                    .scope_roots(node, ty, field, scope)
                    .unwrap_or_default()
                    .into_iter()
                    .find_map(|root| self.match_one(root, target, spec.lookup())),

                None => match spec.lookup() {
                    Lookup::Nearest => {
                        self.view.find_first_descendant_by_name(node, target.rule())
                    }
                    Lookup::Immediate => self
                        .view
                        .children(node)
                        .iter()
                        .copied()
                        .find(|&child| self.is_named(child, target.rule())),
                },
            };

            let Some(matched) = found else {
                self.trace.trace_miss(field.name(), target.rule(), node);
                continue;
            };

            if let Some(bound) = self.fill_node(matched, target) {
                let binding = self.binding(field, node, matched);

                if self.assign(node, ty, model, field, FieldData::Model(bound)) {
                    model.push_binding(binding);
                }

                return;
            }

            if self.aborted {
                return;
            }
        }
    }

    /// Roots selected by a scope query,
    ///   or [`None`] if it failed.
    fn scope_roots(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        field: &FieldType,
        scope: &Query,
    ) -> Option<Vec<NodeId>> {
        match scope.evaluate(&self.env(), node) {
            Ok(value) => {
                let found = value.type_name();

                value.into_nodes().or_else(|| {
                    self.record(BindError::ScopeNotNodeSet {
                        rule: ty.rule(),
                        field: field.name(),
                        query: scope.text().into(),
                        found,
                        span: self.span_of(node),
                    });
                    None
                })
            }
            Err(err) => {
                self.query_error(node, ty, Some(field.name()), scope, err);
                None
            }
        }
    }

    /// Add `root` to `found` if it matches `ty`,
    ///   or otherwise its nearest matching descendants under
    ///   [`Lookup::Nearest`].
    fn collect_matches(
        &self,
        root: NodeId,
        ty: &NodeType,
        lookup: Lookup,
        found: &mut NodeSet,
    ) {
        if self.is_named(root, ty.rule()) {
            found.insert(root);
        } else if lookup == Lookup::Nearest {
            for node in self.view.find_descendant_layer_by_name(root, ty.rule()) {
                found.insert(node);
            }
        }
    }

    fn match_one(
        &self,
        root: NodeId,
        ty: &NodeType,
        lookup: Lookup,
    ) -> Option<NodeId> {
        if self.is_named(root, ty.rule()) {
            Some(root)
        } else if lookup == Lookup::Nearest {
            self.view.find_first_descendant_by_name(root, ty.rule())
        } else {
            None
        }
    }

    /// Resolve the literal value of `node`.
    ///
    /// The string looked up by name is the result of the literal's string
    ///   query,
    ///     if any,
    ///   or otherwise the text of the node.
    fn literal_of_node(
        &mut self,
        node: NodeId,
        lit: &'a LiteralType,
    ) -> Option<&'a LiteralCase> {
        let s = match lit.string() {
            Some(query) => match query.evaluate(&self.env(), node) {
                Ok(value) => value.to_string_value(self.view),
                Err(err) => {
                    self.literal_query_error(node, lit, query, err);
                    String::new()
                }
            },
            None => self.view.text(node).to_string(),
        };

        self.literal_of_str(node, lit, &s)
    }

    /// Look up `s` by name,
    ///   falling back to the first value whose predicate holds for `node`.
    fn literal_of_str(
        &mut self,
        node: NodeId,
        lit: &'a LiteralType,
        s: &str,
    ) -> Option<&'a LiteralCase> {
        if !s.is_empty() {
            if let Some(case) = lit.lookup(s) {
                return Some(case);
            }
        }

        for case in lit.values() {
            let Some(predicate) = case.predicate() else {
                continue;
            };

            match predicate.evaluate(&self.env(), node) {
                Ok(value) if value.to_boolean() => return Some(case),
                Ok(_) => (),
                Err(err) => self.literal_query_error(node, lit, predicate, err),
            }
        }

        None
    }

    /// Assign `data` to `field`,
    ///   yielding whether it was assigned.
    fn assign(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        model: &dyn AnyBound,
        field: &FieldType,
        data: FieldData,
    ) -> bool {
        let err = match field.assign(model, data) {
            Ok(()) => return true,
            Err(AssignError::Parse(kind, text)) => BindError::ScalarParse {
                rule: ty.rule(),
                field: field.name(),
                kind,
                text,
                span: self.span_of(node),
            },
            Err(err) => BindError::Assign {
                rule: ty.rule(),
                field: field.name(),
                err,
                span: self.span_of(node),
            },
        };

        self.record(err);
        false
    }

    fn binding(&self, field: &FieldType, node: NodeId, source: NodeId) -> Binding {
        let path = self.view.full_path_name(source);
        let base = self.view.full_path_name(node);

        Binding {
            field: field.name(),
            node: source,
            span: self.view.interval(source),
            text: self.view.text(source),
            path: match path.strip_prefix(&base) {
                Some(rel) => rel.to_string(),
                None => path,
            },
        }
    }

    fn query_error(
        &mut self,
        node: NodeId,
        ty: &NodeType,
        field: Option<&'static str>,
        query: &Query,
        err: XPathError,
    ) {
        self.record(BindError::Query {
            rule: ty.rule(),
            field,
            query: query.text().into(),
            span: self.span_of(node),
            err,
        });
    }

    fn literal_query_error(
        &mut self,
        node: NodeId,
        lit: &LiteralType,
        query: &Query,
        err: XPathError,
    ) {
        self.record(BindError::Query {
            rule: lit.rule(),
            field: None,
            query: query.text().into(),
            span: self.span_of(node),
            err,
        });
    }
}

#[cfg(test)]
mod test;
