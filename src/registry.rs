// Schema type registry
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

//! Type registry of a schema.
//!
//! A [`SyntaxModel`] holds the immutable binding metadata of every
//!   [`SyntaxNode`] type reachable from an entry type,
//!     and of every [`SyntaxLiteral`](crate::model::SyntaxLiteral) type
//!     that those node types resolve through term queries.
//! All queries of the schema are compiled when a type is introduced,
//!   so that a schema with a malformed query fails before any tree is
//!   bound.
//!
//! Types are discovered breadth-first from the entry type through the
//!   target types of subnode specifications.
//! Each type is visited only once,
//!   and so schemas whose types refer to one another in diamonds or
//!   cycles are introduced without difficulty:
//!
//! ```
//! use synbind::model::{Model, NodeDef, SubnodeDef, SyntaxNode};
//! use synbind::registry::SyntaxModel;
//!
//! #[derive(Default)]
//! struct Expr {
//!     operands: Vec<Model<Expr>>,
//! }
//!
//! impl SyntaxNode for Expr {
//!     fn describe(def: &mut NodeDef<Self>) {
//!         def.rule("expr").construct_default();
//!         def.field("operands", |e| &mut e.operands)
//!             .subnode(SubnodeDef::nearest().scope("*"));
//!     }
//! }
//!
//! let model = SyntaxModel::from_entry::<Expr>().unwrap();
//! assert!(model.node_type_by_rule("expr").is_some());
//! ```
//!
//! Introduction is transactional:
//!   if any configuration error is found,
//!     all errors are reported together as [`ModelErrors`] and nothing is
//!     registered.
//!
//! Once built,
//!   a registry is never mutated by binding and may be shared between
//!   threads,
//!     each binding trees of its own.

mod error;

pub use error::{ModelError, ModelErrors};

use crate::{
    model::{
        AnyBound, AssignError, AssignFn, ConstructFn, FieldData, FieldDecl,
        FieldKind, LiteralDecl, LiteralRef, LiteralValue, Lookup, NodeDecl,
        RenderFn, Rendered, SyntaxLiteral, SyntaxNode, TypeRef,
    },
    tree::NodeId,
    xpath::{FunctionLibrary, Query, QueryCache},
};
use fxhash::{FxHashMap, FxHashSet};
use std::{any::TypeId, collections::VecDeque, fmt, rc::Rc, sync::Arc};

/// Binding metadata of a [`SyntaxNode`] type.
pub struct NodeType {
    rule: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    construct: ConstructFn,
    fields: Vec<FieldType>,
}

impl NodeType {
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Construct a new model bound to `node`.
    pub(crate) fn construct(&self, node: NodeId) -> Rc<dyn AnyBound> {
        (self.construct)(self.rule, node)
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("rule", &self.rule)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Binding metadata of a single field of a [`NodeType`].
pub struct FieldType {
    name: &'static str,
    kind: FieldKind,
    terms: Vec<Arc<Query>>,
    subnodes: Vec<SubnodeSpec>,
    literal: Option<TypeId>,
    assign: AssignFn,
    render: RenderFn,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Term queries in declaration order.
    pub fn terms(&self) -> &[Arc<Query>] {
        &self.terms
    }

    /// Subnode specifications in declaration order.
    pub fn subnodes(&self) -> &[SubnodeSpec] {
        &self.subnodes
    }

    /// Literal type resolved by the terms of an enumerated field.
    pub fn literal(&self) -> Option<TypeId> {
        self.literal
    }

    pub(crate) fn assign(
        &self,
        model: &dyn AnyBound,
        data: FieldData,
    ) -> Result<(), AssignError> {
        (*self.assign)(model, data)
    }

    pub(crate) fn render(&self, model: &dyn AnyBound) -> Rendered {
        (*self.render)(model)
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("terms", &self.terms)
            .field("subnodes", &self.subnodes)
            .finish_non_exhaustive()
    }
}

/// A compiled subnode specification.
#[derive(Debug, Clone)]
pub struct SubnodeSpec {
    scope: Option<Arc<Query>>,
    target: TypeId,
    lookup: Lookup,
}

impl SubnodeSpec {
    /// Query selecting the search roots,
    ///   or [`None`] to search from the node being filled.
    pub fn scope(&self) -> Option<&Arc<Query>> {
        self.scope.as_ref()
    }

    /// [`NodeType`] to be matched.
    pub fn target(&self) -> TypeId {
        self.target
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }
}

/// A single value of a [`LiteralType`].
#[derive(Debug)]
pub struct LiteralCase {
    name: &'static str,
    value: LiteralValue,
    when: Option<Arc<Query>>,
}

impl LiteralCase {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> &LiteralValue {
        &self.value
    }

    /// Predicate query selecting this value when lookup by name fails.
    pub fn predicate(&self) -> Option<&Arc<Query>> {
        self.when.as_ref()
    }
}

/// Resolution metadata of a [`SyntaxLiteral`](crate::model::SyntaxLiteral)
///   type.
#[derive(Debug)]
pub struct LiteralType {
    rule: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    string: Option<Arc<Query>>,
    case_sensitive: bool,
    by_name: FxHashMap<String, usize>,
    values: Vec<LiteralCase>,
}

impl LiteralType {
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Query computing the string to be looked up by name,
    ///   or [`None`] to use the text of the node.
    pub fn string(&self) -> Option<&Arc<Query>> {
        self.string.as_ref()
    }

    /// Whether names are matched case-sensitively.
    ///
    /// This holds exactly when two or more value names are equal when
    ///   case is ignored;
    ///     otherwise names are matched regardless of case.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Value declared with the name `s`.
    pub fn lookup(&self, s: &str) -> Option<&LiteralCase> {
        let index = if self.case_sensitive {
            self.by_name.get(s)
        } else {
            self.by_name.get(&s.to_uppercase())
        };

        index.map(|&i| &self.values[i])
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[LiteralCase] {
        &self.values
    }
}

/// Binding metadata of a schema.
///
/// See the [module-level documentation](self) for more information.
pub struct SyntaxModel {
    queries: QueryCache,
    nodes: Vec<NodeType>,
    node_by_rule: FxHashMap<&'static str, usize>,
    node_by_type: FxHashMap<TypeId, usize>,
    literals: Vec<LiteralType>,
    literal_by_rule: FxHashMap<&'static str, usize>,
    literal_by_type: FxHashMap<TypeId, usize>,
}

impl SyntaxModel {
    /// An empty registry compiling queries against the
    ///   [standard function library](FunctionLibrary::standard).
    pub fn new() -> Self {
        Self::with_functions(FunctionLibrary::standard())
    }

    /// An empty registry compiling queries against `lib`.
    pub fn with_functions(lib: FunctionLibrary) -> Self {
        Self {
            queries: QueryCache::new(lib),
            nodes: Vec::new(),
            node_by_rule: FxHashMap::default(),
            node_by_type: FxHashMap::default(),
            literals: Vec::new(),
            literal_by_rule: FxHashMap::default(),
            literal_by_type: FxHashMap::default(),
        }
    }

    /// A registry of the schema reachable from the entry type `T`.
    pub fn from_entry<T: SyntaxNode>() -> Result<Self, ModelErrors> {
        let mut model = Self::new();
        model.introduce::<T>()?;
        Ok(model)
    }

    /// Register `T` and every type reachable from it.
    ///
    /// Types already registered are skipped,
    ///   so introducing the same type twice has no effect.
    pub fn introduce<T: SyntaxNode>(&mut self) -> Result<(), ModelErrors> {
        let mut staged = Staging::new(self);
        staged.discover(TypeRef::of::<T>());

        let Staging {
            nodes,
            literals,
            errors,
            ..
        } = staged;

        if !errors.is_empty() {
            return Err(ModelErrors(errors));
        }

        for node in nodes {
            let index = self.nodes.len();
            self.node_by_rule.insert(node.rule, index);
            self.node_by_type.insert(node.type_id, index);
            self.nodes.push(node);
        }

        for literal in literals {
            let index = self.literals.len();
            self.literal_by_rule.insert(literal.rule, index);
            self.literal_by_type.insert(literal.type_id, index);
            self.literals.push(literal);
        }

        Ok(())
    }

    /// Queries of this schema along with any compiled while binding.
    pub fn queries(&self) -> &QueryCache {
        &self.queries
    }

    pub fn node_type<T: SyntaxNode>(&self) -> Option<&NodeType> {
        self.node_type_by_id(TypeId::of::<T>())
    }

    pub fn node_type_by_id(&self, id: TypeId) -> Option<&NodeType> {
        self.node_by_type.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn node_type_by_rule(&self, rule: &str) -> Option<&NodeType> {
        self.node_by_rule.get(rule).map(|&i| &self.nodes[i])
    }

    pub fn literal_type<E: SyntaxLiteral>(&self) -> Option<&LiteralType> {
        self.literal_type_by_id(TypeId::of::<E>())
    }

    pub fn literal_type_by_id(&self, id: TypeId) -> Option<&LiteralType> {
        self.literal_by_type.get(&id).map(|&i| &self.literals[i])
    }

    pub fn literal_type_by_rule(&self, rule: &str) -> Option<&LiteralType> {
        self.literal_by_rule.get(rule).map(|&i| &self.literals[i])
    }

    /// Node types in the order they were discovered.
    pub fn node_types(&self) -> &[NodeType] {
        &self.nodes
    }

    pub fn literal_types(&self) -> &[LiteralType] {
        &self.literals
    }
}

impl Default for SyntaxModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyntaxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxModel")
            .field("nodes", &self.nodes)
            .field("literals", &self.literals)
            .finish_non_exhaustive()
    }
}

assert_impl_all!(SyntaxModel: Send, Sync);

/// Types discovered during a single introduction,
///   not yet committed to the registry.
struct Staging<'a> {
    model: &'a SyntaxModel,
    nodes: Vec<NodeType>,
    literals: Vec<LiteralType>,
    errors: Vec<ModelError>,
}

impl<'a> Staging<'a> {
    fn new(model: &'a SyntaxModel) -> Self {
        Self {
            model,
            nodes: Vec::new(),
            literals: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Breadth-first discovery of every node type reachable from `entry`.
    fn discover(&mut self, entry: TypeRef) {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([(entry, None)]);

        while let Some((ty, referrer)) = queue.pop_front() {
            if self.model.node_by_type.contains_key(&ty.id)
                || !visited.insert(ty.id)
            {
                continue;
            }

            let decl = (ty.declare)();

            for field in &decl.fields {
                if let Some(target) = field.target {
                    if !field.subnodes.is_empty() {
                        queue.push_back((target, Some(decl.ty)));
                    }
                }
            }

            self.node_type(decl, referrer);
        }
    }

    fn node_type(&mut self, decl: NodeDecl, referrer: Option<&'static str>) {
        let NodeDecl {
            ty,
            id,
            rule,
            construct,
            fields,
        } = decl;

        let rule = match rule {
            Some(rule) => rule,
            None => {
                self.errors.push(ModelError::MissingRule {
                    type_name: ty,
                    referrer,
                });
                ""
            }
        };

        if let Some(first) = self.node_type_named(rule) {
            self.errors.push(ModelError::DuplicateRule {
                rule,
                first,
                second: ty,
            });
        }

        let fields = fields
            .into_iter()
            .filter_map(|field| self.field_type(ty, field))
            .collect();

        let Some(construct) = construct else {
            self.errors
                .push(ModelError::MissingConstructor { type_name: ty });
            return;
        };

        self.nodes.push(NodeType {
            rule,
            type_id: id,
            type_name: ty,
            construct,
            fields,
        });
    }

    /// Name of the type,
    ///   registered or staged,
    ///   bound from `rule`.
    fn node_type_named(&self, rule: &str) -> Option<&'static str> {
        if rule.is_empty() {
            return None;
        }

        self.model
            .node_type_by_rule(rule)
            .map(NodeType::type_name)
            .or_else(|| {
                self.nodes
                    .iter()
                    .find(|node| node.rule == rule)
                    .map(NodeType::type_name)
            })
    }

    fn field_type(
        &mut self,
        type_name: &'static str,
        field: FieldDecl,
    ) -> Option<FieldType> {
        let FieldDecl {
            name,
            kind,
            terms,
            subnodes,
            target,
            literal,
            assign,
            render,
        } = field;

        let errors_before = self.errors.len();
        let has_terms = !terms.is_empty();

        if !terms.is_empty() && !subnodes.is_empty() {
            self.errors.push(ModelError::TermWithSubnode {
                type_name,
                field: name,
            });
        } else if !subnodes.is_empty() && !kind.is_model() {
            self.errors.push(ModelError::SubnodeOnValue {
                type_name,
                field: name,
                kind,
            });
        } else if !terms.is_empty() && kind.is_model() {
            self.errors.push(ModelError::TermOnModel {
                type_name,
                field: name,
                kind,
            });
        }

        let terms = terms
            .iter()
            .filter_map(|q| self.compile(type_name, Some(name), q))
            .collect();

        let subnodes = subnodes
            .into_iter()
            .filter_map(|spec| {
                let scope = match &spec.scope {
                    Some(q) => Some(self.compile(type_name, Some(name), q)?),
                    None => None,
                };

                Some(SubnodeSpec {
                    scope,
                    target: target?.id,
                    lookup: spec.lookup,
                })
            })
            .collect::<Vec<_>>();

        // Only literals that are resolved by terms are registered.
        let literal = match literal {
            Some(lit) if has_terms => self.literal_type(lit, type_name),
            _ => None,
        };

        (self.errors.len() == errors_before).then_some(FieldType {
            name,
            kind,
            terms,
            subnodes,
            literal,
            assign,
            render,
        })
    }

    fn compile(
        &mut self,
        type_name: &'static str,
        field: Option<&'static str>,
        query: &str,
    ) -> Option<Arc<Query>> {
        match self.model.queries.compile(query) {
            Ok(compiled) => Some(compiled),
            Err(err) => {
                self.errors.push(ModelError::Query {
                    type_name,
                    field,
                    query: query.into(),
                    err,
                });
                None
            }
        }
    }

    /// Register the literal type referenced by an enumerated field,
    ///   yielding its [`TypeId`].
    fn literal_type(
        &mut self,
        lit: LiteralRef,
        referrer: &'static str,
    ) -> Option<TypeId> {
        let registered = self.model.literal_type_by_id(lit.id).is_some()
            || self.literals.iter().any(|l| l.type_id == lit.id);

        if registered {
            return Some(lit.id);
        }

        let LiteralDecl {
            ty,
            id,
            rule,
            string,
            values,
        } = (lit.declare)();

        let Some(rule) = rule else {
            self.errors.push(ModelError::MissingRule {
                type_name: ty,
                referrer: Some(referrer),
            });
            return None;
        };

        let first = self
            .model
            .literal_type_by_rule(rule)
            .map(LiteralType::type_name)
            .or_else(|| {
                self.literals
                    .iter()
                    .find(|l| l.rule == rule)
                    .map(LiteralType::type_name)
            });

        if let Some(first) = first {
            self.errors.push(ModelError::AmbiguousLiteral {
                rule,
                first,
                second: ty,
            });
            return None;
        }

        if values.is_empty() {
            self.errors
                .push(ModelError::EmptyLiteral { type_name: ty });
            return None;
        }

        let mut names = FxHashSet::default();
        for case in &values {
            if !names.insert(case.name) {
                self.errors.push(ModelError::DuplicateLiteralName {
                    type_name: ty,
                    name: case.name,
                });
            }
        }

        let folded = names
            .iter()
            .map(|name| name.to_uppercase())
            .collect::<FxHashSet<_>>();
        let case_sensitive = folded.len() < names.len();

        let string = string.and_then(|q| self.compile(ty, None, &q));

        let values = values
            .into_iter()
            .map(|case| LiteralCase {
                name: case.name,
                value: case.value,
                when: case.when.and_then(|q| self.compile(ty, None, &q)),
            })
            .collect::<Vec<_>>();

        let by_name = values
            .iter()
            .enumerate()
            .map(|(i, case)| {
                let key = if case_sensitive {
                    case.name.to_string()
                } else {
                    case.name.to_uppercase()
                };

                (key, i)
            })
            .collect();

        self.literals.push(LiteralType {
            rule,
            type_id: id,
            type_name: ty,
            string,
            case_sensitive,
            by_name,
            values,
        });

        Some(id)
    }
}
