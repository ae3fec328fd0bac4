// Schema declaration and bound models
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

//! Schema declaration and bound model cells.
//!
//! A schema is a set of Rust types that each describe how they are bound
//!   from a raw tree:
//!
//!   - [`SyntaxNode`] types correspond to a grammar rule and declare a
//!       series of fields,
//!         each bound either by _term_ queries that compute a value
//!         relative to the node,
//!         or by _subnode_ specifications that locate nested nodes to be
//!         bound as models of their own; and
//!   - [`SyntaxLiteral`] types are enumerations resolvable from terminal
//!       text or from boolean predicate queries.
//!
//! Declarations are data,
//!   not reflection:
//!     each type is described once through a [`NodeDef`] or [`LiteralDef`],
//!     and each field through an accessor closure that is captured at
//!     declaration time and later used by the binding engine to assign
//!     values.
//!
//! ```
//! use synbind::model::{Model, NodeDef, SubnodeDef, SyntaxNode};
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
//! ```
//!
//! Bound Models
//! ============
//! The binding engine produces [`Model`]s:
//!   reference-counted [`Bound`] cells holding the user's value alongside
//!   the rule name,
//!   source [`Span`] and [`Binding`] records of the node it was bound
//!   from.
//! A tree node binds to at most one model,
//!   and so two models are the same binding exactly when they are
//!   [`Rc::ptr_eq`].

use crate::{span::Span, tree::NodeId};
use std::{
    any::{type_name, Any, TypeId},
    cell::{Cell, Ref, RefCell, RefMut},
    error::Error,
    fmt::{self, Debug, Display},
    rc::Rc,
    sync::Arc,
};

/// A model bound to a tree node.
pub type Model<T> = Rc<Bound<T>>;

/// A user value bound to a tree node.
///
/// The value itself is held in a [`RefCell`] so that the binding engine can
///   fill it after the model has been memoized on its node;
///     models are only ever filled during a binding pass,
///       after which borrowing is free of contention.
pub struct Bound<T> {
    rule: &'static str,
    node: NodeId,
    span: Cell<Span>,
    bindings: RefCell<Vec<Binding>>,
    value: RefCell<T>,
}

impl<T> Bound<T> {
    pub fn new(rule: &'static str, node: NodeId, value: T) -> Self {
        Self {
            rule,
            node,
            span: Cell::new(Span::default()),
            bindings: RefCell::new(Vec::new()),
            value: RefCell::new(value),
        }
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.value.borrow_mut()
    }

    /// Source span of the bound node.
    ///
    /// This is [`Span::default`] if the raw tree did not report an
    ///   interval for the node.
    pub fn span(&self) -> Span {
        self.span.get()
    }

    /// Rule name of the bound node.
    pub fn rule_name(&self) -> &'static str {
        self.rule
    }

    /// Tree node this model is bound to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Records of which tree nodes produced which field values.
    pub fn bindings(&self) -> Ref<'_, Vec<Binding>> {
        self.bindings.borrow()
    }

    /// Consume the model,
    ///   yielding its value if no other references to it remain.
    pub fn try_unwrap(model: Model<T>) -> Result<T, Model<T>> {
        Rc::try_unwrap(model).map(|bound| bound.value.into_inner())
    }
}

impl<T: Debug> Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Bound");

        s.field("rule", &self.rule)
            .field("node", &self.node)
            .field("span", &self.span.get());

        match self.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };

        s.finish()
    }
}

/// Type-erased access to a [`Bound`] model.
///
/// The registry and binding engine operate on models of many types at
///   once and so cannot name `T`;
///     this exposes everything about a model but its value.
pub trait AnyBound: Any {
    fn rule_name(&self) -> &'static str;
    fn node(&self) -> NodeId;
    fn span(&self) -> Span;
    fn set_span(&self, span: Span);

    fn bindings(&self) -> Ref<'_, Vec<Binding>>;
    fn clear_bindings(&self);
    fn push_binding(&self, binding: Binding);

    /// [`TypeId`] of the bound value type `T`.
    fn value_type_id(&self) -> TypeId;

    /// Name of the bound value type `T`.
    fn value_type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: 'static> AnyBound for Bound<T> {
    fn rule_name(&self) -> &'static str {
        self.rule
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn span(&self) -> Span {
        self.span.get()
    }

    fn set_span(&self, span: Span) {
        self.span.set(span)
    }

    fn bindings(&self) -> Ref<'_, Vec<Binding>> {
        self.bindings.borrow()
    }

    fn clear_bindings(&self) {
        self.bindings.borrow_mut().clear()
    }

    fn push_binding(&self, binding: Binding) {
        self.bindings.borrow_mut().push(binding)
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Recover a typed [`Model`] from a type-erased one.
pub fn downcast_model<T: 'static>(model: Rc<dyn AnyBound>) -> Option<Model<T>> {
    model.into_any().downcast::<Bound<T>>().ok()
}

/// Record of a tree node that contributed a value to a model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Field that received the value.
    pub field: &'static str,

    /// Node that produced the value.
    pub node: NodeId,

    /// Source span of the producing node,
    ///   if known.
    pub span: Option<Span>,

    /// Text of the producing node.
    pub text: Rc<str>,

    /// Rule path to the producing node relative to the model's own node.
    pub path: String,
}

/// Shape of a field's value,
///   which determines how bound values are converted and assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Byte,
    Short,
    Int,
    Long,
    Bool,
    Float,
    Double,
    /// A [`SyntaxLiteral`].
    Enum,
    /// A single nested [`Model`].
    Object,
    /// A boxed slice of nested [`Model`]s.
    ///
    /// This kind is recognized but cannot be bound.
    Array,
    /// An ordered sequence of nested [`Model`]s.
    List,
    /// An ordered sequence of strings.
    TextList,
}

impl FieldKind {
    /// Whether values of this kind are nested models located by subnode
    ///   specifications.
    pub fn is_model(self) -> bool {
        matches!(self, Self::Object | Self::Array | Self::List)
    }

    /// Whether values of this kind are parsed from a single string.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Byte
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::Bool
                | Self::Float
                | Self::Double
        )
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FieldKind::*;

        match self {
            Text => write!(f, "text"),
            Byte => write!(f, "byte"),
            Short => write!(f, "short"),
            Int => write!(f, "int"),
            Long => write!(f, "long"),
            Bool => write!(f, "bool"),
            Float => write!(f, "float"),
            Double => write!(f, "double"),
            Enum => write!(f, "literal"),
            Object => write!(f, "nested model"),
            Array => write!(f, "model array"),
            List => write!(f, "model list"),
            TextList => write!(f, "text list"),
        }
    }
}

/// Literal value in type-erased form.
pub type LiteralValue = Arc<dyn Any + Send + Sync>;

/// A value computed by the binding engine for assignment to a field.
pub enum FieldData {
    /// Text to be parsed according to the field's scalar kind.
    Scalar(Rc<str>),

    /// A resolved [`SyntaxLiteral`] value.
    Literal(LiteralValue),

    /// Strings for a text list.
    Texts(Vec<String>),

    Model(Rc<dyn AnyBound>),

    /// Models for a model list,
    ///   already in their final order.
    Models(Vec<Rc<dyn AnyBound>>),
}

impl FieldData {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Literal(_) => "literal",
            Self::Texts(_) => "text list",
            Self::Model(_) => "model",
            Self::Models(_) => "model list",
        }
    }
}

/// A field value could not be assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignError {
    /// Text could not be parsed as the field's scalar kind.
    Parse(FieldKind, String),

    /// The binding engine produced data of the wrong shape for the field.
    Shape(FieldKind, &'static str),

    /// A model or literal was of an unexpected type.
    Type(&'static str),

    /// The model's value was already borrowed.
    Busy,
}

impl Display for AssignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(kind, text) => {
                write!(f, "cannot parse `{text}` as {kind}")
            }
            Self::Shape(kind, data) => {
                write!(f, "cannot assign {data} data to {kind} field")
            }
            Self::Type(expected) => {
                write!(f, "value is not of the expected type `{expected}`")
            }
            Self::Busy => write!(f, "model value is already borrowed"),
        }
    }
}

impl Error for AssignError {}

/// Rendering of a field value for the debug serializer.
pub enum Rendered {
    /// Field has no value.
    Null,

    /// Value rendered verbatim
    ///   (numbers and booleans).
    Raw(String),

    /// Value rendered as a quoted string
    ///   (text and literal names).
    Quoted(String),

    Texts(Vec<String>),
    Model(Rc<dyn AnyBound>),
    Models(Vec<Rc<dyn AnyBound>>),

    /// The value could not be inspected.
    Error(String),
}

/// A Rust type that may be the value of a schema field.
///
/// The [`FieldKind`] of a field is derived from its value type.
pub trait FieldValue: 'static {
    const KIND: FieldKind;

    /// Node type located by subnode specifications on this field.
    fn target() -> Option<TypeRef> {
        None
    }

    /// Literal type resolved by term queries on this field.
    fn literal() -> Option<LiteralRef> {
        None
    }

    fn assign(&mut self, data: FieldData) -> Result<(), AssignError>;
    fn render(&self) -> Rendered;
}

trait ParseScalar: Sized {
    fn parse_scalar(kind: FieldKind, text: &str) -> Result<Self, AssignError>;
}

macro_rules! parse_scalar_fromstr {
    ($($ty:ty),*) => {
        $(
            impl ParseScalar for $ty {
                fn parse_scalar(
                    kind: FieldKind,
                    text: &str,
                ) -> Result<Self, AssignError> {
                    text.parse()
                        .map_err(|_| AssignError::Parse(kind, text.into()))
                }
            }
        )*
    };
}

parse_scalar_fromstr!(i8, i16, i32, i64, f32, f64);

impl ParseScalar for bool {
    fn parse_scalar(_: FieldKind, text: &str) -> Result<Self, AssignError> {
        Ok(text.eq_ignore_ascii_case("true"))
    }
}

impl ParseScalar for String {
    fn parse_scalar(_: FieldKind, text: &str) -> Result<Self, AssignError> {
        Ok(text.into())
    }
}

fn scalar_of<T: ParseScalar>(
    kind: FieldKind,
    data: FieldData,
) -> Result<T, AssignError> {
    match data {
        FieldData::Scalar(text) => T::parse_scalar(kind, &text),
        other => Err(AssignError::Shape(kind, other.kind_name())),
    }
}

macro_rules! scalar_field {
    ($($ty:ty => $kind:ident, $render:ident;)*) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::$kind;

                fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
                    *self = scalar_of(Self::KIND, data)?;
                    Ok(())
                }

                fn render(&self) -> Rendered {
                    Rendered::$render(self.to_string())
                }
            }

            impl FieldValue for Option<$ty> {
                const KIND: FieldKind = FieldKind::$kind;

                fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
                    *self = Some(scalar_of(Self::KIND, data)?);
                    Ok(())
                }

                fn render(&self) -> Rendered {
                    match self {
                        Some(value) => Rendered::$render(value.to_string()),
                        None => Rendered::Null,
                    }
                }
            }
        )*
    };
}

scalar_field! {
    String => Text, Quoted;
    i8 => Byte, Raw;
    i16 => Short, Raw;
    i32 => Int, Raw;
    i64 => Long, Raw;
    bool => Bool, Raw;
    f32 => Float, Raw;
    f64 => Double, Raw;
}

impl<E: SyntaxLiteral> FieldValue for Option<E> {
    const KIND: FieldKind = FieldKind::Enum;

    fn literal() -> Option<LiteralRef> {
        Some(LiteralRef::of::<E>())
    }

    fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
        match data {
            FieldData::Literal(value) => {
                let value = value
                    .downcast_ref::<E>()
                    .ok_or(AssignError::Type(type_name::<E>()))?;

                *self = Some(*value);
                Ok(())
            }
            other => Err(AssignError::Shape(Self::KIND, other.kind_name())),
        }
    }

    fn render(&self) -> Rendered {
        match self {
            Some(value) => Rendered::Quoted(format!("{value:?}")),
            None => Rendered::Null,
        }
    }
}

fn model_of<T: 'static>(model: Rc<dyn AnyBound>) -> Result<Model<T>, AssignError> {
    downcast_model(model).ok_or(AssignError::Type(type_name::<T>()))
}

fn models_of<T: 'static>(
    kind: FieldKind,
    data: FieldData,
) -> Result<Vec<Model<T>>, AssignError> {
    match data {
        FieldData::Models(models) => models.into_iter().map(model_of::<T>).collect(),
        other => Err(AssignError::Shape(kind, other.kind_name())),
    }
}

impl<T: SyntaxNode> FieldValue for Option<Model<T>> {
    const KIND: FieldKind = FieldKind::Object;

    fn target() -> Option<TypeRef> {
        Some(TypeRef::of::<T>())
    }

    fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
        match data {
            FieldData::Model(model) => {
                *self = Some(model_of(model)?);
                Ok(())
            }
            other => Err(AssignError::Shape(Self::KIND, other.kind_name())),
        }
    }

    fn render(&self) -> Rendered {
        match self {
            Some(model) => Rendered::Model(model.clone()),
            None => Rendered::Null,
        }
    }
}

impl<T: SyntaxNode> FieldValue for Vec<Model<T>> {
    const KIND: FieldKind = FieldKind::List;

    fn target() -> Option<TypeRef> {
        Some(TypeRef::of::<T>())
    }

    fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
        *self = models_of(Self::KIND, data)?;
        Ok(())
    }

    fn render(&self) -> Rendered {
        Rendered::Models(
            self.iter().map(|m| m.clone() as Rc<dyn AnyBound>).collect(),
        )
    }
}

impl<T: SyntaxNode> FieldValue for Box<[Model<T>]> {
    const KIND: FieldKind = FieldKind::Array;

    fn target() -> Option<TypeRef> {
        Some(TypeRef::of::<T>())
    }

    fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
        *self = models_of(Self::KIND, data)?.into_boxed_slice();
        Ok(())
    }

    fn render(&self) -> Rendered {
        Rendered::Models(
            self.iter().map(|m| m.clone() as Rc<dyn AnyBound>).collect(),
        )
    }
}

impl FieldValue for Vec<String> {
    const KIND: FieldKind = FieldKind::TextList;

    fn assign(&mut self, data: FieldData) -> Result<(), AssignError> {
        match data {
            FieldData::Texts(texts) => {
                *self = texts;
                Ok(())
            }
            other => Err(AssignError::Shape(Self::KIND, other.kind_name())),
        }
    }

    fn render(&self) -> Rendered {
        Rendered::Texts(self.clone())
    }
}

/// A type bound from tree nodes of a single grammar rule.
pub trait SyntaxNode: Sized + 'static {
    /// Declare the rule,
    ///   constructor and fields of this type.
    fn describe(def: &mut NodeDef<Self>);
}

/// An enumeration resolvable from terminal text or predicate queries.
///
/// The [`Debug`] representation of a value is used when rendering models.
pub trait SyntaxLiteral: Copy + Debug + Send + Sync + 'static {
    /// Declare the rule,
    ///   string query and values of this literal.
    fn describe(def: &mut LiteralDef<Self>);
}

/// Lookup mode of a subnode specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookup {
    /// Only a candidate root whose own rule name matches the target.
    ///
    /// Without a scope query,
    ///   the candidate roots are the direct children of the node being
    ///   filled.
    Immediate,

    /// A candidate root whose rule name matches the target,
    ///   or otherwise its nearest matching descendants.
    #[default]
    Nearest,
}

/// Declaration of how a model field locates nested nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnodeDef {
    pub(crate) scope: Option<String>,
    pub(crate) lookup: Lookup,
}

impl SubnodeDef {
    /// Match the target rule among the direct children of the node being
    ///   filled.
    pub fn immediate() -> Self {
        Self {
            scope: None,
            lookup: Lookup::Immediate,
        }
    }

    /// Match the nearest descendants of the node being filled that have
    ///   the target rule.
    pub fn nearest() -> Self {
        Self {
            scope: None,
            lookup: Lookup::Nearest,
        }
    }

    /// Search from each node selected by `query` instead of from the node
    ///   being filled.
    pub fn scope<S: Into<String>>(mut self, query: S) -> Self {
        self.scope = Some(query.into());
        self
    }
}

/// Type-erased reference to a [`SyntaxNode`] type.
#[derive(Clone, Copy)]
pub struct TypeRef {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) declare: fn() -> NodeDecl,
}

impl TypeRef {
    pub fn of<T: SyntaxNode>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            declare: NodeDef::<T>::declare,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.name)
    }
}

/// Type-erased reference to a [`SyntaxLiteral`] type.
#[derive(Clone, Copy)]
pub struct LiteralRef {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) declare: fn() -> LiteralDecl,
}

impl LiteralRef {
    pub fn of<E: SyntaxLiteral>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: type_name::<E>(),
            declare: LiteralDef::<E>::declare,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Debug for LiteralRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiteralRef({})", self.name)
    }
}

pub(crate) type ConstructFn =
    Box<dyn Fn(&'static str, NodeId) -> Rc<dyn AnyBound> + Send + Sync>;
pub(crate) type AssignFn =
    Arc<dyn Fn(&dyn AnyBound, FieldData) -> Result<(), AssignError> + Send + Sync>;
pub(crate) type RenderFn = Arc<dyn Fn(&dyn AnyBound) -> Rendered + Send + Sync>;

/// Type-erased declaration of a [`SyntaxNode`],
///   as produced by [`SyntaxNode::describe`].
pub struct NodeDecl {
    pub(crate) ty: &'static str,
    pub(crate) id: TypeId,
    pub(crate) rule: Option<&'static str>,
    pub(crate) construct: Option<ConstructFn>,
    pub(crate) fields: Vec<FieldDecl>,
}

/// Type-erased declaration of a single field.
pub struct FieldDecl {
    pub(crate) name: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) terms: Vec<String>,
    pub(crate) subnodes: Vec<SubnodeDef>,
    pub(crate) target: Option<TypeRef>,
    pub(crate) literal: Option<LiteralRef>,
    pub(crate) assign: AssignFn,
    pub(crate) render: RenderFn,
}

/// Declaration builder for a [`SyntaxNode`].
pub struct NodeDef<T> {
    decl: NodeDecl,
    ctor: Option<fn() -> T>,
}

impl<T: SyntaxNode> NodeDef<T> {
    fn declare() -> NodeDecl {
        let mut def = Self {
            decl: NodeDecl {
                ty: type_name::<T>(),
                id: TypeId::of::<T>(),
                rule: None,
                construct: None,
                fields: Vec::new(),
            },
            ctor: None,
        };

        T::describe(&mut def);

        let NodeDef { mut decl, ctor } = def;

        decl.construct = ctor.map(|ctor| {
            Box::new(move |rule: &'static str, node: NodeId| {
                Rc::new(Bound::new(rule, node, ctor())) as Rc<dyn AnyBound>
            }) as ConstructFn
        });

        decl
    }

    /// Grammar rule that nodes of this type are bound from.
    pub fn rule(&mut self, name: &'static str) -> &mut Self {
        self.decl.rule = Some(name);
        self
    }

    /// Zero-argument constructor of new values.
    pub fn construct(&mut self, ctor: fn() -> T) -> &mut Self {
        self.ctor = Some(ctor);
        self
    }

    /// Use [`Default`] as the constructor of new values.
    pub fn construct_default(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.construct(T::default)
    }

    /// Declare a field accessed through `accessor`.
    ///
    /// Fields are filled in the order that they are declared.
    pub fn field<V, F>(&mut self, name: &'static str, accessor: F) -> FieldDef<'_>
    where
        V: FieldValue,
        F: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let render_accessor = accessor.clone();

        let assign: AssignFn = Arc::new(move |model: &dyn AnyBound, data: FieldData| {
            let bound = model
                .as_any()
                .downcast_ref::<Bound<T>>()
                .ok_or(AssignError::Type(type_name::<T>()))?;

            let mut value =
                bound.value.try_borrow_mut().map_err(|_| AssignError::Busy)?;

            (*accessor)(&mut *value).assign(data)
        });

        let render: RenderFn = Arc::new(move |model: &dyn AnyBound| {
            let Some(bound) = model.as_any().downcast_ref::<Bound<T>>() else {
                return Rendered::Error(format!(
                    "model is not a `{}`",
                    type_name::<T>()
                ));
            };

            match bound.value.try_borrow_mut() {
                Ok(mut value) => (*render_accessor)(&mut *value).render(),
                Err(_) => Rendered::Error("value is borrowed".into()),
            }
        });

        let index = self.decl.fields.len();

        self.decl.fields.push(FieldDecl {
            name,
            kind: V::KIND,
            terms: Vec::new(),
            subnodes: Vec::new(),
            target: V::target(),
            literal: V::literal(),
            assign,
            render,
        });

        FieldDef {
            decl: &mut self.decl.fields[index],
        }
    }
}

/// Binding declarations for a single field.
///
/// See [`NodeDef::field`].
pub struct FieldDef<'a> {
    decl: &'a mut FieldDecl,
}

impl<'a> FieldDef<'a> {
    /// Bind the field from the result of `query` evaluated against the
    ///   node being filled.
    ///
    /// Terms are evaluated in declaration order and each non-empty result
    ///   overwrites the last.
    pub fn term<S: Into<String>>(self, query: S) -> Self {
        self.decl.terms.push(query.into());
        self
    }

    /// Bind the field from nested nodes located by `spec`.
    pub fn subnode(self, spec: SubnodeDef) -> Self {
        self.decl.subnodes.push(spec);
        self
    }
}

/// Type-erased declaration of a [`SyntaxLiteral`].
pub struct LiteralDecl {
    pub(crate) ty: &'static str,
    pub(crate) id: TypeId,
    pub(crate) rule: Option<&'static str>,
    pub(crate) string: Option<String>,
    pub(crate) values: Vec<LiteralCase>,
}

/// A single named value of a literal.
pub struct LiteralCase {
    pub(crate) name: &'static str,
    pub(crate) value: LiteralValue,
    pub(crate) when: Option<String>,
}

/// Declaration builder for a [`SyntaxLiteral`].
pub struct LiteralDef<E> {
    decl: LiteralDecl,
    _ty: std::marker::PhantomData<fn() -> E>,
}

impl<E: SyntaxLiteral> LiteralDef<E> {
    fn declare() -> LiteralDecl {
        let mut def = Self {
            decl: LiteralDecl {
                ty: type_name::<E>(),
                id: TypeId::of::<E>(),
                rule: None,
                string: None,
                values: Vec::new(),
            },
            _ty: Default::default(),
        };

        E::describe(&mut def);
        def.decl
    }

    /// Grammar rule that this literal is bound from.
    pub fn rule(&mut self, name: &'static str) -> &mut Self {
        self.decl.rule = Some(name);
        self
    }

    /// Query computing the string to look up by name,
    ///   in place of the node's own text.
    pub fn string<S: Into<String>>(&mut self, query: S) -> &mut Self {
        self.decl.string = Some(query.into());
        self
    }

    /// Declare a value resolvable by `name`.
    pub fn value(&mut self, name: &'static str, value: E) -> &mut Self {
        self.decl.values.push(LiteralCase {
            name,
            value: Arc::new(value),
            when: None,
        });
        self
    }

    /// Declare a value resolvable by `name`,
    ///   or otherwise when `predicate` is true of the node.
    ///
    /// Predicates are tested in declaration order.
    pub fn value_when<S: Into<String>>(
        &mut self,
        name: &'static str,
        value: E,
        predicate: S,
    ) -> &mut Self {
        self.decl.values.push(LiteralCase {
            name,
            value: Arc::new(value),
            when: Some(predicate.into()),
        });
        self
    }
}

#[cfg(test)]
mod test;
