// Binding errors
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

//! Errors encountered while binding a tree.

use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic, Level},
    model::{AssignError, FieldKind},
    span::Span,
    tree::NodeId,
    xpath::XPathError,
};

/// A problem binding a single node or field.
///
/// Spans are those of the node being filled when the error occurred,
///   or [`UNKNOWN_SPAN`](crate::span::UNKNOWN_SPAN) if the raw tree does
///   not report intervals.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// The requested type was never introduced to the
    ///   [`SyntaxModel`](crate::registry::SyntaxModel).
    Unregistered { type_name: &'static str },

    /// A query failed while being evaluated against a node.
    ///
    /// The field is [`None`] for queries of literal types.
    Query {
        rule: &'static str,
        field: Option<&'static str>,
        query: String,
        span: Span,
        err: XPathError,
    },

    /// A term produced text that could not be parsed as its field's
    ///   scalar kind.
    ScalarParse {
        rule: &'static str,
        field: &'static str,
        kind: FieldKind,
        text: String,
        span: Span,
    },

    /// A term for a single-valued field selected more than one node;
    ///   the first was used.
    AmbiguousScalar {
        rule: &'static str,
        field: &'static str,
        count: usize,
        span: Span,
    },

    /// A scope query produced a value other than a node-set.
    ScopeNotNodeSet {
        rule: &'static str,
        field: &'static str,
        query: String,
        found: &'static str,
        span: Span,
    },

    /// A node already has a model of a different type than the one
    ///   requested.
    ModelMismatch {
        node: NodeId,
        existing: &'static str,
        requested: &'static str,
        span: Span,
    },

    /// A model array field was reached.
    ///
    /// Arrays are recognized by the schema but cannot be bound;
    ///   this always ends the binding pass.
    UnsupportedArray {
        rule: &'static str,
        field: &'static str,
    },

    /// Data computed for a field could not be assigned to it.
    Assign {
        rule: &'static str,
        field: &'static str,
        err: AssignError,
        span: Span,
    },
}

impl BindError {
    /// Whether this error ends the binding pass regardless of
    ///   [`FieldErrorPolicy`](super::FieldErrorPolicy).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedArray { .. })
    }
}

impl Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use BindError::*;

        match self {
            Unregistered { type_name } => {
                write!(f, "type `{type_name}` is not registered")
            }

            Query {
                rule,
                field: Some(field),
                query,
                err,
                ..
            } => write!(
                f,
                "query `{query}` of field `{field}` failed on `{rule}`: {err}"
            ),
            Query {
                rule,
                field: None,
                query,
                err,
                ..
            } => write!(f, "query `{query}` failed on `{rule}`: {err}"),

            ScalarParse {
                rule,
                field,
                kind,
                text,
                ..
            } => write!(
                f,
                "cannot bind `{text}` to {kind} field `{field}` of `{rule}`"
            ),

            AmbiguousScalar {
                rule, field, count, ..
            } => write!(
                f,
                "field `{field}` of `{rule}` selected {count} nodes"
            ),

            ScopeNotNodeSet {
                rule,
                field,
                query,
                found,
                ..
            } => write!(
                f,
                "scope `{query}` of field `{field}` on `{rule}` \
                    produced a {found}"
            ),

            ModelMismatch {
                node,
                existing,
                requested,
                ..
            } => write!(
                f,
                "node {node} is bound to `{existing}`, not `{requested}`"
            ),

            UnsupportedArray { rule, field } => write!(
                f,
                "array field `{field}` of `{rule}` cannot be bound"
            ),

            Assign {
                rule, field, err, ..
            } => write!(f, "cannot assign field `{field}` of `{rule}`: {err}"),
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query { err, .. } => Some(err),
            Self::Assign { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl Diagnostic for BindError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use BindError::*;

        match self {
            Unregistered { .. } => vec![],

            Query { span, err, .. } => {
                let mut desc = vec![span.error("while binding this node")];
                desc.extend(err.describe());
                desc
            }

            ScalarParse { span, kind, .. } => {
                vec![span.error(format!("expected {kind} text here"))]
            }

            AmbiguousScalar { span, .. } => span
                .warning("while binding this node")
                .with_help("the first selected node was used")
                .into(),

            ScopeNotNodeSet { span, .. } => span
                .error("while binding this node")
                .with_help("a scope query must select nodes")
                .into(),

            ModelMismatch { span, .. } => {
                vec![span.internal_error("a node binds to at most one model")]
            }

            UnsupportedArray { .. } => vec![],

            Assign { span, .. } => {
                vec![span.internal_error("while binding this node")]
            }
        }
    }

    fn level(&self) -> Level {
        use BindError::*;

        match self {
            AmbiguousScalar { .. } => Level::Warning,
            ModelMismatch { .. } | UnsupportedArray { .. } | Assign { .. } => {
                Level::InternalError
            }
            _ => Level::Error,
        }
    }
}
