// Schema configuration errors
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

//! Schema configuration errors.

use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic, Level},
    model::FieldKind,
    span::UNKNOWN_SPAN,
    xpath::XPathError,
};

/// A defect in a schema discovered while introducing it to a
///   [`SyntaxModel`](super::SyntaxModel).
///
/// These are mistakes of the schema author,
///   not of any tree,
///   and so have no source span.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A node or literal type did not declare its grammar rule.
    ///
    /// The referrer is the type whose field referenced it,
    ///   or [`None`] for the entry type.
    MissingRule {
        type_name: &'static str,
        referrer: Option<&'static str>,
    },

    /// A node type did not declare a constructor.
    MissingConstructor { type_name: &'static str },

    /// Two distinct node types declared the same rule.
    DuplicateRule {
        rule: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// A field declared both term queries and subnode specifications.
    TermWithSubnode {
        type_name: &'static str,
        field: &'static str,
    },

    /// A scalar, literal or text list field declared subnode
    ///   specifications.
    SubnodeOnValue {
        type_name: &'static str,
        field: &'static str,
        kind: FieldKind,
    },

    /// A nested model field declared term queries.
    TermOnModel {
        type_name: &'static str,
        field: &'static str,
        kind: FieldKind,
    },

    /// Two distinct literal types declared the same rule.
    AmbiguousLiteral {
        rule: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// A literal type declared no values.
    EmptyLiteral { type_name: &'static str },

    /// A literal type declared the same value name twice.
    DuplicateLiteralName {
        type_name: &'static str,
        name: &'static str,
    },

    /// A query declared by a type failed to compile.
    Query {
        type_name: &'static str,
        field: Option<&'static str>,
        query: String,
        err: XPathError,
    },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ModelError::*;

        match self {
            MissingRule {
                type_name,
                referrer: Some(referrer),
            } => write!(
                f,
                "type `{type_name}` (referenced by `{referrer}`) \
                    declares no rule"
            ),
            MissingRule {
                type_name,
                referrer: None,
            } => write!(f, "type `{type_name}` declares no rule"),

            MissingConstructor { type_name } => {
                write!(f, "type `{type_name}` declares no constructor")
            }

            DuplicateRule {
                rule,
                first,
                second,
            } => write!(
                f,
                "rule `{rule}` is declared by both `{first}` and `{second}`"
            ),

            TermWithSubnode { type_name, field } => write!(
                f,
                "field `{type_name}::{field}` declares both terms and subnodes"
            ),

            SubnodeOnValue {
                type_name,
                field,
                kind,
            } => write!(
                f,
                "{kind} field `{type_name}::{field}` cannot be bound \
                    from subnodes"
            ),

            TermOnModel {
                type_name,
                field,
                kind,
            } => write!(
                f,
                "{kind} field `{type_name}::{field}` cannot be bound \
                    from terms"
            ),

            AmbiguousLiteral {
                rule,
                first,
                second,
            } => write!(
                f,
                "literal rule `{rule}` is declared by both `{first}` \
                    and `{second}`"
            ),

            EmptyLiteral { type_name } => {
                write!(f, "literal `{type_name}` declares no values")
            }

            DuplicateLiteralName { type_name, name } => {
                write!(f, "literal `{type_name}` declares `{name}` twice")
            }

            Query {
                type_name,
                field: Some(field),
                query,
                err,
            } => write!(
                f,
                "bad query `{query}` on field `{type_name}::{field}`: {err}"
            ),
            Query {
                type_name,
                field: None,
                query,
                err,
            } => write!(f, "bad query `{query}` on `{type_name}`: {err}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl Diagnostic for ModelError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use ModelError::*;

        match self {
            MissingRule { .. } => vec![UNKNOWN_SPAN
                .help("declare a rule with `rule(\"name\")` in `describe`")],

            MissingConstructor { .. } => vec![UNKNOWN_SPAN.help(
                "declare a constructor with `construct` or \
                    `construct_default`",
            )],

            TermWithSubnode { .. } => vec![UNKNOWN_SPAN
                .help("a field is bound either by terms or by subnodes")],

            EmptyLiteral { .. } => vec![UNKNOWN_SPAN.help(
                "a literal must declare at least one value to be resolvable",
            )],

            Query { err, .. } => err.describe(),

            _ => vec![],
        }
    }

    fn level(&self) -> Level {
        Level::InternalError
    }
}

/// Every configuration error found while introducing a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelErrors(pub(super) Vec<ModelError>);

impl ModelErrors {
    pub fn errors(&self) -> &[ModelError] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<ModelError> {
        self.0
    }
}

impl Display for ModelErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "schema has {} error(s)", self.0.len())?;

        for err in &self.0 {
            write!(f, "\n  {err}")?;
        }

        Ok(())
    }
}

impl Error for ModelErrors {}

impl Diagnostic for ModelErrors {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        self.0.iter().flat_map(ModelError::describe).collect()
    }

    fn level(&self) -> Level {
        Level::InternalError
    }
}
