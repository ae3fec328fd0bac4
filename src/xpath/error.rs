// Query errors
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

//! Errors while compiling or evaluating queries.

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::UNKNOWN_SPAN,
};
use std::{error::Error, fmt::Display};

/// Query compilation or evaluation failure.
///
/// Offsets are byte offsets into the text of the query,
///   not into the source of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathError {
    /// A character that cannot begin any token.
    UnexpectedChar(char, usize),

    /// A string literal with no closing quote.
    UnterminatedLiteral(usize),

    /// A token that is not valid where it appears.
    UnexpectedToken(String, usize),

    /// The query ended in the middle of an expression.
    UnexpectedEnd,

    UnknownAxis(String, usize),

    /// A call to a function that is not in the function library.
    UnknownFunction(String, usize),

    /// A function called with an unsupported number of arguments.
    Arity {
        name: String,
        given: usize,
        at: usize,
    },

    /// Variable references cannot be bound by schema queries.
    UnsupportedVariable(String, usize),

    /// An operation requiring a node-set was given some other value.
    NotNodeSet {
        context: &'static str,
        found: &'static str,
    },

    /// A function argument of the wrong type.
    ArgType {
        func: &'static str,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// Failure reported by a caller-defined function.
    Function(String, String),
}

impl Display for XPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use XPathError::*;

        match self {
            UnexpectedChar(c, at) => {
                write!(f, "unexpected character `{c}` at offset {at}")
            }
            UnterminatedLiteral(at) => {
                write!(f, "unterminated string literal at offset {at}")
            }
            UnexpectedToken(token, at) => {
                write!(f, "unexpected {token} at offset {at}")
            }
            UnexpectedEnd => write!(f, "unexpected end of query"),
            UnknownAxis(name, at) => {
                write!(f, "unknown axis `{name}` at offset {at}")
            }
            UnknownFunction(name, at) => {
                write!(f, "unknown function `{name}()` at offset {at}")
            }
            Arity { name, given, at } => write!(
                f,
                "function `{name}()` does not accept {given} argument(s) \
                    (at offset {at})"
            ),
            UnsupportedVariable(name, at) => {
                write!(f, "unsupported variable reference `${name}` at offset {at}")
            }
            NotNodeSet { context, found } => {
                write!(f, "{context} requires a node-set, but found a {found}")
            }
            ArgType {
                func,
                index,
                expected,
                found,
            } => write!(
                f,
                "argument {index} of `{func}()` must be a {expected}, \
                    but found a {found}"
            ),
            Function(name, msg) => write!(f, "function `{name}()` failed: {msg}"),
        }
    }
}

impl Error for XPathError {}

impl Diagnostic for XPathError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use XPathError::*;

        match self {
            UnsupportedVariable(..) => vec![UNKNOWN_SPAN
                .help("queries are evaluated without any variable bindings")],

            UnknownFunction(..) => vec![UNKNOWN_SPAN.help(
                "functions must be defined in the library used to compile \
                    the query",
            )],

            _ => vec![],
        }
    }
}
