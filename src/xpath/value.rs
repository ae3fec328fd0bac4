// Query result values
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

//! Query result values and their conversions.

use crate::tree::{Navigate, NodeId};
use std::fmt::Write;

/// Result of evaluating a query.
///
/// A [`Value::Node`] is a single node produced by a function and behaves in
///   every respect as a node-set of one.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Node(NodeId),
    NodeSet(Vec<NodeId>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    /// Nodes of a node-set or single node,
    ///   or [`None`] for a scalar.
    pub fn nodes(&self) -> Option<&[NodeId]> {
        match self {
            Self::Node(node) => Some(std::slice::from_ref(node)),
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodes(self) -> Option<Vec<NodeId>> {
        match self {
            Self::Node(node) => Some(vec![node]),
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn is_node_set(&self) -> bool {
        self.nodes().is_some()
    }

    /// The single node of a node-set of exactly one node.
    pub fn single_node(&self) -> Option<NodeId> {
        match self.nodes() {
            Some([node]) => Some(*node),
            _ => None,
        }
    }

    /// Whether this value carries nothing to bind:
    ///   an empty string or an empty node-set.
    ///
    /// Numbers and booleans are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.is_empty(),
            Self::Node(_) => false,
            Self::NodeSet(nodes) => nodes.is_empty(),
            Self::Number(_) | Self::Boolean(_) => false,
        }
    }

    /// Name of the XPath type of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Node(_) | Self::NodeSet(_) => "node-set",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
        }
    }

    /// XPath `boolean()` conversion.
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Node(_) => true,
            Self::NodeSet(nodes) => !nodes.is_empty(),
            Self::String(s) => !s.is_empty(),
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Boolean(b) => *b,
        }
    }

    /// XPath `string()` conversion.
    ///
    /// The string value of a node-set is that of its first node.
    pub fn to_string_value(&self, tree: &dyn Navigate) -> String {
        match self {
            Self::Node(node) => tree.text(*node).to_string(),
            Self::NodeSet(nodes) => nodes
                .first()
                .map(|node| tree.text(*node).to_string())
                .unwrap_or_default(),
            Self::String(s) => s.clone(),
            Self::Number(n) => number_to_string(*n),
            Self::Boolean(b) => b.to_string(),
        }
    }

    /// XPath `number()` conversion.
    pub fn to_number(&self, tree: &dyn Navigate) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Boolean(true) => 1.0,
            Self::Boolean(false) => 0.0,
            Self::String(s) => string_to_number(s),
            Self::Node(_) | Self::NodeSet(_) => {
                string_to_number(&self.to_string_value(tree))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<Vec<NodeId>> for Value {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self::NodeSet(nodes)
    }
}

/// Format a number the way XPath's `string()` does:
///   integers have no fractional part,
///   and there is never an exponent.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.into()
    } else if n == 0.0 {
        // includes negative zero
        "0".into()
    } else if n.fract() == 0.0 && n.abs() < 1e17 {
        let mut out = String::new();
        let _ = write!(out, "{}", n as i64);
        out
    } else {
        // `Display` for `f64` never uses an exponent.
        n.to_string()
    }
}

/// Parse a string the way XPath's `number()` does.
///
/// Only an optional minus sign followed by digits with at most one
///   decimal point is recognized,
///     surrounded by optional whitespace;
///   anything else is `NaN`.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    let digits = s.strip_prefix('-').unwrap_or(s);

    let mut seen_digit = false;
    let mut seen_point = false;

    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return f64::NAN,
        }
    }

    if !seen_digit {
        return f64::NAN;
    }

    s.parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbers_format_without_exponent_or_trailing_zero() {
        assert_eq!("3", number_to_string(3.0));
        assert_eq!("-3", number_to_string(-3.0));
        assert_eq!("0", number_to_string(-0.0));
        assert_eq!("0.5", number_to_string(0.5));
        assert_eq!("NaN", number_to_string(f64::NAN));
        assert_eq!("-Infinity", number_to_string(f64::NEG_INFINITY));
    }

    #[test]
    fn strings_parse_as_xpath_numbers() {
        assert_eq!(12.0, string_to_number(" 12 "));
        assert_eq!(-0.5, string_to_number("-.5"));
        assert_eq!(3.0, string_to_number("3."));
        assert!(string_to_number("1e5").is_nan());
        assert!(string_to_number("+1").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("").is_nan());
        assert!(string_to_number(".").is_nan());
    }

    #[test]
    fn emptiness_of_values() {
        assert!(Value::from("").is_empty());
        assert!(Value::NodeSet(vec![]).is_empty());
        assert!(!Value::Boolean(false).is_empty());
        assert!(!Value::Number(0.0).is_empty());
    }
}
