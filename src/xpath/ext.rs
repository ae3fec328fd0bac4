// Query extension functions
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

//! Extension functions for schema queries.
//!
//! These are registered by [`FunctionLibrary::standard`]:
//!
//!   - `echo(value, ...)` writes each of its arguments to standard error
//!       and yields its first argument unchanged;
//!   - `rootOf(nodes)` yields the root of the tree containing the first
//!       node of `nodes`;
//!   - `flatten(roots, step, justLeaves?, includeRoot?)` expands `roots`
//!       through the query `step`,
//!         which computes the logical children of a node; and
//!   - `joinStrings(separator, nodes, ...)` joins the text of every node
//!       of every argument.
//!
//! Node-sets produced by `flatten` are in the order nodes were emitted,
//!   not document order.

use super::{
    func::{describe_value, node_set_arg, FunctionLibrary},
    Context, Env, Value, XPathError,
};
use crate::tree::{NodeId, NodeSet};

/// Add the extension functions to `lib`.
pub fn register(lib: &mut FunctionLibrary) {
    lib.define("echo", 1, None, echo)
        .define("rootOf", 1, Some(1), root_of)
        .define("flatten", 2, Some(4), flatten)
        .define("joinStrings", 1, None, join_strings);
}

/// Diagnostic output of argument values.
///
/// This has no effect on evaluation.
fn echo(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    for (i, arg) in args.iter().enumerate() {
        eprintln!("[xpath::echo] {}: {}", i + 1, describe_value(env, arg));
    }

    Ok(args.into_iter().next().unwrap_or(Value::NodeSet(vec![])))
}

/// Root of the tree containing the first node of the argument,
///   or the empty node-set if there is no such node.
fn root_of(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let nodes = first_node_set("rootOf", args)?;

    Ok(match nodes.first() {
        Some(&node) => Value::Node(env.tree.root_of(node)),
        None => Value::NodeSet(vec![]),
    })
}

fn first_node_set(
    func: &'static str,
    args: Vec<Value>,
) -> Result<Vec<NodeId>, XPathError> {
    node_set_arg(func, 1, args.into_iter().next().unwrap_or(Value::NodeSet(vec![])))
}

/// Expand `roots` through the query `step`.
///
/// A node's logical children are the nodes selected by `step` evaluated
///   with that node as context.
/// Expansion is depth-first and left-to-right using an explicit stack.
///
///   - If `justLeaves`,
///       only nodes with no logical children are emitted.
///   - Otherwise every expanded node is emitted before its children.
///   - If not `includeRoot`,
///       the roots are never emitted but only expanded.
///
/// A node is expanded at most once,
///   so a `step` that revisits nodes cannot loop forever.
fn flatten(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let mut args = args.into_iter();

    let roots = node_set_arg("flatten", 1, args.next().unwrap_or(Value::NodeSet(vec![])))?;
    let step_text = args
        .next()
        .map(|v| v.to_string_value(env.tree))
        .unwrap_or_default();
    let just_leaves = args.next().map_or(false, |v| v.to_boolean());
    let include_root = args.next().map_or(true, |v| v.to_boolean());

    let step = env.queries.compile(&step_text)?;

    let mut visited = NodeSet::new();
    let mut out = Vec::new();
    let mut stack = roots
        .into_iter()
        .rev()
        .map(|node| (node, true))
        .collect::<Vec<_>>();

    while let Some((node, is_root)) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }

        let children = step
            .evaluate(env, node)?
            .into_nodes()
            .ok_or(XPathError::NotNodeSet {
                context: "flatten() step",
                found: "scalar",
            })?;

        let emit = match (is_root && !include_root, just_leaves) {
            (true, _) => false,
            (false, true) => children.is_empty(),
            (false, false) => true,
        };

        if emit {
            out.push(node);
        }

        stack.extend(children.into_iter().rev().map(|child| (child, false)));
    }

    Ok(Value::NodeSet(out))
}

/// Join the text of every node of every argument after the first with the
///   separator given by the first.
///
/// A scalar argument contributes its string value as a single item.
fn join_strings(
    env: &Env<'_>,
    _: &Context,
    args: Vec<Value>,
) -> Result<Value, XPathError> {
    let mut args = args.into_iter();
    let sep = args
        .next()
        .map(|v| v.to_string_value(env.tree))
        .unwrap_or_default();

    let mut items = Vec::new();

    for arg in args {
        match arg.nodes() {
            Some(nodes) => {
                items.extend(nodes.iter().map(|&node| env.tree.text(node)))
            }
            None => items.push(arg.to_string_value(env.tree).into()),
        }
    }

    Ok(Value::String(items.join(sep.as_str())))
}
