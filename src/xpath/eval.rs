// Query evaluation
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

//! Query evaluation.
//!
//! Evaluation is a direct walk of the parsed [`Expr`].
//! Every location step yields a node-set in document order without
//!   duplicates;
//!     predicates see the candidates of a single context node in axis
//!     order,
//!       so that positions along reverse axes count backwards from the
//!       context node as XPath requires.
//!
//! Axes that would require walking the entire tree
//!   (`descendant`, `following` and `preceding`)
//!   do so with explicit stacks rather than recursion,
//!     since parse trees of generated input can be very deep.

use super::{
    parser::{ArithOp, Axis, CmpOp, Expr, NodeTest, PathStart, Step},
    Context, Env, Value, XPathError,
};
use crate::tree::{Navigate, NodeId, NodeSet};

pub fn evaluate(
    expr: &Expr,
    env: &Env<'_>,
    ctx: &Context,
) -> Result<Value, XPathError> {
    use Expr::*;

    Ok(match expr {
        Or(a, b) => Value::Boolean(
            evaluate(a, env, ctx)?.to_boolean()
                || evaluate(b, env, ctx)?.to_boolean(),
        ),

        And(a, b) => Value::Boolean(
            evaluate(a, env, ctx)?.to_boolean()
                && evaluate(b, env, ctx)?.to_boolean(),
        ),

        Compare(op, a, b) => {
            let a = evaluate(a, env, ctx)?;
            let b = evaluate(b, env, ctx)?;

            Value::Boolean(compare(env.tree, *op, a, b))
        }

        Arith(op, a, b) => {
            let a = evaluate(a, env, ctx)?.to_number(env.tree);
            let b = evaluate(b, env, ctx)?.to_number(env.tree);

            Value::Number(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                // Truncating remainder,
                //   as XPath's `mod`.
                ArithOp::Mod => a % b,
            })
        }

        Neg(a) => Value::Number(-evaluate(a, env, ctx)?.to_number(env.tree)),

        Union(a, b) => {
            let a = node_set(evaluate(a, env, ctx)?, "union")?;
            let b = node_set(evaluate(b, env, ctx)?, "union")?;

            let mut set = NodeSet::new();
            a.into_iter().chain(b).for_each(|node| {
                set.insert(node);
            });

            let mut nodes = set.into_vec();
            env.tree.sort_document_order(&mut nodes);
            Value::NodeSet(nodes)
        }

        Literal(s) => Value::String(s.clone()),
        Number(n) => Value::Number(*n),

        Call(call) => {
            let args = call
                .args
                .iter()
                .map(|arg| evaluate(arg, env, ctx))
                .collect::<Result<Vec<_>, _>>()?;

            call.func.call(env, ctx, args)?
        }

        Filter(primary, predicates) => {
            let mut nodes = node_set(evaluate(primary, env, ctx)?, "predicate")?;

            for pred in predicates {
                nodes = filter(env, pred, nodes)?;
            }

            Value::NodeSet(nodes)
        }

        Path(start, steps) => {
            let (absolute, set) = match start {
                PathStart::Root => {
                    (true, PathSet::document(env.tree.root_of(ctx.node)))
                }
                PathStart::Context => (false, PathSet::nodes(vec![ctx.node])),
                PathStart::Expr(expr) => (
                    false,
                    PathSet::nodes(node_set(evaluate(expr, env, ctx)?, "path")?),
                ),
            };

            Value::NodeSet(
                steps
                    .iter()
                    .try_fold(set, |set, step| eval_step(env, step, set))?
                    .into_nodes(absolute),
            )
        }
    })
}

fn node_set(
    value: Value,
    context: &'static str,
) -> Result<Vec<NodeId>, XPathError> {
    let found = value.type_name();

    value
        .into_nodes()
        .ok_or(XPathError::NotNodeSet { context, found })
}

/// Nodes selected so far by a location path.
///
/// The document node above the root of the tree is not a [`NodeId`];
///   it is tracked separately by the root beneath it.
/// It may be selected by any step,
///   but it never appears in the result of an expression:
///     an absolute path that ends on it yields the root,
///     and a relative path that ends on it yields nothing.
struct PathSet {
    document: Option<NodeId>,
    nodes: Vec<NodeId>,
}

impl PathSet {
    fn document(root: NodeId) -> Self {
        Self {
            document: Some(root),
            nodes: vec![],
        }
    }

    fn nodes(nodes: Vec<NodeId>) -> Self {
        Self {
            document: None,
            nodes,
        }
    }

    fn into_nodes(self, absolute: bool) -> Vec<NodeId> {
        match self.document {
            // The root precedes every other node in document order.
            Some(root) if absolute && !self.nodes.contains(&root) => {
                std::iter::once(root).chain(self.nodes).collect()
            }
            _ => self.nodes,
        }
    }
}

/// Apply a location step to every node of `set`.
fn eval_step(
    env: &Env<'_>,
    step: &Step,
    set: PathSet,
) -> Result<PathSet, XPathError> {
    let tree = env.tree;
    let mut found = NodeSet::new();
    let mut document = None;

    // Only `node()` matches the document node.
    // Predicates are evaluated against tree nodes,
    //   so a step with predicates never selects it.
    let keeps_document =
        matches!(step.test, NodeTest::Node) && step.predicates.is_empty();

    if let Some(root) = set.document {
        let (this, mut candidates) = document_axis(tree, step.axis, root);
        candidates.retain(|&c| node_test(tree, &step.test, c));

        for pred in &step.predicates {
            candidates = filter(env, pred, candidates)?;
        }

        if this && keeps_document {
            document = Some(root);
        }

        candidates.into_iter().for_each(|c| {
            found.insert(c);
        });
    }

    for &node in &set.nodes {
        let mut candidates = axis(tree, step.axis, node);
        candidates.retain(|&c| node_test(tree, &step.test, c));

        for pred in &step.predicates {
            candidates = filter(env, pred, candidates)?;
        }

        if keeps_document && reaches_document(tree, step.axis, node) {
            document = Some(tree.root_of(node));
        }

        candidates.into_iter().for_each(|c| {
            found.insert(c);
        });
    }

    let mut out = found.into_vec();
    let contexts = set.nodes.len() + usize::from(set.document.is_some());

    // Candidates of a single context node are already in axis order.
    match contexts {
        1 if step.axis.is_reverse() => out.reverse(),
        1 => (),
        _ => tree.sort_document_order(&mut out),
    }

    Ok(PathSet {
        document,
        nodes: out,
    })
}

/// Tree nodes along `axis` from the document node above `root`,
///   along with whether the document node itself is on that axis.
fn document_axis(
    tree: &dyn Navigate,
    axis: Axis,
    root: NodeId,
) -> (bool, Vec<NodeId>) {
    use Axis::*;

    let all = || {
        let mut out = vec![root];
        out.extend(descendants(tree, root));
        out
    };

    match axis {
        Child => (false, vec![root]),
        Descendant => (false, all()),
        DescendantOrSelf => (true, all()),
        SelfAxis | AncestorOrSelf => (true, vec![]),
        _ => (false, vec![]),
    }
}

/// Whether the document node lies along `axis` from `node`.
fn reaches_document(tree: &dyn Navigate, axis: Axis, node: NodeId) -> bool {
    match axis {
        Axis::Parent => tree.parent(node).is_none(),
        Axis::Ancestor | Axis::AncestorOrSelf => true,
        _ => false,
    }
}

/// Retain the nodes for which `pred` holds,
///   where a numeric predicate is a test of position.
fn filter(
    env: &Env<'_>,
    pred: &Expr,
    nodes: Vec<NodeId>,
) -> Result<Vec<NodeId>, XPathError> {
    let size = nodes.len();
    let mut out = Vec::with_capacity(size);

    for (i, node) in nodes.into_iter().enumerate() {
        let ctx = Context {
            node,
            position: i + 1,
            size,
        };

        let keep = match evaluate(pred, env, &ctx)? {
            Value::Number(n) => n == ctx.position as f64,
            other => other.to_boolean(),
        };

        if keep {
            out.push(node);
        }
    }

    Ok(out)
}

fn node_test(tree: &dyn Navigate, test: &NodeTest, node: NodeId) -> bool {
    match test {
        NodeTest::Name(name) => *tree.name(node) == **name,
        NodeTest::Any | NodeTest::Node => true,
        NodeTest::Text => tree.is_leaf(node),
        NodeTest::Never => false,
    }
}

/// Nodes along `axis` from `node` in axis order.
fn axis(tree: &dyn Navigate, axis: Axis, node: NodeId) -> Vec<NodeId> {
    use Axis::*;

    match axis {
        Child => tree.children(node).to_vec(),
        Descendant => descendants(tree, node),
        DescendantOrSelf => {
            let mut out = vec![node];
            out.extend(descendants(tree, node));
            out
        }
        Parent => tree.parent(node).into_iter().collect(),
        Ancestor => ancestors(tree, node),
        AncestorOrSelf => {
            let mut out = vec![node];
            out.extend(ancestors(tree, node));
            out
        }
        SelfAxis => vec![node],
        FollowingSibling => siblings(tree, node)
            .map(|(sibs, i)| sibs[i + 1..].to_vec())
            .unwrap_or_default(),
        PrecedingSibling => siblings(tree, node)
            .map(|(sibs, i)| sibs[..i].iter().rev().copied().collect())
            .unwrap_or_default(),
        Following => following(tree, node),
        Preceding => preceding(tree, node),
        Attribute | Namespace => vec![],
    }
}

/// All descendants of `node` in document order.
fn descendants(tree: &dyn Navigate, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = tree.children(node).iter().rev().copied().collect::<Vec<_>>();

    while let Some(cur) = stack.pop() {
        out.push(cur);
        stack.extend(tree.children(cur).iter().rev().copied());
    }

    out
}

fn ancestors(tree: &dyn Navigate, node: NodeId) -> Vec<NodeId> {
    std::iter::successors(tree.parent(node), |&cur| tree.parent(cur)).collect()
}

/// Children of the parent of `node` along with the index of `node` among
///   them.
fn siblings(
    tree: &dyn Navigate,
    node: NodeId,
) -> Option<(std::rc::Rc<[NodeId]>, usize)> {
    tree.parent(node)
        .map(|parent| (tree.children(parent), tree.sibling_index(node)))
}

/// Nodes after `node` in document order that are not its descendants.
fn following(tree: &dyn Navigate, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = node;

    while let Some((sibs, i)) = siblings(tree, cur) {
        for &sib in &sibs[i + 1..] {
            out.push(sib);
            out.extend(descendants(tree, sib));
        }

        cur = tree.parent(cur).unwrap_or(cur);
    }

    out
}

/// Nodes before `node` in reverse document order that are not its
///   ancestors.
fn preceding(tree: &dyn Navigate, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = node;

    while let Some((sibs, i)) = siblings(tree, cur) {
        for &sib in sibs[..i].iter().rev() {
            out.extend(descendants(tree, sib).into_iter().rev());
            out.push(sib);
        }

        cur = tree.parent(cur).unwrap_or(cur);
    }

    out
}

/// Compare two values as XPath's `=`, `!=`, `<`, `<=`, `>` and `>=`.
///
/// A comparison involving a node-set holds if it holds for the string
///   value of any of its nodes,
///     except that a node-set compared with a boolean is first converted
///     to a boolean.
fn compare(tree: &dyn Navigate, op: CmpOp, a: Value, b: Value) -> bool {
    let with_bool = matches!(
        (&a, &b),
        (Value::Boolean(_), _) | (_, Value::Boolean(_))
    );

    if with_bool && (a.is_node_set() || b.is_node_set()) {
        return compare_atoms(
            tree,
            op,
            &Value::Boolean(a.to_boolean()),
            &Value::Boolean(b.to_boolean()),
        );
    }

    let xs = atomize(tree, a);
    let ys = atomize(tree, b);

    xs.iter()
        .any(|x| ys.iter().any(|y| compare_atoms(tree, op, x, y)))
}

/// Expand a node-set into the string values of its nodes.
fn atomize(tree: &dyn Navigate, value: Value) -> Vec<Value> {
    match value.nodes() {
        Some(nodes) => nodes
            .iter()
            .map(|&node| Value::String(tree.text(node).to_string()))
            .collect(),
        None => vec![value],
    }
}

fn compare_atoms(tree: &dyn Navigate, op: CmpOp, x: &Value, y: &Value) -> bool {
    let equal = || match (x, y) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
            x.to_boolean() == y.to_boolean()
        }
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            x.to_number(tree) == y.to_number(tree)
        }
        _ => x.to_string_value(tree) == y.to_string_value(tree),
    };

    let numbers = || (x.to_number(tree), y.to_number(tree));

    match op {
        CmpOp::Eq => equal(),
        CmpOp::Neq => !equal(),
        CmpOp::Lt => numbers().0 < numbers().1,
        CmpOp::Le => numbers().0 <= numbers().1,
        CmpOp::Gt => numbers().0 > numbers().1,
        CmpOp::Ge => numbers().0 >= numbers().1,
    }
}
