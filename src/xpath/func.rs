// Query function library
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

//! Query function library.
//!
//! A [`FunctionLibrary`] maps function names to implementations and is
//!   consulted when a query is compiled.
//! [`FunctionLibrary::core`] provides the XPath 1.0 core function library
//!   as it applies to trees without attributes or namespaces;
//!     [`FunctionLibrary::standard`] adds the
//!     [extension functions](super::ext).
//!
//! Callers may define their own functions before compiling queries:
//!
//! ```
//! use synbind::xpath::{FunctionLibrary, QueryCache, Value};
//!
//! let mut lib = FunctionLibrary::standard();
//! lib.define("answer", 0, Some(0), |_, _, _| Ok(Value::Number(42.0)));
//!
//! let queries = QueryCache::new(lib);
//! assert!(queries.compile("answer() + 1").is_ok());
//! assert!(queries.compile("question()").is_err());
//! ```

use super::{
    value::{number_to_string, Value},
    Context, Env, XPathError,
};
use crate::{global::MAX_FN_ARGS, tree::NodeId};
use fxhash::FxHashMap;
use std::{fmt, sync::Arc};

/// Signature of a function implementation.
///
/// Arguments are evaluated before the call and their count has already
///   been checked against the arity declared for the function.
pub type FunctionImpl = dyn Fn(&Env<'_>, &Context, Vec<Value>) -> Result<Value, XPathError>
    + Send
    + Sync;

/// A named function available to queries.
pub struct Function {
    min_args: usize,
    max_args: Option<usize>,
    imp: Box<FunctionImpl>,
}

impl Function {
    pub fn new<F>(min_args: usize, max_args: Option<usize>, imp: F) -> Self
    where
        F: Fn(&Env<'_>, &Context, Vec<Value>) -> Result<Value, XPathError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            min_args,
            max_args,
            imp: Box::new(imp),
        }
    }

    /// Whether the function may be called with `n` arguments.
    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min_args
            && self.max_args.map_or(true, |max| n <= max)
            && n <= MAX_FN_ARGS
    }

    pub fn call(
        &self,
        env: &Env<'_>,
        ctx: &Context,
        args: Vec<Value>,
    ) -> Result<Value, XPathError> {
        (self.imp)(env, ctx, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

/// Functions available to queries,
///   by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionLibrary {
    funcs: FxHashMap<String, Arc<Function>>,
}

impl FunctionLibrary {
    /// A library with no functions at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The XPath 1.0 core function library.
    pub fn core() -> Self {
        let mut lib = Self::new();

        lib.define("last", 0, Some(0), |_, ctx, _| {
            Ok(Value::Number(ctx.size as f64))
        })
        .define("position", 0, Some(0), |_, ctx, _| {
            Ok(Value::Number(ctx.position as f64))
        })
        .define("count", 1, Some(1), count)
        .define("name", 0, Some(1), name)
        .define("local-name", 0, Some(1), name)
        .define("string", 0, Some(1), string)
        .define("concat", 2, None, concat)
        .define("starts-with", 2, Some(2), |env, _, args| {
            let [s, prefix] = strings::<2>(env, args);
            Ok(Value::Boolean(s.starts_with(&prefix)))
        })
        .define("contains", 2, Some(2), |env, _, args| {
            let [s, needle] = strings::<2>(env, args);
            Ok(Value::Boolean(s.contains(&needle)))
        })
        .define("substring-before", 2, Some(2), |env, _, args| {
            let [s, sep] = strings::<2>(env, args);
            let before = s.find(&sep).map_or("", |i| &s[..i]);
            Ok(Value::String(before.into()))
        })
        .define("substring-after", 2, Some(2), |env, _, args| {
            let [s, sep] = strings::<2>(env, args);
            let after = s.find(&sep).map_or("", |i| &s[i + sep.len()..]);
            Ok(Value::String(after.into()))
        })
        .define("substring", 2, Some(3), substring)
        .define("string-length", 0, Some(1), |env, ctx, args| {
            let s = context_string(env, ctx, args);
            Ok(Value::Number(s.chars().count() as f64))
        })
        .define("normalize-space", 0, Some(1), |env, ctx, args| {
            let s = context_string(env, ctx, args);
            Ok(Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        })
        .define("translate", 3, Some(3), translate)
        .define("boolean", 1, Some(1), |_, _, args| {
            Ok(Value::Boolean(args.first().map_or(false, Value::to_boolean)))
        })
        .define("not", 1, Some(1), |_, _, args| {
            Ok(Value::Boolean(!args.first().map_or(false, Value::to_boolean)))
        })
        .define("true", 0, Some(0), |_, _, _| Ok(Value::Boolean(true)))
        .define("false", 0, Some(0), |_, _, _| Ok(Value::Boolean(false)))
        .define("number", 0, Some(1), |env, ctx, args| {
            let value = args
                .into_iter()
                .next()
                .unwrap_or(Value::Node(ctx.node));

            Ok(Value::Number(value.to_number(env.tree)))
        })
        .define("sum", 1, Some(1), sum)
        .define("floor", 1, Some(1), |env, _, args| {
            Ok(Value::Number(number_arg(env, args).floor()))
        })
        .define("ceiling", 1, Some(1), |env, _, args| {
            Ok(Value::Number(number_arg(env, args).ceil()))
        })
        .define("round", 1, Some(1), |env, _, args| {
            Ok(Value::Number(xpath_round(number_arg(env, args))))
        });

        lib
    }

    /// The core library together with the extension functions.
    pub fn standard() -> Self {
        let mut lib = Self::core();
        super::ext::register(&mut lib);
        lib
    }

    /// Define (or redefine) a function accepting between `min_args` and
    ///   `max_args` arguments,
    ///     or any number of arguments at least `min_args` if `max_args` is
    ///     [`None`].
    pub fn define<F>(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        imp: F,
    ) -> &mut Self
    where
        F: Fn(&Env<'_>, &Context, Vec<Value>) -> Result<Value, XPathError>
            + Send
            + Sync
            + 'static,
    {
        self.funcs.insert(
            name.into(),
            Arc::new(Function::new(min_args, max_args, imp)),
        );

        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        self.funcs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }
}

/// Nodes of argument `index` of `func`,
///   failing if it is not a node-set.
pub fn node_set_arg(
    func: &'static str,
    index: usize,
    value: Value,
) -> Result<Vec<NodeId>, XPathError> {
    let found = value.type_name();

    value.into_nodes().ok_or(XPathError::ArgType {
        func,
        index,
        expected: "node-set",
        found,
    })
}

/// String values of exactly `N` arguments.
///
/// The arity of the function must have been declared as `N`.
fn strings<const N: usize>(env: &Env<'_>, args: Vec<Value>) -> [String; N] {
    let mut out: [String; N] = std::array::from_fn(|_| String::new());

    for (slot, value) in out.iter_mut().zip(args) {
        *slot = value.to_string_value(env.tree);
    }

    out
}

/// String value of the sole argument,
///   or of the context node if there is none.
fn context_string(env: &Env<'_>, ctx: &Context, args: Vec<Value>) -> String {
    args.into_iter()
        .next()
        .unwrap_or(Value::Node(ctx.node))
        .to_string_value(env.tree)
}

fn number_arg(env: &Env<'_>, args: Vec<Value>) -> f64 {
    args.first().map_or(f64::NAN, |v| v.to_number(env.tree))
}

/// Round half towards positive infinity.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

fn count(_: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let mut args = args.into_iter();
    let nodes = node_set_arg("count", 1, args.next().unwrap_or(Value::NodeSet(vec![])))?;

    Ok(Value::Number(nodes.len() as f64))
}

fn name(env: &Env<'_>, ctx: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let nodes = match args.into_iter().next() {
        Some(value) => node_set_arg("name", 1, value)?,
        None => vec![ctx.node],
    };

    Ok(Value::String(
        nodes
            .first()
            .map(|node| env.tree.name(*node).to_string())
            .unwrap_or_default(),
    ))
}

fn string(env: &Env<'_>, ctx: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    Ok(Value::String(context_string(env, ctx, args)))
}

fn concat(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    Ok(Value::String(
        args.iter().map(|v| v.to_string_value(env.tree)).collect(),
    ))
}

fn substring(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let s = args
        .first()
        .map(|v| v.to_string_value(env.tree))
        .unwrap_or_default();

    let start = xpath_round(args.get(1).map_or(f64::NAN, |v| v.to_number(env.tree)));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.to_number(env.tree)),
        None => f64::INFINITY,
    };

    // Comparisons against NaN are false,
    //   which yields the empty string.
    let out = s
        .chars()
        .enumerate()
        .filter(|&(i, _)| {
            let pos = (i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect::<String>();

    Ok(Value::String(out))
}

fn translate(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let [s, from, to] = strings::<3>(env, args);
    let to = to.chars().collect::<Vec<_>>();

    let out = s
        .chars()
        .filter_map(|c| match from.chars().position(|f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect::<String>();

    Ok(Value::String(out))
}

fn sum(env: &Env<'_>, _: &Context, args: Vec<Value>) -> Result<Value, XPathError> {
    let mut args = args.into_iter();
    let nodes = node_set_arg("sum", 1, args.next().unwrap_or(Value::NodeSet(vec![])))?;

    Ok(Value::Number(
        nodes
            .iter()
            .map(|node| Value::Node(*node).to_number(env.tree))
            .sum(),
    ))
}

/// Render a value for diagnostic output.
pub(super) fn describe_value(env: &Env<'_>, value: &Value) -> String {
    match value {
        Value::Node(_) | Value::NodeSet(_) => value
            .nodes()
            .unwrap_or_default()
            .iter()
            .map(|&node| {
                format!("{}: {:?}", env.tree.name(node), &*env.tree.text(node))
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => format!("{s:?}"),
        Value::Number(n) => number_to_string(*n),
        Value::Boolean(b) => b.to_string(),
    }
}
