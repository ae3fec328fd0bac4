// Binding pass tracing
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

//! Tracing for binding passes.
//!
//! This provides human-readable traces on standard error any time a tree
//!   node is filled with a model or a field error is absorbed.
//! These traces are provided automatically when `cfg(test)`,
//!   which means that they are automatically included in the output of any
//!   test failure.
//!
//! Outside of tests,
//!   this can be enabled at configuration-time using the
//!   `bind-trace-stderr` feature flag.
//!
//! _These traces are not meant to be machine-readable!_
//! Do not try to use the human-readable traces in that way since the format
//!   is subject to change without notice.
//! Callers wanting structured information should inspect the diagnostics
//!   returned with every [`BindResult`](crate::bind::BindResult).

use crate::{diagnose, span::Span, tree::NodeId};

/// Observer of a binding pass.
///
/// There is no means to return an error and a failure to output the trace
///   must not interrupt binding.
pub trait BindTrace: Default {
    /// A node is about to be filled as `rule`.
    ///
    /// `fresh` indicates whether the model was constructed for this fill
    ///   or was already memoized on the node.
    fn trace_fill_begin(&mut self, rule: &str, node: NodeId, fresh: bool);

    /// A node has been filled,
    ///   and its model stamped with `span` if one was known.
    fn trace_fill_end(&mut self, rule: &str, node: NodeId, span: Option<Span>);

    /// A subnode specification for `field` found no match.
    fn trace_miss(&mut self, field: &str, target_rule: &str, node: NodeId);

    /// An error was recorded and binding continued past it.
    fn trace_error<D: diagnose::Diagnostic + ?Sized>(&mut self, err: &D);
}

/// Perform no tracing.
///
/// This is used by default for non-test builds,
///   since tracing can incur a significant performance cost on large
///   trees.
#[derive(Debug, PartialEq, Default)]
pub struct VoidTrace;

impl BindTrace for VoidTrace {
    fn trace_fill_begin(&mut self, _rule: &str, _node: NodeId, _fresh: bool) {
        // Do nothing at all.
    }

    fn trace_fill_end(
        &mut self,
        _rule: &str,
        _node: NodeId,
        _span: Option<Span>,
    ) {
        // Do nothing at all.
    }

    fn trace_miss(&mut self, _field: &str, _target_rule: &str, _node: NodeId) {
        // Do nothing at all.
    }

    fn trace_error<D: diagnose::Diagnostic + ?Sized>(&mut self, _err: &D) {
        // Do nothing at all.
    }
}

/// Human-readable [`BindTrace`].
///
/// Nested fills are indented by depth so that the output mirrors the
///   shape of the bound model.
///
/// See [module-level](self) documentation for more information.
#[derive(Debug, PartialEq, Default)]
pub struct HumanReadableTrace {
    depth: usize,
}

impl HumanReadableTrace {
    fn indent(&self) -> String {
        "|  ".repeat(self.depth)
    }
}

impl BindTrace for HumanReadableTrace {
    fn trace_fill_begin(&mut self, rule: &str, node: NodeId, fresh: bool) {
        eprint!(
            "{ind}[bind::fill] {rule} @ {node}{memo}\n",
            ind = self.indent(),
            memo = if fresh { "" } else { " (memoized)" },
        );

        self.depth += 1;
    }

    fn trace_fill_end(&mut self, rule: &str, node: NodeId, span: Option<Span>) {
        self.depth = self.depth.saturating_sub(1);

        match span {
            Some(span) => eprint!(
                "{ind}[bind::fill] done {rule} @ {node}, span {span}\n",
                ind = self.indent(),
            ),
            None => eprint!(
                "{ind}[bind::fill] done {rule} @ {node}, no interval\n",
                ind = self.indent(),
            ),
        }
    }

    fn trace_miss(&mut self, field: &str, target_rule: &str, node: NodeId) {
        eprint!(
            "{ind}| no `{target_rule}` for field `{field}` from {node}\n",
            ind = self.indent(),
        );
    }

    fn trace_error<D: diagnose::Diagnostic + ?Sized>(&mut self, err: &D) {
        let report = diagnose::render(err).replace('\n', "\n|  |  ");

        eprint!(
            "{ind}| ==> !!! {report}\n{ind}= note: this trace was output as \
                a debugging aid because `cfg({cfg})`.\n",
            ind = self.indent(),
            cfg = trace_cfg(),
        );
    }
}

fn trace_cfg() -> &'static str {
    #[allow(unused_variables)]
    let cfg = ""; // so that this compiles without matching cfg
    #[cfg(feature = "bind-trace-stderr")]
    #[allow(unused_variables)]
    let cfg = "feature = \"bind-trace-stderr\"";
    #[cfg(test)] // takes precedence if both are set
    let cfg = "test";

    cfg
}

/// Trace used by binding sessions unless one is explicitly requested.
#[cfg(any(test, feature = "bind-trace-stderr"))]
pub type DefaultTrace = HumanReadableTrace;

/// Trace used by binding sessions unless one is explicitly requested.
#[cfg(not(any(test, feature = "bind-trace-stderr")))]
pub type DefaultTrace = VoidTrace;
