// Debug serialization of bound models
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

//! Debug serialization of bound models.
//!
//! [`stringify`] renders a bound model and everything reachable from it
//!   as indented,
//!   JSON-like text suitable for snapshot tests and for eyeballing the
//!   result of a binding pass.
//! Each model is an object beginning with four header members,
//!   followed by one member per field in declaration order:
//!
//! ```text
//! {
//!     "_span": "[4, 5)",
//!     "_type": "my_crate::Column",
//!     "_ruleName": "columnRef",
//!     "_bindings": [...],
//!     "name": "c"
//! }
//! ```
//!
//! A model whose type is not registered with the
//!   [`SyntaxModel`] has an `"_error"` member in place of its fields.
//! A model that is reached again while it is being rendered
//!   (through a nested field referring back to an ancestor)
//!   is rendered only as a `"_cycle"` reference to its rule.
//!
//! _The output is not meant to be parsed!_
//! It is a diagnostic aid and its format may change without notice.

use crate::{
    model::{AnyBound, Binding, Rendered},
    registry::SyntaxModel,
};
use std::fmt::Write;

/// Render `bound` and every model reachable from it.
///
/// See the [module-level documentation](self) for more information.
pub fn stringify(model: &SyntaxModel, bound: &dyn AnyBound) -> String {
    let mut s = Stringify {
        model,
        out: String::new(),
        depth: 0,
        path: Vec::new(),
    };

    s.model(bound);
    s.out
}

struct Stringify<'a> {
    model: &'a SyntaxModel,
    out: String,
    depth: usize,

    /// Models currently being rendered,
    ///   outermost first.
    path: Vec<*const ()>,
}

impl<'a> Stringify<'a> {
    fn model(&mut self, bound: &dyn AnyBound) {
        let ptr = bound as *const dyn AnyBound as *const ();

        if self.path.contains(&ptr) {
            self.out.push_str("{\"_cycle\": ");
            self.quoted(bound.rule_name());
            self.out.push('}');
            return;
        }

        self.path.push(ptr);
        self.open('{');

        let mut first = true;

        self.member(&mut first, "_span");
        self.quoted(&bound.span().to_string());
        self.member(&mut first, "_type");
        self.quoted(bound.value_type_name());
        self.member(&mut first, "_ruleName");
        self.quoted(bound.rule_name());
        self.member(&mut first, "_bindings");
        self.bindings(&bound.bindings());

        let registry = self.model;

        match registry.node_type_by_id(bound.value_type_id()) {
            Some(ty) => {
                for field in ty.fields() {
                    self.member(&mut first, field.name());
                    self.rendered(field.render(bound));
                }
            }
            None => {
                self.member(&mut first, "_error");
                self.quoted("no descriptor registered for rule");
            }
        }

        self.close('}');
        self.path.pop();
    }

    fn bindings(&mut self, bindings: &[Binding]) {
        if bindings.is_empty() {
            self.out.push_str("[]");
            return;
        }

        self.open('[');

        for (i, binding) in bindings.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }

            self.newline();
            self.open('{');

            let mut first = true;

            self.member(&mut first, "field");
            self.quoted(binding.field);
            self.member(&mut first, "span");
            match binding.span {
                Some(span) => self.quoted(&span.to_string()),
                None => self.out.push_str("null"),
            }
            self.member(&mut first, "text");
            self.quoted(&binding.text);
            self.member(&mut first, "node");
            self.quoted(&binding.path);

            self.close('}');
        }

        self.close(']');
    }

    fn rendered(&mut self, value: Rendered) {
        match value {
            Rendered::Null => self.out.push_str("null"),
            Rendered::Raw(s) => self.out.push_str(&s),
            Rendered::Quoted(s) => self.quoted(&s),

            Rendered::Texts(texts) if texts.is_empty() => {
                self.out.push_str("[]")
            }
            Rendered::Texts(texts) => {
                self.open('[');

                for (i, text) in texts.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }

                    self.newline();
                    self.quoted(text);
                }

                self.close(']');
            }

            Rendered::Model(m) => self.model(&*m),

            Rendered::Models(models) if models.is_empty() => {
                self.out.push_str("[]")
            }
            Rendered::Models(models) => {
                self.open('[');

                for (i, m) in models.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }

                    self.newline();
                    self.model(&**m);
                }

                self.close(']');
            }

            Rendered::Error(msg) => {
                self.out.push_str("{\"_error\": ");
                self.quoted(&msg);
                self.out.push('}');
            }
        }
    }

    fn member(&mut self, first: &mut bool, key: &str) {
        if !std::mem::replace(first, false) {
            self.out.push(',');
        }

        self.newline();
        self.quoted(key);
        self.out.push_str(": ");
    }

    fn open(&mut self, c: char) {
        self.out.push(c);
        self.depth += 1;
    }

    fn close(&mut self, c: char) {
        self.depth -= 1;
        self.newline();
        self.out.push(c);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.out.extend(std::iter::repeat('\t').take(self.depth));
    }

    fn quoted(&mut self, s: &str) {
        self.out.push('"');

        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if c.is_control() => {
                    // Writing to a `String` cannot fail.
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }

        self.out.push('"');
    }
}
