// Diagnostic system
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

//! Diagnostic system for error reporting.
//!
//! Errors throughout the system implement [`Diagnostic`] in addition to
//!   [`Error`],
//!     describing themselves as a series of [`AnnotatedSpan`]s.
//! Spans here are byte intervals of the input that produced a raw tree;
//!   there is no source file to resolve them against,
//!   so [`render`] produces a compact textual report that is suitable for
//!     logs and snapshot tests.

use std::{borrow::Cow, error::Error, fmt, fmt::Display};

use crate::span::Span;

/// Diagnostic report.
///
/// This describes an error condition or other special event using a series
///   of [`Span`]s to describe the source, cause, and circumstances around
///   an event.
pub trait Diagnostic: Error {
    /// Produce a series of [`AnnotatedSpan`]s describing the source and
    ///   circumstances of the diagnostic event.
    fn describe(&self) -> Vec<AnnotatedSpan<'_>>;

    /// Severity of the event as a whole.
    ///
    /// Most diagnostics are errors;
    ///   binding may also produce warnings about lossy bindings that do not
    ///   prevent a model from being produced.
    fn level(&self) -> Level {
        Level::Error
    }
}

/// Diagnostic severity level.
///
/// Levels are used both for entire reports and for styling of individual
///   [`AnnotatedSpan`]s.
///
/// Lower levels are more severe
///   (e.g. level 1 is the worst).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[repr(u8)]
pub enum Level {
    /// An error resulting from a defect in this system or in the schema
    ///   that the caller cannot resolve by changing the input tree.
    InternalError = 1,

    /// An error resulting from the input tree or from evaluating a schema
    ///   query against it.
    #[default]
    Error,

    /// A condition that did not prevent binding but may have produced a
    ///   surprising model.
    Warning,

    /// Useful information that supplements other messages.
    Note,

    /// Additional advice that may help in debugging or fixing a problem.
    Help,
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::InternalError => write!(f, "internal error"),
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
            Level::Help => write!(f, "help"),
        }
    }
}

/// A label associated with a report or [`Span`].
///
/// See [`AnnotatedSpan`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Label<'a>(Cow<'a, str>);

impl<'a> Display for Label<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'a> From<String> for Label<'a> {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

impl<'a> From<&'a str> for Label<'a> {
    fn from(s: &'a str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

/// A span with an associated severity level and optional label.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AnnotatedSpan<'l>(Span, Level, Option<Label<'l>>);

impl<'l> AnnotatedSpan<'l> {
    pub fn span(&self) -> Span {
        self.0
    }

    pub fn level(&self) -> Level {
        self.1
    }

    pub fn label(&self) -> Option<&Label<'l>> {
        self.2.as_ref()
    }

    pub fn with_help<L: Into<Label<'l>>>(
        self,
        label: L,
    ) -> [AnnotatedSpan<'l>; 2] {
        let span = self.0;
        [self, span.help(label)]
    }
}

impl<'l> From<AnnotatedSpan<'l>> for Vec<AnnotatedSpan<'l>> {
    fn from(x: AnnotatedSpan<'l>) -> Self {
        vec![x]
    }
}

pub trait Annotate: Sized {
    /// Annotate a [`Span`] with a severity [`Level`] and an optional
    ///   [`Label`] to display alongside of it.
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan;

    /// Annotate a span as an internal error that cannot be resolved by
    ///   changing the input.
    fn internal_error<'l, L: Into<Label<'l>>>(
        self,
        label: L,
    ) -> AnnotatedSpan<'l> {
        self.annotate(Level::InternalError, Some(label.into()))
    }

    /// Annotate a span with a clarifying label styled as an error.
    ///
    /// (This is not named `err` since it does not return an [`Err`].)
    fn error<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Error, Some(label.into()))
    }

    /// Like [`Annotate::error`],
    ///   but only styles the span as a [`Level::Error`] without attaching a
    ///   label.
    fn mark_error(self) -> AnnotatedSpan<'static> {
        self.annotate(Level::Error, None)
    }

    fn warning<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Warning, Some(label.into()))
    }

    /// Supplemental annotated span providing additional context for another
    ///   span.
    fn note<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Note, Some(label.into()))
    }

    /// Provide additional information that may be used to help the user in
    ///   debugging or fixing a diagnostic.
    fn help<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Help, Some(label.into()))
    }
}

impl<S: Into<Span>> Annotate for S {
    fn annotate(self, level: Level, label: Option<Label>) -> AnnotatedSpan {
        AnnotatedSpan(self.into(), level, label)
    }
}

/// Render a diagnostic into a compact textual report.
///
/// The first line is the severity and [`Display`] message of the
///   diagnostic;
///     each annotated span follows on its own line.
///
/// ```text
/// error: failed to evaluate term query `./x` for field `name`
///   --> [4, 9): while filling `columnRef`
///   = help: ...
/// ```
pub fn render<D: Diagnostic + ?Sized>(diagnostic: &D) -> String {
    use std::fmt::Write;

    let mut out = String::new();

    // Writing to a `String` cannot fail.
    let _ = write!(out, "{}: {}", diagnostic.level(), diagnostic);

    for aspan in diagnostic.describe() {
        let _ = match (aspan.level(), aspan.label()) {
            (Level::Help | Level::Note, Some(label)) => {
                write!(out, "\n  = {}: {}", aspan.level(), label)
            }
            (_, Some(label)) => write!(out, "\n  --> {}: {}", aspan.span(), label),
            (_, None) => write!(out, "\n  --> {}", aspan.span()),
        };
    }

    out
}
