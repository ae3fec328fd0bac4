// XML representation of raw trees
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

//! XML representation of raw trees and tree views.
//!
//! Trees are represented as elements named by rule:
//!   an element containing only text is a terminal;
//!   an element containing other elements
//!     (or nothing at all)
//!   is a non-terminal.
//! Mixed content is rejected.
//!
//! ```xml
//! <selectStmt>
//!   <columnList>
//!     <columnRef>a</columnRef>
//!     <columnRef>b</columnRef>
//!   </columnList>
//!   <columnRef>c</columnRef>
//! </selectStmt>
//! ```
//!
//! [`load_str`] produces a [`SourceTree`];
//!   [`to_xml`] renders any [`TreeView`] back out,
//!     annotating each element with the `start` and `end` offsets of its
//!     interval when one is known.
//! Rendering is a diagnostic aid;
//!   the annotations are ignored when loading.

use super::{NodeId, RawTree, SourceTree, TreeView};
use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::Span,
};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use std::{error::Error, fmt::Display};

#[derive(Debug, Default)]
struct XmlElem {
    name: String,
    text: String,
    children: Vec<XmlElem>,
}

/// Load a [`SourceTree`] from its XML representation.
pub fn load_str(xml: &str) -> Result<SourceTree, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlElem> = vec![];
    let mut root: Option<XmlElem> = None;

    loop {
        let offset = reader.buffer_position();

        match reader.read_event() {
            Ok(Event::Start(ele)) => stack.push(XmlElem {
                name: elem_name(&ele, offset)?,
                ..Default::default()
            }),

            Ok(Event::Empty(ele)) => {
                let elem = XmlElem {
                    name: elem_name(&ele, offset)?,
                    ..Default::default()
                };

                attach(&mut stack, &mut root, elem, offset)?;
            }

            Ok(Event::End(_)) => {
                let elem = stack.pop().ok_or(XmlError::Unbalanced(offset))?;
                attach(&mut stack, &mut root, elem, offset)?;
            }

            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::Read(offset, e.to_string()))?;

                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None => return Err(XmlError::TextOutsideRoot(offset)),
                }
            }

            Ok(Event::CData(cdata)) => {
                let text = String::from_utf8(cdata.into_inner().into_owned())
                    .map_err(|e| XmlError::Read(offset, e.to_string()))?;

                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None => return Err(XmlError::TextOutsideRoot(offset)),
                }
            }

            Ok(Event::Eof) => break,

            // Declarations, comments, processing instructions and
            //   doctypes carry nothing of interest.
            Ok(_) => (),

            Err(e) => return Err(XmlError::Read(offset, e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Unbalanced(reader.buffer_position()));
    }

    root.ok_or(XmlError::NoRoot).and_then(into_source_tree)
}

fn elem_name(ele: &BytesStart, offset: usize) -> Result<String, XmlError> {
    std::str::from_utf8(ele.name().as_ref())
        .map(str::to_owned)
        .map_err(|e| XmlError::Read(offset, e.to_string()))
}

fn attach(
    stack: &mut Vec<XmlElem>,
    root: &mut Option<XmlElem>,
    elem: XmlElem,
    offset: usize,
) -> Result<(), XmlError> {
    if !elem.children.is_empty() && !elem.text.is_empty() {
        return Err(XmlError::MixedContent(elem.name, offset));
    }

    match (stack.last_mut(), root.is_some()) {
        (Some(parent), _) => {
            parent.children.push(elem);
            Ok(())
        }
        (None, false) => {
            root.replace(elem);
            Ok(())
        }
        (None, true) => Err(XmlError::MultipleRoots(offset)),
    }
}

fn into_source_tree(root: XmlElem) -> Result<SourceTree, XmlError> {
    enum Work {
        Elem(XmlElem),
        Close,
    }

    if !root.text.is_empty() {
        return Err(XmlError::TerminalRoot(root.name));
    }

    let mut builder = SourceTree::builder(root.name);
    let mut work = root
        .children
        .into_iter()
        .rev()
        .map(Work::Elem)
        .collect::<Vec<_>>();

    while let Some(item) = work.pop() {
        match item {
            Work::Close => {
                builder.close();
            }

            Work::Elem(elem) if !elem.text.is_empty() => {
                builder.leaf(elem.name, elem.text);
            }

            Work::Elem(elem) => {
                builder.open(elem.name);
                work.push(Work::Close);
                work.extend(elem.children.into_iter().rev().map(Work::Elem));
            }
        }
    }

    Ok(builder.finish())
}

/// Render the subtree of `view` rooted at `node` as indented XML.
///
/// Each element carries `start`/`end` attributes when its interval is
///   known;
///     terminals contain their text.
pub fn to_xml<R: RawTree>(
    view: &TreeView<R>,
    node: NodeId,
) -> Result<String, XmlError> {
    enum Work {
        Node(NodeId),
        Close(NodeId),
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut work = vec![Work::Node(node)];

    while let Some(item) = work.pop() {
        match item {
            Work::Close(id) => {
                write(&mut writer, Event::End(BytesEnd::new(view.name(id).to_string())))?;
            }

            Work::Node(id) => {
                let name = view.name(id).to_string();
                let mut start = BytesStart::new(name.clone());

                if let Some(span) = view.interval(id) {
                    start.push_attribute(("start", span.start().to_string().as_str()));
                    start.push_attribute(("end", span.end().to_string().as_str()));
                }

                let children = view.children(id);

                if view.is_leaf(id) {
                    write(&mut writer, Event::Start(start))?;
                    write(&mut writer, Event::Text(BytesText::new(&view.text(id))))?;
                    write(&mut writer, Event::End(BytesEnd::new(name)))?;
                } else if children.is_empty() {
                    write(&mut writer, Event::Empty(start))?;
                } else {
                    write(&mut writer, Event::Start(start))?;
                    work.push(Work::Close(id));
                    work.extend(children.iter().rev().copied().map(Work::Node));
                }
            }
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| XmlError::Write(e.to_string()))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

/// Error while reading or writing the XML representation of a tree.
///
/// Offsets are byte offsets into the XML input.
#[derive(Debug, PartialEq, Eq)]
pub enum XmlError {
    /// The underlying XML reader failed.
    Read(usize, String),

    /// The underlying XML writer failed.
    Write(String),

    /// An end tag with no matching start tag,
    ///   or input ending with elements still open.
    Unbalanced(usize),

    /// An element contains both text and child elements.
    MixedContent(String, usize),

    /// Text appears outside of the root element.
    TextOutsideRoot(usize),

    /// More than one top-level element.
    MultipleRoots(usize),

    /// The root element is a terminal;
    ///   raw trees are rooted at a rule.
    TerminalRoot(String),

    /// The input contains no elements at all.
    NoRoot,
}

impl Display for XmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use XmlError::*;

        match self {
            Read(_, msg) => write!(f, "failed to read tree XML: {msg}"),
            Write(msg) => write!(f, "failed to write tree XML: {msg}"),
            Unbalanced(_) => write!(f, "unbalanced element in tree XML"),
            MixedContent(name, _) => {
                write!(f, "element `{name}` mixes text with child elements")
            }
            TextOutsideRoot(_) => write!(f, "text outside of root element"),
            MultipleRoots(_) => write!(f, "tree XML has more than one root"),
            TerminalRoot(name) => {
                write!(f, "root element `{name}` must not be a terminal")
            }
            NoRoot => write!(f, "tree XML contains no elements"),
        }
    }
}

impl Error for XmlError {}

impl Diagnostic for XmlError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use XmlError::*;

        let at = |offset: usize| Span::from_byte_interval((offset, offset));

        match self {
            Read(offset, _)
            | Unbalanced(offset)
            | TextOutsideRoot(offset)
            | MultipleRoots(offset) => vec![at(*offset).mark_error()],

            MixedContent(_, offset) => vec![
                at(*offset).error("element closed here"),
                at(*offset).help(
                    "terminals contain only text; rules contain only elements",
                ),
            ],

            Write(_) | TerminalRoot(_) | NoRoot => vec![],
        }
    }
}
