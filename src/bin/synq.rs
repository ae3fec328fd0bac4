// Command-line tree queries
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

//! Query raw parse trees from the command line.
//!
//! `synq` loads a raw tree from its XML representation
//!   (see [`synbind::tree::xml`])
//!   and evaluates queries against its root,
//!     printing each result on standard output.
//! Node-sets print one line per node containing the node's path and
//!   text separated by a tab;
//!     all other values print their string value.
//!
//! This is intended as a debugging aid for schema authors who want to see
//!   what a term or scope query selects before declaring it on a field.

extern crate synbind;

use getopts::{Fail, Options};
use std::{
    env,
    error::Error,
    fmt::{self, Display},
    fs, io,
};
use synbind::{
    diagnose::{self, AnnotatedSpan, Diagnostic},
    tree::{
        xml::{self, XmlError},
        TreeView,
    },
    xpath::{QueryCache, XPathError},
};

/// Types of commands
enum Command {
    Query {
        input: String,
        queries: Vec<String>,
        dump_xml: bool,
    },
    Usage,
}

/// Load `src_path` and evaluate each of `queries` against its root,
///   returning the text to be printed.
fn run(
    src_path: &str,
    queries: &[String],
    dump_xml: bool,
) -> Result<String, SynqError> {
    let src = fs::read_to_string(src_path)?;
    let tree = xml::load_str(&src)?;
    let view = TreeView::new(&tree);
    let cache = QueryCache::default();
    let root = view.root();

    let mut out = String::new();

    if dump_xml {
        out.push_str(&xml::to_xml(&view, root)?);
        out.push('\n');
    }

    for query in queries {
        let value = cache
            .evaluate(&view, root, query)
            .map_err(|e| SynqError::Query(query.clone(), e))?;

        match value.nodes() {
            Some(nodes) => {
                for &node in nodes {
                    out.push_str(&view.full_path_name(node));
                    out.push('\t');
                    out.push_str(&view.text(node));
                    out.push('\n');
                }
            }
            None => {
                out.push_str(&value.to_string_value(&view));
                out.push('\n');
            }
        }
    }

    Ok(out)
}

pub fn main() {
    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {} [OPTIONS] INPUT", program));

    match parse_options(opts, args) {
        Ok(Command::Query {
            input,
            queries,
            dump_xml,
        }) => match run(&input, &queries, dump_xml) {
            Ok(out) => {
                print!("{out}");
                std::process::exit(exitcode::OK);
            }
            Err(e) => {
                eprintln!(
                    "{}\nfatal: failed to query `{}`",
                    diagnose::render(&e),
                    input
                );
                std::process::exit(e.exit_code());
            }
        },
        Ok(Command::Usage) => {
            println!("{}", usage);
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", usage);
            std::process::exit(exitcode::USAGE);
        }
    }
}

fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optmulti("q", "query", "evaluate query against the root", "QUERY");
    opts.optflag("", "xml", "dump the loaded tree as XML");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn parse_options(opts: Options, args: Vec<String>) -> Result<Command, Fail> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let input = match matches.free.len() {
        0 => return Err(Fail::OptionMissing(String::from("INPUT"))),
        1 => matches.free[0].clone(),
        _ => return Err(Fail::UnrecognizedOption(matches.free[1].clone())),
    };

    let queries = matches.opt_strs("q");
    let dump_xml = matches.opt_present("xml");

    if queries.is_empty() && !dump_xml {
        return Err(Fail::OptionMissing(String::from("--query or --xml")));
    }

    Ok(Command::Query {
        input,
        queries,
        dump_xml,
    })
}

#[derive(Debug)]
pub enum SynqError {
    Io(io::Error),
    Xml(XmlError),
    Query(String, XPathError),
}

impl SynqError {
    fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                exitcode::NOINPUT
            }
            Self::Io(_) => exitcode::IOERR,
            Self::Xml(_) => exitcode::DATAERR,
            Self::Query(..) => exitcode::DATAERR,
        }
    }
}

impl From<io::Error> for SynqError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<XmlError> for SynqError {
    fn from(e: XmlError) -> Self {
        Self::Xml(e)
    }
}

impl Display for SynqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => Display::fmt(e, f),
            Self::Xml(e) => Display::fmt(e, f),
            Self::Query(query, e) => write!(f, "query `{query}`: {e}"),
        }
    }
}

impl Error for SynqError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Xml(e) => Some(e),
            Self::Query(_, e) => Some(e),
        }
    }
}

impl Diagnostic for SynqError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        match self {
            Self::Xml(e) => e.describe(),
            Self::Query(_, e) => e.describe(),
            Self::Io(_) => vec![],
        }
    }
}
