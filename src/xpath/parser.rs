// Query parser
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

//! Recursive-descent query parser.
//!
//! The grammar is that of XPath 1.0 with these productions,
//!   from lowest to highest precedence:
//!
//! ```text
//! Expr           ::= OrExpr
//! OrExpr         ::= AndExpr ('or' AndExpr)*
//! AndExpr        ::= EqualityExpr ('and' EqualityExpr)*
//! EqualityExpr   ::= RelationalExpr (('=' | '!=') RelationalExpr)*
//! RelationalExpr ::= AdditiveExpr (('<' | '<=' | '>' | '>=') AdditiveExpr)*
//! AdditiveExpr   ::= MultExpr (('+' | '-') MultExpr)*
//! MultExpr       ::= UnaryExpr (('*' | 'div' | 'mod') UnaryExpr)*
//! UnaryExpr      ::= '-'* UnionExpr
//! UnionExpr      ::= PathExpr ('|' PathExpr)*
//! PathExpr       ::= LocationPath
//!                  | FilterExpr (('/' | '//') RelativeLocationPath)?
//! ```
//!
//! Function names are resolved against a [`FunctionLibrary`] as they are
//!   parsed,
//!     so that unknown functions and bad arities are reported when a query
//!     is compiled rather than when it is evaluated.
//! Variable references are recognized but unsupported.

use super::{
    func::{Function, FunctionLibrary},
    lexer::{Lexeme, Token},
    XPathError,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,

    /// Trees have no attributes or namespaces;
    ///   these axes are always empty.
    Attribute,
    Namespace,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        use Axis::*;

        Some(match name {
            "child" => Child,
            "descendant" => Descendant,
            "descendant-or-self" => DescendantOrSelf,
            "parent" => Parent,
            "ancestor" => Ancestor,
            "ancestor-or-self" => AncestorOrSelf,
            "self" => SelfAxis,
            "following-sibling" => FollowingSibling,
            "preceding-sibling" => PrecedingSibling,
            "following" => Following,
            "preceding" => Preceding,
            "attribute" => Attribute,
            "namespace" => Namespace,
            _ => return None,
        })
    }

    /// Whether positions along this axis count backwards through the
    ///   document.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor
                | Self::AncestorOrSelf
                | Self::Preceding
                | Self::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Nodes with the given rule name.
    Name(String),

    /// `*`
    Any,

    /// `node()`
    Node,

    /// `text()`,
    ///   which selects terminals.
    Text,

    /// `comment()` and `processing-instruction()`,
    ///   which never match.
    Never,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum PathStart {
    /// `/`: the root of the context node's tree.
    Root,

    /// A relative path from the context node.
    Context,

    /// A path continuing from the node-set of an expression.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub func: Arc<Function>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Call(Call),
    Filter(Box<Expr>, Vec<Expr>),
    Path(PathStart, Vec<Step>),
}

/// Parse a tokenized query into an expression.
pub fn parse(
    tokens: &[Lexeme],
    lib: &FunctionLibrary,
    src_len: usize,
) -> Result<Expr, XPathError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        lib,
        src_len,
    };

    let expr = parser.expr()?;

    match parser.peek() {
        None => Ok(expr),
        Some(_) => Err(parser.unexpected()),
    }
}

struct Parser<'a> {
    tokens: &'a [Lexeme],
    pos: usize,
    lib: &'a FunctionLibrary,
    src_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.src_len, |(_, at)| *at)
    }

    fn unexpected(&self) -> XPathError {
        match self.peek() {
            Some(token) => {
                XPathError::UnexpectedToken(format!("{token:?}"), self.offset())
            }
            None => XPathError::UnexpectedEnd,
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expr(&mut self) -> Result<Expr, XPathError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.and_expr()?;

        while self.eat(&Token::Or) {
            lhs = Expr::Or(Box::new(lhs), Box::new(self.and_expr()?));
        }

        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.equality_expr()?;

        while self.eat(&Token::And) {
            lhs = Expr::And(Box::new(lhs), Box::new(self.equality_expr()?));
        }

        Ok(lhs)
    }

    fn equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.relational_expr()?;

        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::Neq) => CmpOp::Neq,
                _ => break Ok(lhs),
            };

            self.pos += 1;
            let rhs = self.relational_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.additive_expr()?;

        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => break Ok(lhs),
            };

            self.pos += 1;
            let rhs = self.additive_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.multiplicative_expr()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break Ok(lhs),
            };

            self.pos += 1;
            let rhs = self.multiplicative_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.unary_expr()?;

        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithOp::Mul,
                Some(Token::Div) => ArithOp::Div,
                Some(Token::Mod) => ArithOp::Mod,
                _ => break Ok(lhs),
            };

            self.pos += 1;
            let rhs = self.unary_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, XPathError> {
        let mut negations = 0;

        while self.eat(&Token::Minus) {
            negations += 1;
        }

        let expr = self.union_expr()?;

        Ok((0..negations).fold(expr, |expr, _| Expr::Neg(Box::new(expr))))
    }

    fn union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.path_expr()?;

        while self.eat(&Token::Pipe) {
            lhs = Expr::Union(Box::new(lhs), Box::new(self.path_expr()?));
        }

        Ok(lhs)
    }

    /// Whether the upcoming tokens begin a filter expression rather than a
    ///   location path.
    fn at_filter_expr(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::Literal(_) | Token::Number(_) | Token::LParen), _) => {
                true
            }
            (Some(Token::Variable(_)), _) => true,
            (Some(Token::Name(name)), Some(Token::LParen)) => !is_node_type(name),
            _ => false,
        }
    }

    fn path_expr(&mut self) -> Result<Expr, XPathError> {
        if !self.at_filter_expr() {
            return self.location_path();
        }

        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;

        let filter = if predicates.is_empty() {
            primary
        } else {
            Expr::Filter(Box::new(primary), predicates)
        };

        let mut steps = Vec::new();

        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(descendant_or_self());
            }
            _ => return Ok(filter),
        }

        self.relative_path(&mut steps)?;
        Ok(Expr::Path(PathStart::Expr(Box::new(filter)), steps))
    }

    fn location_path(&mut self) -> Result<Expr, XPathError> {
        let mut steps = Vec::new();

        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;

                // `/` alone selects the root.
                if self.at_step() {
                    self.relative_path(&mut steps)?;
                }

                Ok(Expr::Path(PathStart::Root, steps))
            }

            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(descendant_or_self());
                self.relative_path(&mut steps)?;

                Ok(Expr::Path(PathStart::Root, steps))
            }

            _ => {
                self.relative_path(&mut steps)?;
                Ok(Expr::Path(PathStart::Context, steps))
            }
        }
    }

    fn at_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Name(_)
                    | Token::Star
                    | Token::At
                    | Token::Dot
                    | Token::DotDot
            )
        )
    }

    fn relative_path(&mut self, steps: &mut Vec<Step>) -> Result<(), XPathError> {
        steps.push(self.step()?);

        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self());
                }
                _ => break Ok(()),
            }

            steps.push(self.step()?);
        }
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::Node,
                predicates: vec![],
            });
        }

        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: vec![],
            });
        }

        let axis = match (self.peek(), self.peek_at(1)) {
            (Some(Token::At), _) => {
                self.pos += 1;
                Axis::Attribute
            }
            (Some(Token::Name(name)), Some(Token::ColonColon)) => {
                let axis = Axis::from_name(name).ok_or_else(|| {
                    XPathError::UnknownAxis(name.clone(), self.offset())
                })?;

                self.pos += 2;
                axis
            }
            _ => Axis::Child,
        };

        let test = self.node_test()?;
        let predicates = self.predicates()?;

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek() {
            Some(Token::Star) => {
                self.pos += 1;
                Ok(NodeTest::Any)
            }

            Some(Token::Name(name))
                if is_node_type(name)
                    && self.peek_at(1) == Some(&Token::LParen) =>
            {
                let test = match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    _ => NodeTest::Never,
                };

                self.pos += 2;

                // processing-instruction('target')
                if let Some(Token::Literal(_)) = self.peek() {
                    self.pos += 1;
                }

                self.expect(&Token::RParen)?;
                Ok(test)
            }

            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(NodeTest::Name(name.clone()))
            }

            _ => Err(self.unexpected()),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();

        while self.eat(&Token::LBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RBracket)?;
        }

        Ok(predicates)
    }

    fn primary_expr(&mut self) -> Result<Expr, XPathError> {
        let at = self.offset();

        match self.peek() {
            Some(Token::Literal(s)) => {
                self.pos += 1;
                Ok(Expr::Literal(s.clone()))
            }

            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Expr::Number(*n))
            }

            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }

            Some(Token::Variable(name)) => {
                Err(XPathError::UnsupportedVariable(name.clone(), at))
            }

            Some(Token::Name(name)) => {
                self.pos += 2; // name and `(`
                let args = self.arguments()?;

                let func = self.lib.get(name).ok_or_else(|| {
                    XPathError::UnknownFunction(name.clone(), at)
                })?;

                if !func.accepts(args.len()) {
                    return Err(XPathError::Arity {
                        name: name.clone(),
                        given: args.len(),
                        at,
                    });
                }

                Ok(Expr::Call(Call { func, args }))
            }

            _ => Err(self.unexpected()),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut args = Vec::new();

        if self.eat(&Token::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.expr()?);

            if self.eat(&Token::RParen) {
                break Ok(args);
            }

            self.expect(&Token::Comma)?;
        }
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment" | "processing-instruction")
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: vec![],
    }
}
