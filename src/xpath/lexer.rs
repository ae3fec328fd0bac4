// Query tokenizer
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

//! Query tokenizer.
//!
//! Tokenization follows the lexical structure of XPath 1.0,
//!   including its disambiguation rules:
//!     when the preceding token is anything other than `@`, `::`, `(`,
//!     `[`, `,` or an operator,
//!     a `*` is the multiplication operator and a name is one of the
//!     operator names `and`, `or`, `div` and `mod`.
//! A name followed by `(` is a function name or node type;
//!   a name followed by `::` is an axis name;
//!   those distinctions are left to the parser.

use super::XPathError;
use memchr::memchr;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Pipe,
    Plus,
    Minus,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    /// `*` as a name test.
    Star,

    /// `*` as the multiplication operator.
    Multiply,

    And,
    Or,
    Div,
    Mod,
    Name(String),
    Literal(String),
    Number(f64),
    Variable(String),
}

impl Token {
    /// Whether a `*` or name following this token is an operator.
    fn ends_operand(&self) -> bool {
        use Token::*;

        !matches!(
            self,
            At | ColonColon
                | LParen
                | LBracket
                | Comma
                | Slash
                | DoubleSlash
                | Pipe
                | Plus
                | Minus
                | Eq
                | Neq
                | Lt
                | Le
                | Gt
                | Ge
                | Multiply
                | And
                | Or
                | Div
                | Mod
        )
    }
}

/// A token and the byte offset of its first character within the query.
pub type Lexeme = (Token, usize);

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Tokenize an entire query.
pub fn tokenize(src: &str) -> Result<Vec<Lexeme>, XPathError> {
    let mut tokens: Vec<Lexeme> = Vec::new();
    let bytes = src.as_bytes();
    let mut pos = 0;

    while let Some(c) = src[pos..].chars().next() {
        let start = pos;

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        let operand_before = tokens.last().map_or(false, |(t, _)| t.ends_operand());
        let next = bytes.get(pos + 1).copied();

        let (token, len) = match c {
            '/' if next == Some(b'/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '@' => (Token::At, 1),
            ',' => (Token::Comma, 1),
            '|' => (Token::Pipe, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '=' => (Token::Eq, 1),
            '!' if next == Some(b'=') => (Token::Neq, 2),
            '<' if next == Some(b'=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some(b'=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            ':' if next == Some(b':') => (Token::ColonColon, 2),
            '*' if operand_before => (Token::Multiply, 1),
            '*' => (Token::Star, 1),

            '.' if next == Some(b'.') => (Token::DotDot, 2),
            '.' if next.map_or(false, |b| b.is_ascii_digit()) => {
                lex_number(src, pos)?
            }
            '.' => (Token::Dot, 1),
            '0'..='9' => lex_number(src, pos)?,

            '"' | '\'' => {
                let close = memchr(c as u8, &bytes[pos + 1..])
                    .ok_or(XPathError::UnterminatedLiteral(pos))?;

                let text = &src[pos + 1..pos + 1 + close];
                (Token::Literal(text.into()), close + 2)
            }

            '$' => {
                let len = name_len(&src[pos + 1..]);

                if len == 0 {
                    return Err(XPathError::UnexpectedChar(c, pos));
                }

                let name = &src[pos + 1..pos + 1 + len];
                (Token::Variable(name.into()), len + 1)
            }

            c if is_name_start(c) => {
                let len = name_len(&src[pos..]);
                let name = &src[pos..pos + len];

                let token = match name {
                    "and" if operand_before => Token::And,
                    "or" if operand_before => Token::Or,
                    "div" if operand_before => Token::Div,
                    "mod" if operand_before => Token::Mod,
                    _ => Token::Name(name.into()),
                };

                (token, len)
            }

            _ => return Err(XPathError::UnexpectedChar(c, pos)),
        };

        tokens.push((token, start));
        pos += len;
    }

    Ok(tokens)
}

/// Length of a (possibly prefixed) name at the start of `s`,
///   or `0` if there is none.
fn name_len(s: &str) -> usize {
    let mut chars = s.char_indices().peekable();

    match chars.next() {
        Some((_, c)) if is_name_start(c) => (),
        _ => return 0,
    }

    let mut end = s.len();
    let mut prefixed = false;

    while let Some((i, c)) = chars.next() {
        if is_name_char(c) {
            continue;
        }

        // A single `prefix:local` separator,
        //   but never the `::` of an axis.
        let local_follows = chars.peek().map_or(false, |&(_, n)| is_name_start(n));

        if c == ':' && !prefixed && local_follows {
            prefixed = true;
            continue;
        }

        end = i;
        break;
    }

    end
}

fn lex_number(src: &str, pos: usize) -> Result<(Token, usize), XPathError> {
    let rest = &src[pos..];
    let mut seen_point = false;

    let len = rest
        .char_indices()
        .find(|&(_, c)| match c {
            '0'..='9' => false,
            '.' if !seen_point => {
                seen_point = true;
                false
            }
            _ => true,
        })
        .map_or(rest.len(), |(i, _)| i);

    rest[..len]
        .parse()
        .map(|n| (Token::Number(n), len))
        .map_err(|_| XPathError::UnexpectedChar('.', pos))
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src)
            .expect("tokenize failed")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn star_as_name_test_or_operator() {
        assert_eq!(
            vec![Token::Star, Token::Multiply, Token::Number(2.0)],
            tokens("* * 2"),
        );

        assert_eq!(
            vec![Token::Name("a".into()), Token::Slash, Token::Star],
            tokens("a/*"),
        );
    }

    #[test]
    fn operator_names_only_after_operands() {
        assert_eq!(
            vec![
                Token::Name("and".into()),
                Token::And,
                Token::Name("or".into()),
            ],
            tokens("and and or"),
        );
    }

    #[test]
    fn names_with_hyphens_and_axes() {
        assert_eq!(
            vec![
                Token::Name("following-sibling".into()),
                Token::ColonColon,
                Token::Name("column_ref".into()),
            ],
            tokens("following-sibling::column_ref"),
        );
    }

    #[test]
    fn literals_and_numbers() {
        assert_eq!(
            vec![
                Token::Literal("it's".into()),
                Token::Comma,
                Token::Literal("x".into()),
                Token::Comma,
                Token::Number(0.5),
                Token::Comma,
                Token::Number(12.0),
            ],
            tokens(r#""it's", 'x', .5, 12"#),
        );
    }

    #[test]
    fn dots() {
        assert_eq!(
            vec![Token::DotDot, Token::Slash, Token::Dot],
            tokens("../."),
        );
    }

    #[test]
    fn unterminated_literal() {
        assert_eq!(
            Err(XPathError::UnterminatedLiteral(4)),
            tokenize("a = 'x"),
        );
    }
}
