//! # Lexer
//!
//! Tokenizes a `kernel` string into `Id`, `Int`, `Float` and `Sym`
//! tokens. A single left-to-right pass with one-character lookahead
//! (only needed to tell `/` from `//`). Stateless across calls —
//! tokenizing a second string never sees state left over from the
//! first.

use crate::error::{CompileError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Id(String),
    Int(i64),
    Float(f64),
    Sym(String),
}

impl Token {
    /// The literal text a symbol token carries, for error messages and
    /// the parser's one-token-lookahead symbol checks.
    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Token::Sym(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Tokenize `source`. Whitespace is dropped; `[A-Za-z]+` forms an
/// `Id`; digit runs with an optional `.` form a `Float` (any `.`
/// present) or an `Int`; `//` is a single two-character symbol,
/// otherwise every other non-alphanumeric character is its own symbol.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            tokens.push(Token::Id(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    is_float = true;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if is_float {
                let v: f64 = text
                    .parse()
                    .map_err(|_| CompileError::Lex { pos: start, ch: c })?;
                tokens.push(Token::Float(v));
            } else {
                let v: i64 = text
                    .parse()
                    .map_err(|_| CompileError::Lex { pos: start, ch: c })?;
                tokens.push(Token::Int(v));
            }
        } else if c == '/' {
            if chars.get(i + 1) == Some(&'/') {
                tokens.push(Token::Sym("//".to_string()));
                i += 2;
            } else {
                tokens.push(Token::Sym("/".to_string()));
                i += 1;
            }
        } else {
            tokens.push(Token::Sym(c.to_string()));
            i += 1;
        }
    }
    Ok(tokens)
}
