//! Crate-wide error type.
//!
//! One enum unifies lexer, parser, differentiator and I/O failures, in
//! the same shape as the teacher's per-subsystem error enums: a
//! `thiserror` derive, `#[from]` conversions at the I/O/serde boundary,
//! and a `Result` alias. `is_fatal` lets the driver tell a per-case
//! failure (skip and continue) apart from a process-level one (abort).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    /// Unexpected character class while tokenizing.
    #[error("lex error at byte {pos}: unexpected character {ch:?}")]
    Lex { pos: usize, ch: char },

    /// Unexpected token, or a token that doesn't fit the grammar
    /// position it was found in.
    #[error("parse error at token {pos}: {message}")]
    Parse { pos: usize, message: String },

    /// The differentiator couldn't parse the forward statement's
    /// surface string.
    #[error("differentiation error: {0}")]
    Differentiate(String),

    /// JSON case file didn't match the expected schema.
    #[error("invalid case file: {0}")]
    InvalidCase(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Fatal errors abort the whole process (spec.md §7); everything
    /// else is recoverable and scoped to the one case that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CompileError::Io(_))
    }
}
