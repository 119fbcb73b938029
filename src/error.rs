//! Error and diagnostic types.
//!
//! Every phase reports through [`LoxError`]: the scanner and parser stop at
//! their first error, the resolver hands back all of its diagnostics at
//! once, and the evaluator raises a [`RuntimeError`] tied to a source line.
//! Nothing here prints; callers decide where diagnostics go.

use std::fmt;
use std::io;
use thiserror::Error;

use log::debug;

use crate::token::Token;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// The scanner met a character or string it cannot tokenize.
    #[error("[line {line}] Error: {message}")]
    Lex {
        message: String,
        line: usize,
    },

    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// ` at 'lexeme'` or ` at end`.
        location: String,
    },

    /// Static‑analysis failure. Carries every diagnostic of the pass
    /// (warnings included) in source order.
    #[error("{}", render(.diagnostics))]
    Resolve { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent). Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    pub fn parse<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            line,
            location,
        }
    }

    /// Static errors (lex, parse, resolve) map to exit code 65, runtime
    /// errors to 70.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Runtime(_) => 70,
            LoxError::Io(_) => 74,
            _ => 65,
        }
    }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, LoxError>;

/// An error raised while executing a program. Carries the line of the
/// token that triggered it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
    /// The `break`/`continue` keyword when this is a flow signal that left
    /// a function body. The nearest enclosing loop consumes it; anywhere
    /// else it surfaces as an ordinary error.
    pub flow: Option<Token>,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Runtime error: line={}, msg={}", line, message);

        RuntimeError {
            message,
            line,
            flow: None,
        }
    }

    pub fn flow(keyword: Token) -> Self {
        debug!("'{}' escaping on line {}", keyword.lexeme, keyword.line);

        RuntimeError {
            message: "Flow statement outside of loop.".to_string(),
            line: keyword.line,
            flow: Some(keyword),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A static diagnostic produced by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    /// ` at 'lexeme'`, ` at end`, or empty.
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        Diagnostic {
            severity: Severity::Error,
            line,
            location,
            message: msg.into(),
        }
    }

    pub fn warning<S: Into<String>>(line: usize, msg: S) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            line,
            location: String::new(),
            message: msg.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };

        write!(
            f,
            "[line {}] {}{}: {}",
            self.line, kind, self.location, self.message
        )
    }
}
