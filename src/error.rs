//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! Static problems (scanner, parser, resolver) are collected as
//! [`Diagnostic`]s in a [`Diagnostics`] sink that each phase owns and hands
//! back next to its result. The driver inspects the sink and decides whether
//! the next phase may run. Runtime failures are a single [`RuntimeError`] that
//! aborts the current run.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Which phase produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Unexpected character, unterminated string.
    Lexical,

    /// Malformed grammar.
    Syntax,

    /// Illegal `this`/`super`/`return`, redeclaration, self reference.
    Resolution,
}

/// A single static error, rendered as `[line N] Error<where>: message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// 1‑based line where the error occurred.
    pub line: usize,

    /// Either empty, `" at end"` or `" at <lexeme>"`; a newline lexeme is
    /// written as `\n`.
    pub location: String,

    /// Human‑readable description.
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic tied to a line only (the scanner has no token yet).
    pub fn at_line<S: Into<String>>(kind: DiagnosticKind, line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating {:?} diagnostic: line={}, msg={}", kind, line, message);

        Diagnostic {
            kind,
            line,
            location: String::new(),
            message,
        }
    }

    /// A diagnostic pointing at the offending token.
    pub fn at_token<S: Into<String>>(kind: DiagnosticKind, token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating {:?} diagnostic: line={}, token={:?}, msg={}",
            kind, token.line, token.lexeme, message
        );

        Diagnostic {
            kind,
            line: token.line,
            location: location_of(token),
            message,
        }
    }
}

/// The `<where>` fragment of a diagnostic for `token`.
fn location_of(token: &Token) -> String {
    match token.token_type {
        TokenType::EOF => " at end".to_string(),
        TokenType::SEMICOLON if token.lexeme == "\n" => " at \\n".to_string(),
        _ => format!(" at {}", token.lexeme),
    }
}

/// The one diagnostics sink shared by the static phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Append everything another phase reported.
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// An error raised while executing a program. The first one aborts the run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Type errors, undefined names, bad calls, division by zero, ...
    #[error("[line {line}] Error{location}: {message}")]
    Raised {
        line: usize,
        location: String,
        message: String,
    },

    /// `print` could not write to the output sink.
    #[error("failed to write program output: {0}")]
    Output(#[from] io::Error),
}

impl RuntimeError {
    /// Helper constructor: an error at `token`.
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, token={:?}, msg={}",
            token.line, token.lexeme, message
        );

        RuntimeError::Raised {
            line: token.line,
            location: location_of(token),
            message,
        }
    }

    /// The bare message, without line or location.
    pub fn message(&self) -> String {
        match self {
            RuntimeError::Raised { message, .. } => message.clone(),
            RuntimeError::Output(e) => e.to_string(),
        }
    }
}

/// Everything a full run of the pipeline can fail with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Scan, parse or resolve diagnostics; nothing was executed.
    #[error("{}", DisplayAll(.0))]
    Static(Vec<Diagnostic>),

    /// Execution was aborted by a runtime error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Process exit code for this failure (sysexits-style).
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Static(_) => 65,
            LoxError::Runtime(_) => 70,
        }
    }
}

impl From<Diagnostics> for LoxError {
    fn from(diagnostics: Diagnostics) -> Self {
        LoxError::Static(diagnostics.into_vec())
    }
}

/// One diagnostic per line.
struct DisplayAll<'a>(&'a [Diagnostic]);

impl fmt::Display for DisplayAll<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
