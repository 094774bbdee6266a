//! Rox: a tree-walking interpreter for a Lox dialect in which a newline ends a
//! statement just like `;` does.
//!
//! The pipeline is scanner → parser → resolver → interpreter. Each static
//! phase hands back its result together with the [`Diagnostics`] it
//! collected; [`Lox::run`] stops before execution if any phase reported one.

pub mod ast;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use std::io::Write;

use log::{debug, info};

use crate::error::{Diagnostics, LoxError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// A session: one interpreter whose globals and resolution table survive
/// across [`Lox::run`] calls (the REPL keeps a single session alive).
pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// A session printing to standard output.
    pub fn new() -> Self {
        Lox {
            interpreter: Interpreter::new(),
        }
    }

    /// A session printing to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Lox {
            interpreter: Interpreter::with_output(out),
        }
    }

    pub fn with_max_call_depth(self, max_call_depth: usize) -> Self {
        Lox {
            interpreter: self.interpreter.with_max_call_depth(max_call_depth),
        }
    }

    /// Scan, parse, resolve and execute `source`.
    ///
    /// Scanner and parser diagnostics are reported together; resolution only
    /// runs on a clean parse. Nothing executes if any diagnostic was raised.
    pub fn run(&mut self, source: &str) -> error::Result<()> {
        info!("Running {} byte(s) of source", source.len());

        let (tokens, mut diagnostics) = tokenize(source);

        let (statements, parse_diagnostics) = Parser::new(tokens).parse();
        diagnostics.merge(parse_diagnostics);

        if diagnostics.has_errors() {
            debug!("Static errors before resolution: {}", diagnostics.len());
            return Err(LoxError::from(diagnostics));
        }

        let (locals, resolve_diagnostics) = Resolver::new().resolve(&statements);

        if resolve_diagnostics.has_errors() {
            debug!("Resolution errors: {}", resolve_diagnostics.len());
            return Err(LoxError::from(resolve_diagnostics));
        }

        self.interpreter.resolve(locals);
        self.interpreter.interpret(&statements)?;

        Ok(())
    }
}

/// Scan `source` into tokens, always ending with exactly one EOF.
pub fn tokenize(source: &str) -> (Vec<Token>, Diagnostics) {
    Scanner::new(source).scan_tokens()
}
