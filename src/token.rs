use log::trace;
use serde::Serialize;
use std::fmt;

/// The different kinds of tokens recognized by the Rox scanner.
///
/// Literal payloads live on [`Token::literal`], so every variant here is a
/// plain tag and the type is `Copy`.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';' or a newline
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal
    STRING,

    /// A numeric literal
    NUMBER,

    AND,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    /// End‑of‑file marker
    EOF,
}

/// The value carried by `STRING` and `NUMBER` tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// Contents without the surrounding quotes.
    Str(String),

    /// Always materialised as a float, `3` included.
    Number(f64),
}

/// A scanned token, including its type, the source lexeme, its literal
/// value (if any) and the line number where it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// Parsed value for `STRING` / `NUMBER` tokens.
    pub literal: Option<Literal>,

    /// 1‑based line number in the source.
    pub line: usize,
}

impl Token {
    /// Create a new Token with the given type, lexeme, literal and line.
    pub fn new<S: Into<String>>(
        token_type: TokenType,
        lexeme: S,
        literal: Option<Literal>,
        line: usize,
    ) -> Self {
        let lexeme: String = lexeme.into();

        trace!(
            "Creating new token: type={:?}, lexeme={:?}, line={}",
            token_type,
            lexeme,
            line
        );

        Self {
            token_type,
            lexeme,
            literal,
            line,
        }
    }

    /// A token that never came from source, e.g. the `this` looked up by
    /// `super` calls.
    pub fn synthetic(token_type: TokenType, lexeme: &str, line: usize) -> Self {
        Self::new(token_type, lexeme, None, line)
    }
}

impl fmt::Display for Token {
    /// `KIND lexeme literal`, with `null` for tokens without a literal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literal: String = match &self.literal {
            Some(Literal::Str(s)) => s.clone(),
            Some(Literal::Number(n)) if n.fract() == 0.0 && n.abs() < 1e16 => {
                // 3 → "3.0"
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                format!("{}.0", buf.format(*n as i64))
            }
            Some(Literal::Number(n)) => n.to_string(),
            None => "null".to_string(),
        };

        let lexeme: &str = if self.lexeme == "\n" {
            "\\n"
        } else {
            &self.lexeme
        };

        write!(f, "{:?} {} {}", self.token_type, lexeme, literal)
    }
}
