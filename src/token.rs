use log::trace;
use serde::Serialize;
use std::fmt;
use std::mem;

/// Token kinds, named the way `tokenize` prints them.
///
/// Only `STRING` and `NUMBER` carry a payload. Equality ignores it, so
/// `check(TokenType::NUMBER(0.0))` matches any number.
#[rustfmt::skip]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    // punctuation
    LEFT_PAREN, RIGHT_PAREN, LEFT_BRACE, RIGHT_BRACE,
    COMMA, DOT, MINUS, PLUS, SEMICOLON, SLASH, STAR,
    PERCENT, QUESTION, COLON,

    // one or two characters
    BANG, BANG_EQUAL, EQUAL, EQUAL_EQUAL,
    GREATER, GREATER_EQUAL, LESS, LESS_EQUAL,

    // literals
    IDENTIFIER,
    /// Contents without the quotes.
    STRING(String),
    NUMBER(f64),

    // keywords
    AND, BREAK, CLASS, CONTINUE, ELSE, FALSE, FUN, FOR, IF, NIL, OR,
    PRINT, RETURN, SUPER, THIS, TRAIT, TRUE, VAR, WHILE, WITH,

    EOF,
}

impl TokenType {
    /// Upper‑case variant name without payload, as printed by `tokenize`.
    #[rustfmt::skip]
    pub fn name(&self) -> &'static str {
        use TokenType::*;

        match self {
            LEFT_PAREN => "LEFT_PAREN", RIGHT_PAREN => "RIGHT_PAREN",
            LEFT_BRACE => "LEFT_BRACE", RIGHT_BRACE => "RIGHT_BRACE",
            COMMA => "COMMA", DOT => "DOT", MINUS => "MINUS", PLUS => "PLUS",
            SEMICOLON => "SEMICOLON", SLASH => "SLASH", STAR => "STAR",
            PERCENT => "PERCENT", QUESTION => "QUESTION", COLON => "COLON",

            BANG => "BANG", BANG_EQUAL => "BANG_EQUAL",
            EQUAL => "EQUAL", EQUAL_EQUAL => "EQUAL_EQUAL",
            GREATER => "GREATER", GREATER_EQUAL => "GREATER_EQUAL",
            LESS => "LESS", LESS_EQUAL => "LESS_EQUAL",

            IDENTIFIER => "IDENTIFIER", STRING(_) => "STRING", NUMBER(_) => "NUMBER",

            AND => "AND", BREAK => "BREAK", CLASS => "CLASS", CONTINUE => "CONTINUE",
            ELSE => "ELSE", FALSE => "FALSE", FUN => "FUN", FOR => "FOR", IF => "IF",
            NIL => "NIL", OR => "OR", PRINT => "PRINT", RETURN => "RETURN",
            SUPER => "SUPER", THIS => "THIS", TRAIT => "TRAIT", TRUE => "TRUE",
            VAR => "VAR", WHILE => "WHILE", WITH => "WITH",

            EOF => "EOF",
        }
    }
}

impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// A scanned token: its type, the original lexeme, and the line number
/// where it was found.
///
/// The lexeme is owned so that syntax trees (and the closures built from
/// them) can outlive the source buffer, e.g. across REPL lines and
/// `loadFile` calls.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    /// Line of the token's last character, counting from 1.
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, line: usize) -> Self {
        let lexeme: String = lexeme.into();

        trace!("token {:?} {:?} on line {}", token_type, lexeme, line);

        Self {
            token_type,
            lexeme,
            line,
        }
    }

    /// Location hint used in diagnostics: ` at 'lexeme'` or ` at end`.
    pub fn location(&self) -> String {
        match self.token_type {
            TokenType::EOF => " at end".to_string(),
            _ => format!(" at '{}'", self.lexeme),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Integral numbers keep one decimal: 3 prints as "3.0".
        let literal: String = match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::NUMBER(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    format!("{}.0", itoa::Buffer::new().format(*n as i64))
                } else {
                    n.to_string()
                }
            }
            _ => "null".to_string(),
        };

        write!(f, "{} {} {}", self.token_type.name(), self.lexeme, literal)
    }
}
