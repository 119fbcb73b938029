//! Streaming lexer.
//!
//! [`Scanner`] walks the source bytes once and yields `Result<Token>` items,
//! ending with exactly one `EOF` token. A lexical error is yielded in place
//! of the offending token and scanning resumes after it, so `tokenize` can
//! report every bad character; [`Scanner::scan_all`] instead stops at the
//! first one.
//!
//! Keywords come from a compile‑time perfect‑hash map; comments and string
//! bodies are skipped with `memchr`.
//!
//! ```rust
//! use rlox::scanner::Scanner;
//!
//! let tokens = Scanner::new("print 1 % 2; // remainder").scan_all().unwrap();
//! assert_eq!(tokens.len(), 6);
//! ```

use std::iter::FusedIterator;

use log::{debug, info, trace};
use memchr::{memchr, memchr_iter};
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"for"      => TokenType::FOR,
    b"fun"      => TokenType::FUN,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"trait"    => TokenType::TRAIT,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
    b"with"     => TokenType::WITH,
};

pub struct Scanner<'a> {
    text: &'a str,
    src: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to examine.
    pos: usize,
    line: usize,
    eof_emitted: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            eof_emitted: false,
        }
    }

    /// Scan the whole input, stopping at the first lexical error.
    pub fn scan_all(self) -> Result<Vec<Token>> {
        self.collect()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self) -> u8 {
        let b = self.src[self.pos];
        self.pos += 1;
        b
    }

    /// Byte `ahead` positions past the cursor, `0` beyond the input.
    fn look(&self, ahead: usize) -> u8 {
        self.src.get(self.pos + ahead).copied().unwrap_or(0)
    }

    fn eat(&mut self, expected: u8) -> bool {
        let hit = self.look(0) == expected;
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while !self.at_end() && pred(self.look(0)) {
            self.pos += 1;
        }
    }

    /// `long` if the next byte is `second`, else `short`.
    fn pick(&mut self, second: u8, long: TokenType, short: TokenType) -> TokenType {
        if self.eat(second) {
            long
        } else {
            short
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.text[self.start..self.pos]
    }

    /// Scan from `start`. `Ok(None)` means whitespace or a comment was
    /// consumed and nothing should be emitted.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'%' => TokenType::PERCENT,
            b'?' => TokenType::QUESTION,
            b':' => TokenType::COLON,

            b'!' => self.pick(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.pick(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.pick(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.pick(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.eat(b'/') => {
                self.pos = memchr(b'\n', &self.src[self.pos..])
                    .map_or(self.src.len(), |offset| self.pos + offset);
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),
            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Keep the cursor on a char boundary for multi‑byte input.
                while !self.text.is_char_boundary(self.pos) {
                    self.pos += 1;
                }

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", self.lexeme()),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Strings may span lines; the token carries the line of its closing
    /// quote.
    fn string(&mut self) -> Result<TokenType> {
        let rest = &self.src[self.pos..];

        let Some(close) = memchr(b'"', rest) else {
            self.line += memchr_iter(b'\n', rest).count();
            self.pos = self.src.len();
            return Err(LoxError::lex(self.line, "Unterminated string."));
        };

        self.line += memchr_iter(b'\n', &rest[..close]).count();

        let body = &self.text[self.pos..self.pos + close];
        self.pos += close + 1;

        Ok(TokenType::STRING(body.to_owned()))
    }

    fn number(&mut self) -> TokenType {
        self.eat_while(|b| b.is_ascii_digit());

        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;
            self.eat_while(|b| b.is_ascii_digit());
        }

        // Digits with at most one interior dot always parse.
        TokenType::NUMBER(self.lexeme().parse().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');

        KEYWORDS
            .get(self.lexeme().as_bytes())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.at_end() {
                if self.eof_emitted {
                    return None;
                }
                self.eof_emitted = true;
                trace!("Reached end of input on line {}", self.line);
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned {:?} on line {}", kind, self.line);
                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
