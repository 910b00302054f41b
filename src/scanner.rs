use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::LoxError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

#[derive(Debug, Clone)]
pub struct Scanner<'src> {
    source: &'src [u8],
    start: usize,
    current: usize,
    line: usize,
    emitted_eof: bool,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src [u8]) -> Self {
        info!("Initializing Scanner with buffer of {} bytes", source.len());
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
            emitted_eof: false,
        }
    }

    /// Drives the scanner to completion, splitting the results into the full
    /// token list (always terminated by EOF) and the collected scan errors.
    /// Errors never abort scanning.
    pub fn scan(source: &'src [u8]) -> (Vec<Token>, Vec<LoxError>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<LoxError> = Vec::new();

        for item in Scanner::new(source) {
            match item {
                Ok(token) => tokens.push(token),
                Err(err) => errors.push(err),
            }
        }

        info!(
            "Scanned {} token(s) with {} error(s)",
            tokens.len(),
            errors.len()
        );

        (tokens, errors)
    }

    /// Scans one token starting at `self.start`.  `Ok(None)` means the bytes
    /// were whitespace or a comment and scanning should continue.
    fn scan_token(&mut self) -> Result<Option<Token>, LoxError> {
        let byte: u8 = self.advance();

        let token_type: TokenType = match byte {
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

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' => {
                if self.match_byte(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                    return Ok(None);
                }

                TokenType::SLASH
            }

            b'"' => return self.scan_string().map(Some),

            b'0'..=b'9' => self.scan_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            _ => {
                debug!(
                    "Unexpected character '{}' at line {}",
                    byte as char, self.line
                );

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character '{}'.", byte as char),
                ));
            }
        };

        Ok(Some(self.make_token(token_type)))
    }

    fn scan_string(&mut self) -> Result<Token, LoxError> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        // Closing quote.
        self.advance();

        let contents: String =
            String::from_utf8_lossy(&self.source[self.start + 1..self.current - 1]).into_owned();

        debug!("Scanned string literal: {}", contents);

        Ok(self.make_token(TokenType::STRING(contents)))
    }

    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A fractional part needs a digit right after the dot, otherwise the
        // dot belongs to whatever follows.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme: String =
            String::from_utf8_lossy(&self.source[self.start..self.current]).into_owned();

        let number: f64 = lexeme.parse().unwrap_or(0.0);

        debug!("Scanned number: {}", number);

        TokenType::NUMBER(number)
    }

    fn scan_identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &[u8] = &self.source[self.start..self.current];

        match KEYWORDS.get(text) {
            Some(token_type) => token_type.clone(),
            None => TokenType::IDENTIFIER,
        }
    }

    #[inline]
    fn make_token(&self, token_type: TokenType) -> Token {
        let lexeme: String =
            String::from_utf8_lossy(&self.source[self.start..self.current]).into_owned();

        Token::new(token_type, lexeme, self.line)
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.current];

        self.current += 1;

        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;

            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

impl<'src> Iterator for Scanner<'src> {
    type Item = Result<Token, LoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_at_end() {
                if self.emitted_eof {
                    return None;
                }

                self.emitted_eof = true;

                debug!("Reached EOF at line {}", self.line);

                return Some(Ok(Token::new(TokenType::EOF, String::new(), self.line)));
            }

            self.start = self.current;

            match self.scan_token() {
                Ok(Some(token)) => {
                    debug!(
                        "Emitting token: type={:?}, lexeme={}, line={}",
                        token.token_type, token.lexeme, token.line
                    );

                    return Some(Ok(token));
                }

                // Whitespace or comment, keep scanning.
                Ok(None) => continue,

                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<'src> FusedIterator for Scanner<'src> {}
