//! Lexer (tokenizer) for heap trace scripts
//!
//! Scripts are line oriented, so unlike most lexers this one keeps newlines
//! as tokens. `#` and `//` start a comment that runs to the end of the line.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(u32, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    Malloc(SourceLocation),
    Free(SourceLocation),
    Realloc(SourceLocation),
    Write(SourceLocation),
    Link(SourceLocation),
    Null(SourceLocation),

    // Punctuation
    Eq(SourceLocation), // =

    // Statement separator
    Newline(SourceLocation),

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::Ident(_, loc)
            | Token::Malloc(loc)
            | Token::Free(loc)
            | Token::Realloc(loc)
            | Token::Write(loc)
            | Token::Link(loc)
            | Token::Null(loc)
            | Token::Eq(loc)
            | Token::Newline(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Malloc(_) => write!(f, "'malloc'"),
            Token::Free(_) => write!(f, "'free'"),
            Token::Realloc(_) => write!(f, "'realloc'"),
            Token::Write(_) => write!(f, "'write'"),
            Token::Link(_) => write!(f, "'link'"),
            Token::Null(_) => write!(f, "'null'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::Newline(_) => write!(f, "end of line"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Error)]
#[error("Lexer error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for trace scripts
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_blanks_and_comments();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '\n' => Ok(Token::Newline(loc)),
            '=' => Ok(Token::Eq(loc)),
            '0'..='9' => self.number_literal(ch, loc),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier_or_keyword(ch, loc)),
            _ => Err(LexError {
                message: format!("Unexpected character '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Parse a decimal or `0x` hexadecimal literal
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Result<Token, LexError> {
        let hex = first_digit == '0' && matches!(self.peek(), Some('x') | Some('X'));
        if hex {
            self.advance();
        }

        let mut digits = String::new();
        if !hex {
            digits.push(first_digit);
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_hexdigit() && (hex || ch.is_ascii_digit()) {
                digits.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        if let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() {
                return Err(LexError {
                    message: format!("Invalid digit '{}' in number literal", ch),
                    location: self.current_location(),
                });
            }
        }

        let radix = if hex { 16 } else { 10 };
        let value = u32::from_str_radix(&digits, radix).map_err(|_| LexError {
            message: if digits.is_empty() {
                "Hex literal has no digits".to_string()
            } else {
                format!("Number literal out of 32-bit range: {}", digits)
            },
            location: loc,
        })?;

        Ok(Token::Number(value, loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "malloc" => Token::Malloc(loc),
            "free" => Token::Free(loc),
            "realloc" => Token::Realloc(loc),
            "write" => Token::Write(loc),
            "link" => Token::Link(loc),
            "null" | "NULL" => Token::Null(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip spaces, tabs, carriage returns and comments (not newlines)
    fn skip_blanks_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => self.skip_to_end_of_line(),
                Some('/') if self.peek_ahead(1) == Some('/') => self.skip_to_end_of_line(),
                _ => break,
            }
        }
    }

    /// Skip up to, but not including, the next newline
    fn skip_to_end_of_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}
