//! Parser for heap trace scripts
//!
//! This module provides the [`Parser`] struct, which turns the lexer's token
//! stream into a [`Script`]. Each non-empty line is one statement:
//!
//! ```text
//! statement := name '=' call
//!            | call
//!            | 'write' operand number*
//!            | 'link' operand operand
//! call      := 'malloc' operand
//!            | 'free' operand
//!            | 'realloc' operand operand
//! operand   := number | 'null' | name
//! ```

use super::ast::*;
use super::lexer::{LexError, Lexer, Token};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Error)]
#[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for trace scripts
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the entire script
    pub fn parse_script(&mut self) -> Result<Script, ParseError> {
        let mut script = Script::new();

        loop {
            while matches!(self.peek(), Token::Newline(_)) {
                self.advance();
            }
            if self.is_at_end() {
                break;
            }

            let statement = self.parse_statement()?;
            script.statements.push(statement);
            self.expect_end_of_statement()?;
        }

        Ok(script)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.peek().location();

        let kind = match self.peek().clone() {
            Token::Ident(name, _) if matches!(self.peek_ahead(1), Some(Token::Eq(_))) => {
                self.advance(); // name
                self.advance(); // '='
                let call_location = self.peek().location();
                let call = self.parse_call()?;
                if !call.returns_value() {
                    return Err(ParseError {
                        message: format!("'{}' does not return a value", call),
                        location: call_location,
                    });
                }
                StatementKind::Assign { name, call }
            }
            Token::Write(_) => {
                self.advance();
                let address = self.parse_operand()?;
                let mut bytes = Vec::new();
                while let Token::Number(value, loc) = *self.peek() {
                    let byte = u8::try_from(value).map_err(|_| ParseError {
                        message: format!("Byte value {} does not fit in 0..=255", value),
                        location: loc,
                    })?;
                    bytes.push(byte);
                    self.advance();
                }
                if bytes.is_empty() {
                    return Err(self.error_here("Expected at least one byte after 'write'"));
                }
                StatementKind::Write { address, bytes }
            }
            Token::Link(_) => {
                self.advance();
                let first = self.parse_operand()?;
                let second = self.parse_operand()?;
                StatementKind::Link { first, second }
            }
            _ => StatementKind::Call(self.parse_call()?),
        };

        Ok(Statement { kind, location })
    }

    fn parse_call(&mut self) -> Result<Call, ParseError> {
        match self.peek() {
            Token::Malloc(_) => {
                self.advance();
                let size = self.parse_operand()?;
                Ok(Call::Malloc { size })
            }
            Token::Free(_) => {
                self.advance();
                let address = self.parse_operand()?;
                Ok(Call::Free { address })
            }
            Token::Realloc(_) => {
                self.advance();
                let address = self.parse_operand()?;
                let size = self.parse_operand()?;
                Ok(Call::Realloc { address, size })
            }
            other => Err(ParseError {
                message: format!(
                    "Expected 'malloc', 'free', 'realloc', 'write' or 'link', found {}",
                    other
                ),
                location: other.location(),
            }),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        let operand = match self.peek() {
            Token::Number(value, _) => Operand::Literal(*value),
            Token::Null(_) => Operand::Literal(0),
            Token::Ident(name, _) => Operand::Name(name.clone()),
            other => {
                return Err(ParseError {
                    message: format!("Expected a number, 'null' or a name, found {}", other),
                    location: other.location(),
                })
            }
        };
        self.advance();
        Ok(operand)
    }

    fn expect_end_of_statement(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Token::Newline(_) => {
                self.advance();
                Ok(())
            }
            Token::Eof(_) => Ok(()),
            other => Err(ParseError {
                message: format!("Expected end of line, found {}", other),
                location: other.location(),
            }),
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            location: self.peek().location(),
        }
    }

    fn peek(&self) -> &Token {
        // The lexer always ends the stream with Eof, and advance never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }
}

/// Parse a whole script from source text
pub fn parse_script(source: &str) -> Result<Script, ParseError> {
    Parser::new(source)?.parse_script()
}
